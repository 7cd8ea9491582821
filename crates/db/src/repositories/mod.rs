//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod company;
pub mod composer;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod purchase_order;
pub mod rule;
pub mod sequence;

pub use account::{AccountError, AccountRepository, CreateAccountInput};
pub use company::{CompanyError, CompanyRepository};
pub use composer::{Staged, Transition, run_transition};
pub use inventory::{
    CreateProductInput, InventoryError, InventoryRepository, ReceiveStockInput, StockLevel,
    StockReceipt,
};
pub use ledger::{EntryWithLines, LedgerRepository};
pub use order::{CreateOrderInput, CreateOrderLineInput, OrderRepository, OrderWithLines};
pub use purchase_order::{
    CreatePoInput, CreatePoLineInput, DEFAULT_INVOICE_TOLERANCE_PCT, PoWithLines,
    PurchaseOrderRepository, PurchaseOutcome, ReceiveLineInput, ReceivePoInput,
    VendorInvoiceInput,
};
pub use rule::{CreateRuleInput, RuleRepository};
pub use sequence::SequenceRepository;
