//! Order, purchase-order and inventory workflow logic.
//!
//! # Modules
//!
//! - `types` - Order status enums
//! - `error` - Workflow-specific error types
//! - `service` - State transition checks
//! - `costing` - Weighted-average cost and quantity guards
//! - `posting` - Ledger proposals produced by each transition

pub mod costing;
pub mod error;
pub mod posting;
pub mod service;
pub mod types;

#[cfg(test)]
mod costing_props;
#[cfg(test)]
mod service_props;

pub use costing::{CostingService, InvoiceDeviation, UNIT_COST_SCALE};
pub use error::WorkflowError;
pub use posting::{PostingBuilder, PostingContext, doc_types, transition_key};
pub use service::WorkflowService;
pub use types::{Decision, PurchaseOrderStatus, SalesOrderStatus};
