//! Double-entry ledger logic.
//!
//! - Proposal shape and its validated form
//! - Normalization of loose upstream input
//! - Structural validation with exact base-currency balancing
//! - Reversal line mirroring
//! - Balances and running statements

pub mod balance;
pub mod error;
pub mod normalize;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::{AccountBalance, AccountStatement, StatementLine, StatementRow, build_statement};
pub use error::LedgerError;
pub use normalize::normalize;
pub use reversal::{PostedLine, ReversalService};
pub use service::LedgerService;
pub use types::{
    EntryType, Proposal, ProposalLine, ProposalTotals, ValidatedLine, ValidatedProposal,
};
pub use validation::{parse_date, validate_proposal};
