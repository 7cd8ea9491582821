//! Workflow error types for order, purchase-order and inventory operations.

use corebook_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::LedgerError;
use crate::rules::RuleError;
use crate::sequence::SequenceError;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The current status is not the legal predecessor of the requested transition.
    #[error("Cannot move {document} to {attempted}: current status is {actual}")]
    InvalidTransition {
        /// Kind of document (`sales order`, `purchase order`).
        document: &'static str,
        /// The target status that was requested.
        attempted: &'static str,
        /// The status the document is actually in.
        actual: &'static str,
    },

    /// Not found, or owned by another company.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A receipt would push a PO line past its ordered quantity.
    #[error(
        "Receipt exceeds ordered quantity on line {line_id}: attempted total {attempted_total}, ordered {ordered}, already received {already_received}"
    )]
    QuantityExceedsOrdered {
        /// The purchase-order line.
        line_id: Uuid,
        /// Already received plus this receipt.
        attempted_total: Decimal,
        /// Ordered quantity.
        ordered: Decimal,
        /// Received before this receipt.
        already_received: Decimal,
    },

    /// Quantity must be strictly positive.
    #[error("Quantity must be greater than zero, got {0}")]
    InvalidQuantity(Decimal),

    /// Not enough unreserved stock.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product.
        product_id: Uuid,
        /// Quantity requested.
        requested: Decimal,
        /// On hand minus reserved.
        available: Decimal,
    },

    /// A line is malformed (negative price, both product and account, ...).
    #[error("Invalid line: {0}")]
    InvalidLine(String),

    /// An amount computed from caller-supplied quantities and prices exceeds
    /// the decimal range.
    #[error("Amount overflow: {0} exceeds the decimal range")]
    AmountOverflow(&'static str),

    /// Orders need at least one line.
    #[error("Order must have at least one line")]
    EmptyOrder,

    /// Account rule resolution failed.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// The ledger rejected the posting.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Document numbering failed.
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidQuantity(_)
            | Self::InvalidLine(_)
            | Self::AmountOverflow(_)
            | Self::EmptyOrder => 400,

            Self::NotFound(_) => 404,

            Self::InvalidTransition { .. }
            | Self::QuantityExceedsOrdered { .. }
            | Self::InsufficientStock { .. }
            | Self::Rule(RuleError::NoRuleConfigured { .. }) => 422,

            Self::Ledger(err) => err.http_status_code(),
            Self::Sequence(err) => err.http_status_code(),
            Self::Rule(_) | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::QuantityExceedsOrdered { .. } => "QUANTITY_EXCEEDS_ORDERED",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidLine(_) => "INVALID_LINE",
            Self::AmountOverflow(_) => "AMOUNT_OVERFLOW",
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::Rule(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Sequence(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Ledger(inner) => inner.into(),
            WorkflowError::Sequence(inner) => inner.into(),
            WorkflowError::Rule(inner) => inner.into(),
            other => {
                let message = other.to_string();
                match other.status_code() {
                    400 => Self::Validation(message),
                    404 => Self::NotFound(message),
                    422 => Self::BusinessRule(message),
                    _ => Self::Database(message),
                }
            }
        }
    }
}
