//! Ledger error types.
//!
//! Structural failures are reported before any write. Duplicate keys and
//! unknown accounts get their own variants so a caller can tell "already
//! done" and "not found" apart from a malformed proposal.

use corebook_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Structural Errors ==========
    /// Document type code is blank.
    #[error("Document type is required")]
    MissingDocumentType,

    /// Company code is blank.
    #[error("Company code is required")]
    MissingCompany,

    /// Currency is blank.
    #[error("Currency is required")]
    MissingCurrency,

    /// Idempotency key is blank.
    #[error("Idempotency key is required")]
    MissingIdempotencyKey,

    /// A date field does not parse as `YYYY-MM-DD`.
    #[error("Invalid {field}: '{value}' is not a YYYY-MM-DD date")]
    InvalidDate {
        /// Which date field.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Exchange rate is not a positive decimal.
    #[error("Exchange rate must be a positive decimal, got '{0}'")]
    InvalidExchangeRate(String),

    /// Fewer than two lines.
    #[error("Proposal must have at least 2 lines")]
    InsufficientLines,

    /// A line has a blank account code.
    #[error("Line {line}: account code is required")]
    MissingAccountCode {
        /// 1-based line number.
        line: i32,
    },

    /// A line amount does not parse as a decimal.
    #[error("Line {line}: '{value}' is not a decimal amount")]
    InvalidAmount {
        /// 1-based line number.
        line: i32,
        /// The rejected input.
        value: String,
    },

    /// A line amount is zero or negative.
    #[error("Line {line}: amount must be greater than zero")]
    NonPositiveAmount {
        /// 1-based line number.
        line: i32,
    },

    /// A base amount or a side total exceeds the decimal range.
    #[error("Line {line}: amount overflows the decimal range")]
    AmountOverflow {
        /// 1-based line number.
        line: i32,
    },

    /// Base-currency debits and credits differ.
    #[error("Proposal is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total base debit.
        debit: Decimal,
        /// Total base credit.
        credit: Decimal,
    },

    // ========== Commit-time Errors ==========
    /// The idempotency key was already committed for this company.
    #[error("Duplicate proposal: idempotency key '{0}' already committed")]
    DuplicateProposal(String),

    /// Account code does not exist within the proposal's company.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Company code does not exist.
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    /// Document type code does not exist.
    #[error("Document type not found: {0}")]
    DocumentTypeNotFound(String),

    /// Journal entry does not exist within the company.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),

    // ========== Reversal Errors ==========
    /// The entry already has a reversal.
    #[error("Journal entry {0} is already reversed")]
    AlreadyReversed(Uuid),

    /// Reversal reason is blank.
    #[error("Reversal reason is required")]
    ReversalReasonRequired,

    // ========== Infrastructure ==========
    /// Numbering the linked document failed.
    #[error("Document numbering failed: {0}")]
    Numbering(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDocumentType => "MISSING_DOCUMENT_TYPE",
            Self::MissingCompany => "MISSING_COMPANY",
            Self::MissingCurrency => "MISSING_CURRENCY",
            Self::MissingIdempotencyKey => "MISSING_IDEMPOTENCY_KEY",
            Self::InvalidDate { .. } => "INVALID_DATE",
            Self::InvalidExchangeRate(_) => "INVALID_EXCHANGE_RATE",
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::MissingAccountCode { .. } => "MISSING_ACCOUNT_CODE",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::Unbalanced { .. } => "UNBALANCED_PROPOSAL",
            Self::DuplicateProposal(_) => "DUPLICATE_PROPOSAL",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::DocumentTypeNotFound(_) => "DOCUMENT_TYPE_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::ReversalReasonRequired => "REVERSAL_REASON_REQUIRED",
            Self::Numbering(_) => "NUMBERING_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingDocumentType
            | Self::MissingCompany
            | Self::MissingCurrency
            | Self::MissingIdempotencyKey
            | Self::InvalidDate { .. }
            | Self::InvalidExchangeRate(_)
            | Self::InsufficientLines
            | Self::MissingAccountCode { .. }
            | Self::InvalidAmount { .. }
            | Self::NonPositiveAmount { .. }
            | Self::AmountOverflow { .. }
            | Self::Unbalanced { .. }
            | Self::ReversalReasonRequired => 400,

            Self::AccountNotFound(_)
            | Self::CompanyNotFound(_)
            | Self::DocumentTypeNotFound(_)
            | Self::EntryNotFound(_) => 404,

            Self::DuplicateProposal(_) | Self::AlreadyReversed(_) => 409,

            Self::Numbering(_) | Self::Database(_) => 500,
        }
    }

    /// Returns true if the error means "nothing was written because it already exists".
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateProposal(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InsufficientLines.error_code(), "INSUFFICIENT_LINES");
        assert_eq!(
            LedgerError::Unbalanced {
                debit: Decimal::new(100, 2),
                credit: Decimal::new(50, 2),
            }
            .error_code(),
            "UNBALANCED_PROPOSAL"
        );
        assert_eq!(
            LedgerError::DuplicateProposal("k".into()).error_code(),
            "DUPLICATE_PROPOSAL"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::NonPositiveAmount { line: 1 }.http_status_code(), 400);
        assert_eq!(LedgerError::AmountOverflow { line: 2 }.http_status_code(), 400);
        assert_eq!(LedgerError::AccountNotFound("1000".into()).http_status_code(), 404);
        assert_eq!(LedgerError::DuplicateProposal("k".into()).http_status_code(), 409);
        assert_eq!(LedgerError::AlreadyReversed(Uuid::nil()).http_status_code(), 409);
        assert_eq!(LedgerError::Database("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Unbalanced {
            debit: Decimal::new(10000, 2),
            credit: Decimal::new(5000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Proposal is not balanced. Debit: 100.00, Credit: 50.00"
        );
    }

    #[test]
    fn test_into_app_error() {
        assert!(matches!(
            AppError::from(LedgerError::DuplicateProposal("k".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::AccountNotFound("9999".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::InsufficientLines),
            AppError::Validation(_)
        ));
    }
}
