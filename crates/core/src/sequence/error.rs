//! Document numbering errors.

use corebook_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::types::DocumentStatus;

/// Errors that can occur while creating or posting documents.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The type's scope needs a financial year and none was given.
    #[error("Document type {0} requires a financial year")]
    MissingFinancialYear(String),

    /// The type's scope needs a branch and none was given.
    #[error("Document type {0} requires a branch")]
    MissingBranch(String),

    /// Only drafts can be posted or cancelled.
    #[error("Document {id} is {status}, expected DRAFT")]
    NotDraft {
        /// The document.
        id: Uuid,
        /// Its current status.
        status: DocumentStatus,
    },

    /// Document does not exist within the company.
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    /// Document type code does not exist.
    #[error("Document type not found: {0}")]
    DocumentTypeNotFound(String),

    /// Company code does not exist.
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl SequenceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFinancialYear(_) => "MISSING_FINANCIAL_YEAR",
            Self::MissingBranch(_) => "MISSING_BRANCH",
            Self::NotDraft { .. } => "DOCUMENT_NOT_DRAFT",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::DocumentTypeNotFound(_) => "DOCUMENT_TYPE_NOT_FOUND",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingFinancialYear(_) | Self::MissingBranch(_) => 400,
            Self::NotDraft { .. } => 422,
            Self::DocumentNotFound(_)
            | Self::DocumentTypeNotFound(_)
            | Self::CompanyNotFound(_) => 404,
            Self::Database(_) => 500,
        }
    }
}

impl From<SequenceError> for AppError {
    fn from(err: SequenceError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            422 => Self::BusinessRule(message),
            _ => Self::Database(message),
        }
    }
}
