//! Numbering rules: which counter a document draws from, and how the
//! drawn value is rendered.
//!
//! The counter itself lives in the database and is only ever advanced by an
//! atomic upsert-increment. Nothing here caches counter values.

use uuid::Uuid;

use super::error::SequenceError;
use super::types::{DocumentStatus, DocumentTypeConfig, NumberingStrategy, SequenceScope};

/// Default zero-padding width of the counter segment.
pub const DEFAULT_NUMBER_WIDTH: usize = 6;

/// Segment used in place of a year for counters that never reset.
pub const GLOBAL_SEGMENT: &str = "GLOBAL";

/// Stateless service for document numbering rules.
pub struct SequenceService;

impl SequenceService {
    /// Resolves the counter scope for a document of the given type.
    ///
    /// - `Global`: one counter, or one per year when the type resets yearly
    /// - `PerFinancialYear`: one counter per year
    /// - `PerBranch`: one counter per branch, further split per year when the type resets yearly
    ///
    /// # Errors
    ///
    /// Returns `MissingFinancialYear` / `MissingBranch` when the type needs a
    /// scope part the document does not carry.
    pub fn resolve_scope(
        doc_type: &DocumentTypeConfig,
        financial_year: Option<i32>,
        branch: Option<&str>,
    ) -> Result<SequenceScope, SequenceError> {
        let branch = branch.map(str::trim).filter(|b| !b.is_empty());
        let financial_year = financial_year.filter(|y| *y != SequenceScope::NO_YEAR);

        let needs_year = doc_type.resets_yearly
            || doc_type.strategy == NumberingStrategy::PerFinancialYear;
        let needs_branch = doc_type.strategy == NumberingStrategy::PerBranch;

        let year = if needs_year {
            financial_year
                .ok_or_else(|| SequenceError::MissingFinancialYear(doc_type.code.clone()))?
        } else {
            SequenceScope::NO_YEAR
        };

        let branch = if needs_branch {
            branch
                .ok_or_else(|| SequenceError::MissingBranch(doc_type.code.clone()))?
                .to_uppercase()
        } else {
            SequenceScope::NO_BRANCH.to_string()
        };

        Ok(SequenceScope {
            financial_year: year,
            branch,
        })
    }

    /// Renders `TYPE[-BRANCH]-(YEAR|GLOBAL)-NNNNNN`.
    #[must_use]
    pub fn format_number(type_code: &str, scope: &SequenceScope, counter: i64, width: usize) -> String {
        let mut number = String::with_capacity(type_code.len() + width + 16);
        number.push_str(type_code);
        number.push('-');
        if scope.has_branch() {
            number.push_str(&scope.branch);
            number.push('-');
        }
        if scope.has_year() {
            number.push_str(&scope.financial_year.to_string());
        } else {
            number.push_str(GLOBAL_SEGMENT);
        }
        number.push('-');
        number.push_str(&format!("{counter:0width$}"));
        number
    }

    /// Checks that a document can leave the DRAFT state.
    ///
    /// # Errors
    ///
    /// Returns `NotDraft` for posted or cancelled documents.
    pub fn ensure_draft(id: Uuid, status: DocumentStatus) -> Result<(), SequenceError> {
        match status {
            DocumentStatus::Draft => Ok(()),
            other => Err(SequenceError::NotDraft { id, status: other }),
        }
    }
}
