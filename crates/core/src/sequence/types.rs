//! Document numbering types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a document type partitions its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingStrategy {
    /// One counter per company and type.
    Global,
    /// One counter per financial year.
    PerFinancialYear,
    /// One counter per branch.
    PerBranch,
}

impl NumberingStrategy {
    /// Returns the string representation of the strategy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::PerFinancialYear => "per_financial_year",
            Self::PerBranch => "per_branch",
        }
    }

    /// Parses a strategy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "global" => Some(Self::Global),
            "per_financial_year" => Some(Self::PerFinancialYear),
            "per_branch" => Some(Self::PerBranch),
            _ => None,
        }
    }
}

impl fmt::Display for NumberingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a numbered document.
///
/// - Draft → Posted (number assigned)
/// - Draft → Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    /// Created, no number yet.
    Draft,
    /// Numbered. The number never changes.
    Posted,
    /// Abandoned.
    Cancelled,
}

impl DocumentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "POSTED" => Some(Self::Posted),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Numbering configuration of a document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTypeConfig {
    /// Type code, used as the number prefix.
    pub code: String,
    /// Counter partitioning.
    pub strategy: NumberingStrategy,
    /// Whether counters restart each financial year.
    pub resets_yearly: bool,
}

/// Key of one counter row. Absent parts use sentinels so the row key is never NULL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceScope {
    /// Financial year, or [`SequenceScope::NO_YEAR`].
    pub financial_year: i32,
    /// Branch code, or [`SequenceScope::NO_BRANCH`].
    pub branch: String,
}

impl SequenceScope {
    /// Sentinel for "no financial year".
    pub const NO_YEAR: i32 = 0;
    /// Sentinel for "no branch".
    pub const NO_BRANCH: &'static str = "";

    /// Returns true if the scope carries a financial year.
    #[must_use]
    pub fn has_year(&self) -> bool {
        self.financial_year != Self::NO_YEAR
    }

    /// Returns true if the scope carries a branch.
    #[must_use]
    pub fn has_branch(&self) -> bool {
        !self.branch.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_round_trip_strings() {
        for s in [
            NumberingStrategy::Global,
            NumberingStrategy::PerFinancialYear,
            NumberingStrategy::PerBranch,
        ] {
            assert_eq!(NumberingStrategy::parse(s.as_str()), Some(s));
        }
        assert_eq!(NumberingStrategy::parse("weekly"), None);
    }

    #[test]
    fn test_document_status_parse() {
        assert_eq!(DocumentStatus::parse("draft"), Some(DocumentStatus::Draft));
        assert_eq!(DocumentStatus::parse("POSTED"), Some(DocumentStatus::Posted));
        assert_eq!(DocumentStatus::parse("void"), None);
        assert_eq!(DocumentStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_scope_sentinels() {
        let scope = SequenceScope {
            financial_year: SequenceScope::NO_YEAR,
            branch: SequenceScope::NO_BRANCH.to_string(),
        };
        assert!(!scope.has_year());
        assert!(!scope.has_branch());
    }
}
