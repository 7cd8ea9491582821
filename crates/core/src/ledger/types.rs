//! Ledger domain types for proposal submission and validation.
//!
//! A [`Proposal`] is the loose, string-typed shape an upstream producer hands
//! in. [`ValidatedProposal`] is what survives normalization and structural
//! validation, with every amount parsed and every base amount computed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entry type: either Debit or Credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit entry.
    Debit,
    /// Credit entry.
    Credit,
}

impl EntryType {
    /// Returns the opposite side.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// One candidate line of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalLine {
    /// Account code, resolved later within the proposal's company.
    pub account_code: String,
    /// True for a debit line, false for a credit line.
    pub is_debit: bool,
    /// Positive amount in transaction currency, as a decimal string.
    pub amount: String,
}

/// A candidate transaction awaiting normalization, validation and commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Document type code (e.g. `JV`, `SINV`).
    pub document_type: String,
    /// Owning company code.
    pub company_code: String,
    /// Caller-supplied token, unique per company.
    pub idempotency_key: String,
    /// Transaction currency (ISO 4217).
    pub currency: String,
    /// Single exchange rate applied to every line; missing means 1.
    #[serde(default)]
    pub exchange_rate: Option<String>,
    /// Posting date, `YYYY-MM-DD`.
    pub posting_date: String,
    /// Document date, `YYYY-MM-DD`; missing means the posting date.
    #[serde(default)]
    pub document_date: Option<String>,
    /// Free-text narration.
    #[serde(default)]
    pub narration: String,
    /// Numbered document this posting belongs to, if any.
    #[serde(default)]
    pub document_id: Option<Uuid>,
    /// Candidate lines.
    pub lines: Vec<ProposalLine>,
}

impl Proposal {
    /// Starts a proposal with no lines at rate 1.
    pub fn new(
        document_type: impl Into<String>,
        company_code: impl Into<String>,
        idempotency_key: impl Into<String>,
        currency: impl Into<String>,
        posting_date: NaiveDate,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            company_code: company_code.into(),
            idempotency_key: idempotency_key.into(),
            currency: currency.into(),
            exchange_rate: None,
            posting_date: posting_date.format("%Y-%m-%d").to_string(),
            document_date: None,
            narration: String::new(),
            document_id: None,
            lines: Vec::new(),
        }
    }

    /// Sets the header exchange rate.
    #[must_use]
    pub fn with_exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate.to_string());
        self
    }

    /// Sets the narration.
    #[must_use]
    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = narration.into();
        self
    }

    /// Links the proposal to an already numbered document.
    #[must_use]
    pub fn with_document(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    /// Appends a debit line.
    #[must_use]
    pub fn debit(mut self, account_code: impl Into<String>, amount: Decimal) -> Self {
        self.lines.push(ProposalLine {
            account_code: account_code.into(),
            is_debit: true,
            amount: amount.to_string(),
        });
        self
    }

    /// Appends a credit line.
    #[must_use]
    pub fn credit(mut self, account_code: impl Into<String>, amount: Decimal) -> Self {
        self.lines.push(ProposalLine {
            account_code: account_code.into(),
            is_debit: false,
            amount: amount.to_string(),
        });
        self
    }
}

/// A structurally valid line with its base-currency amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    /// 1-based position within the proposal.
    pub line_no: i32,
    /// Account code (trimmed).
    pub account_code: String,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Transaction-currency amount.
    pub amount: Decimal,
    /// Base debit (zero for credit lines).
    pub base_debit: Decimal,
    /// Base credit (zero for debit lines).
    pub base_credit: Decimal,
}

/// Debit/credit totals in base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProposalTotals {
    /// Sum of base debits.
    pub debit: Decimal,
    /// Sum of base credits.
    pub credit: Decimal,
}

impl ProposalTotals {
    /// Returns true if debits equal credits exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

/// A proposal that passed normalization and structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProposal {
    /// Document type code.
    pub document_type: String,
    /// Company code.
    pub company_code: String,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Upper-case currency code.
    pub currency: String,
    /// Positive header exchange rate.
    pub exchange_rate: Decimal,
    /// Posting date.
    pub posting_date: NaiveDate,
    /// Document date.
    pub document_date: NaiveDate,
    /// Narration.
    pub narration: String,
    /// Linked document, if any.
    pub document_id: Option<Uuid>,
    /// Lines in submission order.
    pub lines: Vec<ValidatedLine>,
    /// Base-currency totals.
    pub totals: ProposalTotals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builder_formats_fields() {
        let proposal = Proposal::new(
            "JV",
            "ACME",
            "key-1",
            "usd",
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        )
        .with_exchange_rate(dec!(1.25))
        .debit("1000", dec!(10.50))
        .credit("4000", dec!(10.50));

        assert_eq!(proposal.posting_date, "2026-03-09");
        assert_eq!(proposal.exchange_rate.as_deref(), Some("1.25"));
        assert_eq!(proposal.lines.len(), 2);
        assert!(proposal.lines[0].is_debit);
        assert!(!proposal.lines[1].is_debit);
        assert_eq!(proposal.lines[1].amount, "10.50");
    }

    #[test]
    fn test_proposal_deserializes_with_optional_fields_missing() {
        let json = r#"{
            "document_type": "JV",
            "company_code": "ACME",
            "idempotency_key": "k",
            "currency": "USD",
            "posting_date": "2026-01-01",
            "lines": [{"account_code": "1000", "is_debit": true, "amount": "5"}]
        }"#;
        let proposal: Proposal = serde_json::from_str(json).unwrap();
        assert!(proposal.exchange_rate.is_none());
        assert!(proposal.document_date.is_none());
        assert!(proposal.narration.is_empty());
    }

    #[test]
    fn test_entry_type_mirror() {
        assert_eq!(EntryType::Debit.mirror(), EntryType::Credit);
        assert_eq!(EntryType::Credit.mirror(), EntryType::Debit);
    }
}
