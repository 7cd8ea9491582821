//! Ledger service: the pure half of Validate and Commit.

use super::error::LedgerError;
use super::normalize::normalize;
use super::types::{Proposal, ValidatedProposal};
use super::validation::validate_proposal;

/// Ledger service for proposal preparation.
///
/// Contains no database access. The persistence layer calls
/// [`LedgerService::prepare`] before resolving accounts and writing rows.
pub struct LedgerService;

impl LedgerService {
    /// Normalizes then validates a proposal.
    ///
    /// # Errors
    ///
    /// Returns the first structural violation found after normalization.
    pub fn prepare(proposal: Proposal) -> Result<ValidatedProposal, LedgerError> {
        validate_proposal(&normalize(proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::ProposalLine;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sloppy() -> Proposal {
        Proposal {
            document_type: "JV".into(),
            company_code: "ACME".into(),
            idempotency_key: "k".into(),
            currency: "idr ".into(),
            exchange_rate: Some("0".into()),
            posting_date: "2026-05-02".into(),
            document_date: Some(String::new()),
            narration: String::new(),
            document_id: None,
            lines: vec![
                ProposalLine {
                    account_code: "1000".into(),
                    is_debit: true,
                    amount: "75".into(),
                },
                ProposalLine {
                    account_code: "3000".into(),
                    is_debit: false,
                    amount: "75".into(),
                },
            ],
        }
    }

    #[test]
    fn test_prepare_fills_gaps() {
        let validated = LedgerService::prepare(sloppy()).unwrap();
        assert_eq!(validated.currency, "IDR");
        assert_eq!(validated.exchange_rate, Decimal::ONE);
        assert_eq!(
            validated.document_date,
            NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
        );
        assert_eq!(validated.totals.debit, dec!(75));
    }

    #[test]
    fn test_prepare_null_amount_fails_loudly() {
        let mut p = sloppy();
        p.lines[1].amount = "null".into();
        assert!(matches!(
            LedgerService::prepare(p),
            Err(LedgerError::NonPositiveAmount { line: 2 })
        ));
    }
}
