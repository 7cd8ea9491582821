//! Reversal of posted journal entries.
//!
//! A reversal is a new entry whose lines swap debit and credit on the same
//! accounts at the same amounts and rates. The original is never touched.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::EntryType;

/// A persisted journal line, as read back for reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedLine {
    /// Resolved account.
    pub account_id: Uuid,
    /// Position within the entry.
    pub line_no: i32,
    /// Transaction-currency amount.
    pub amount: Decimal,
    /// Exchange rate applied.
    pub exchange_rate: Decimal,
    /// Base debit.
    pub base_debit: Decimal,
    /// Base credit.
    pub base_credit: Decimal,
}

impl PostedLine {
    /// Returns which side this line is on.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        if self.base_debit > Decimal::ZERO {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }
}

/// Stateless service for building reversing lines.
pub struct ReversalService;

impl ReversalService {
    /// Mirrors every line: debits become credits and credits become debits.
    #[must_use]
    pub fn mirror_lines(original: &[PostedLine]) -> Vec<PostedLine> {
        original
            .iter()
            .map(|line| PostedLine {
                account_id: line.account_id,
                line_no: line.line_no,
                amount: line.amount,
                exchange_rate: line.exchange_rate,
                base_debit: line.base_credit,
                base_credit: line.base_debit,
            })
            .collect()
    }

    /// Idempotency key used for the reversal of `entry_id`.
    ///
    /// Deterministic, so the per-company unique key also blocks a second
    /// reversal that slipped past the back-reference check.
    #[must_use]
    pub fn reversal_key(entry_id: Uuid) -> String {
        format!("REV-{entry_id}")
    }

    /// Builds the reversal narration, rejecting a blank reason.
    pub fn narration(entry_id: Uuid, reason: &str) -> Result<String, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReversalReasonRequired);
        }
        Ok(format!("Reversal of {entry_id}: {reason}"))
    }

    /// Returns true if the lines balance in base currency.
    #[must_use]
    pub fn is_balanced(lines: &[PostedLine]) -> bool {
        let debit: Decimal = lines.iter().map(|l| l.base_debit).sum();
        let credit: Decimal = lines.iter().map(|l| l.base_credit).sum();
        debit == credit
    }
}
