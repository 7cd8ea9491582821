//! Gap-filling for proposals from loose upstream producers.
//!
//! Normalization only fills gaps. A value that is semantically present is
//! passed through untouched so that validation can reject it loudly.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::types::Proposal;

/// Amount substituted for blank or literal `null` amounts.
pub const BLANK_AMOUNT: &str = "0.00";

/// Rate substituted for a missing, blank or zero exchange rate.
pub const DEFAULT_EXCHANGE_RATE: &str = "1";

fn is_blank_or_null(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Normalizes a proposal in place of the caller's copy.
///
/// - blank / `null` line amounts become `0.00`
/// - currency is trimmed and upper-cased
/// - a missing document date becomes the posting date
/// - a missing, blank or zero exchange rate becomes `1`
#[must_use]
pub fn normalize(mut proposal: Proposal) -> Proposal {
    for line in &mut proposal.lines {
        if is_blank_or_null(&line.amount) {
            line.amount = BLANK_AMOUNT.to_string();
        }
    }

    proposal.currency = proposal.currency.trim().to_uppercase();

    let missing_document_date = proposal
        .document_date
        .as_deref()
        .is_none_or(is_blank_or_null);
    if missing_document_date {
        proposal.document_date = Some(proposal.posting_date.clone());
    }

    let missing_rate = match proposal.exchange_rate.as_deref() {
        None => true,
        Some(rate) if is_blank_or_null(rate) => true,
        // An unparseable rate is left alone for validation to reject.
        Some(rate) => Decimal::from_str(rate.trim()).is_ok_and(|r| r.is_zero()),
    };
    if missing_rate {
        proposal.exchange_rate = Some(DEFAULT_EXCHANGE_RATE.to_string());
    }

    proposal
}
