//! Structural validation of proposals.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{EntryType, Proposal, ProposalTotals, ValidatedLine, ValidatedProposal};

/// Minimum number of lines in a balanced proposal.
pub const MIN_LINES: usize = 2;

fn required(value: &str, err: LedgerError) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| LedgerError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn parse_rate(value: Option<&str>) -> Result<Decimal, LedgerError> {
    let raw = value.unwrap_or_default();
    match Decimal::from_str(raw.trim()) {
        Ok(rate) if rate > Decimal::ZERO => Ok(rate),
        _ => Err(LedgerError::InvalidExchangeRate(raw.to_string())),
    }
}

/// Validates a proposal's structure and computes base amounts.
///
/// Checks, in order: header fields present, dates parse, exchange rate
/// positive, at least two lines, every line has an account code and a
/// positive amount, and base debits equal base credits exactly.
/// No idempotency check happens here.
///
/// # Errors
///
/// Returns the first structural violation found.
pub fn validate_proposal(proposal: &Proposal) -> Result<ValidatedProposal, LedgerError> {
    let document_type = required(&proposal.document_type, LedgerError::MissingDocumentType)?;
    let company_code = required(&proposal.company_code, LedgerError::MissingCompany)?;
    let currency = required(&proposal.currency, LedgerError::MissingCurrency)?;
    let idempotency_key = required(&proposal.idempotency_key, LedgerError::MissingIdempotencyKey)?;

    let posting_date = parse_date("posting_date", &proposal.posting_date)?;
    let document_date = match proposal.document_date.as_deref() {
        Some(raw) => parse_date("document_date", raw)?,
        None => posting_date,
    };
    let exchange_rate = parse_rate(proposal.exchange_rate.as_deref())?;

    if proposal.lines.len() < MIN_LINES {
        return Err(LedgerError::InsufficientLines);
    }

    let mut totals = ProposalTotals::default();
    let mut lines = Vec::with_capacity(proposal.lines.len());

    for (line_no, line) in (1_i32..).zip(&proposal.lines) {
        let account_code = required(
            &line.account_code,
            LedgerError::MissingAccountCode { line: line_no },
        )?;
        let amount =
            Decimal::from_str(line.amount.trim()).map_err(|_| LedgerError::InvalidAmount {
                line: line_no,
                value: line.amount.clone(),
            })?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { line: line_no });
        }

        let overflow = || LedgerError::AmountOverflow { line: line_no };
        let base = amount.checked_mul(exchange_rate).ok_or_else(overflow)?;
        let (entry_type, base_debit, base_credit) = if line.is_debit {
            totals.debit = totals.debit.checked_add(base).ok_or_else(overflow)?;
            (EntryType::Debit, base, Decimal::ZERO)
        } else {
            totals.credit = totals.credit.checked_add(base).ok_or_else(overflow)?;
            (EntryType::Credit, Decimal::ZERO, base)
        };

        lines.push(ValidatedLine {
            line_no,
            account_code,
            entry_type,
            amount,
            base_debit,
            base_credit,
        });
    }

    if !totals.is_balanced() {
        return Err(LedgerError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(ValidatedProposal {
        document_type,
        company_code,
        idempotency_key,
        currency,
        exchange_rate,
        posting_date,
        document_date,
        narration: proposal.narration.trim().to_string(),
        document_id: proposal.document_id,
        lines,
        totals,
    })
}
