//! Property-based tests for proposal normalization and validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::normalize::normalize;
use super::service::LedgerService;
use super::types::{Proposal, ProposalLine};

/// Strategy to generate a positive amount with two decimals.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a positive exchange rate with up to four decimals.
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Strategy for amounts above half the `Decimal` range.
fn huge_amount() -> impl Strategy<Value = Decimal> {
    (40_000_000_000_000_000_000_000_000_000i128..=79_228_162_514_264_337_593_543_950_335i128)
        .prop_map(|n| Decimal::from_i128_with_scale(n, 0))
}

fn line(code: &str, is_debit: bool, amount: Decimal) -> ProposalLine {
    ProposalLine {
        account_code: code.to_string(),
        is_debit,
        amount: amount.to_string(),
    }
}

fn proposal(rate: Decimal, lines: Vec<ProposalLine>) -> Proposal {
    Proposal {
        document_type: "JV".into(),
        company_code: "ACME".into(),
        idempotency_key: "prop".into(),
        currency: "USD".into(),
        exchange_rate: Some(rate.to_string()),
        posting_date: "2026-06-30".into(),
        document_date: None,
        narration: String::new(),
        document_id: None,
        lines,
    }
}

/// Splits `total` into debit lines and one credit line.
fn arb_balanced() -> impl Strategy<Value = (Decimal, Vec<ProposalLine>)> {
    (prop::collection::vec(positive_amount(), 1..6), positive_rate()).prop_map(
        |(amounts, rate)| {
            let total: Decimal = amounts.iter().copied().sum();
            let mut lines: Vec<ProposalLine> = amounts
                .into_iter()
                .enumerate()
                .map(|(i, a)| line(&format!("6{i:03}"), true, a))
                .collect();
            lines.push(line("1000", false, total));
            (rate, lines)
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any proposal whose transaction amounts balance also balances in base
    /// currency, for every positive rate.
    #[test]
    fn prop_balanced_proposals_validate((rate, lines) in arb_balanced()) {
        let validated = LedgerService::prepare(proposal(rate, lines)).unwrap();
        prop_assert_eq!(validated.totals.debit, validated.totals.credit);
        let debit: Decimal = validated.lines.iter().map(|l| l.base_debit).sum();
        prop_assert_eq!(debit, validated.totals.debit);
    }

    /// Perturbing one line by a cent always breaks the balance.
    #[test]
    fn prop_perturbed_proposals_rejected((rate, mut lines) in arb_balanced()) {
        let last = lines.len() - 1;
        let amount: Decimal = lines[last].amount.parse().unwrap();
        lines[last].amount = (amount + Decimal::new(1, 2)).to_string();
        let result = LedgerService::prepare(proposal(rate, lines));
        let is_unbalanced = matches!(result, Err(LedgerError::Unbalanced { .. }));
        prop_assert!(is_unbalanced);
    }

    /// Non-positive amounts are rejected regardless of the other lines.
    #[test]
    fn prop_non_positive_rejected(amount in positive_amount(), other in positive_amount()) {
        let lines = vec![line("6000", true, -amount), line("1000", false, other)];
        let result = LedgerService::prepare(proposal(Decimal::ONE, lines));
        let is_non_positive = matches!(result, Err(LedgerError::NonPositiveAmount { line: 1 }));
        prop_assert!(is_non_positive);
    }

    /// Amounts whose base value or side total leaves the decimal range are
    /// reported as errors instead of panicking.
    #[test]
    fn prop_overflow_is_rejected(a in huge_amount(), b in huge_amount(), rate in 2i64..1000) {
        let scaled = vec![line("6000", true, a), line("1000", false, a)];
        let result = LedgerService::prepare(proposal(Decimal::from(rate), scaled));
        let is_overflow = matches!(result, Err(LedgerError::AmountOverflow { line: 1 }));
        prop_assert!(is_overflow);

        let summed = vec![line("6000", true, a), line("6100", true, b), line("1000", false, a)];
        let result = LedgerService::prepare(proposal(Decimal::ONE, summed));
        let is_overflow = matches!(result, Err(LedgerError::AmountOverflow { line: 2 }));
        prop_assert!(is_overflow);
    }

    /// Normalization never changes a present amount, rate or document date.
    #[test]
    fn prop_normalize_keeps_present_values(
        (rate, lines) in arb_balanced(),
        day in 1u32..28,
    ) {
        let mut p = proposal(rate, lines);
        p.document_date = Some(format!("2026-06-{day:02}"));
        let normalized = normalize(p.clone());
        prop_assert_eq!(&normalized.lines, &p.lines);
        prop_assert_eq!(&normalized.exchange_rate, &p.exchange_rate);
        prop_assert_eq!(&normalized.document_date, &p.document_date);
    }
}
