//! Property-based tests for costing and posting builders.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use chrono::NaiveDate;

use crate::ledger::LedgerService;
use crate::workflow::costing::CostingService;
use crate::workflow::posting::{PostingBuilder, PostingContext};

/// Strategy for quantities with up to two decimals.
fn arb_qty() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for unit costs with up to two decimals.
fn arb_cost() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn ctx() -> PostingContext {
    PostingContext {
        company_code: "ACME".into(),
        currency: "USD".into(),
        exchange_rate: Decimal::ONE,
        posting_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The blended cost always lies between the two input costs.
    #[test]
    fn prop_weighted_average_is_bounded(
        q1 in arb_qty(), c1 in arb_cost(), q2 in arb_qty(), c2 in arb_cost(),
    ) {
        let avg = CostingService::weighted_average(q1, c1, q2, c2).unwrap();
        let lo = c1.min(c2);
        let hi = c1.max(c2);
        prop_assert!(avg >= lo && avg <= hi, "{} not within [{}, {}]", avg, lo, hi);
    }

    /// Receiving at the current cost leaves the cost unchanged.
    #[test]
    fn prop_same_cost_receipt_keeps_cost(q1 in arb_qty(), q2 in arb_qty(), c in arb_cost()) {
        prop_assert_eq!(CostingService::weighted_average(q1, c, q2, c).unwrap(), c);
    }

    /// Cumulative receipts never exceed the ordered quantity.
    #[test]
    fn prop_receipts_never_exceed_ordered(
        ordered in arb_qty(),
        receipts in prop::collection::vec(arb_qty(), 1..10),
    ) {
        let mut received = Decimal::ZERO;
        for qty in receipts {
            if CostingService::check_receipt(Uuid::nil(), ordered, received, qty).is_ok() {
                received += qty;
            }
        }
        prop_assert!(received <= ordered);
    }

    /// Sales invoices always validate and debit AR for the line total.
    #[test]
    fn prop_sales_invoice_balances(
        lines in prop::collection::vec((0usize..3, arb_qty(), arb_cost()), 1..8),
    ) {
        let revenue: Vec<(String, Decimal)> = lines
            .iter()
            .map(|(acct, qty, price)| (format!("40{acct}0"), CostingService::line_total(*qty, *price).unwrap()))
            .collect();
        let expected: Decimal = revenue.iter().map(|(_, a)| *a).sum();

        let proposal = PostingBuilder::sales_invoice(&ctx(), "k".into(), String::new(), "1100", &revenue)
            .unwrap();
        let validated = LedgerService::prepare(proposal).unwrap();
        prop_assert_eq!(validated.totals.debit, expected);
        prop_assert_eq!(validated.lines[0].amount, expected);
    }
}
