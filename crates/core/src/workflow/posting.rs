//! Ledger proposals for workflow transitions.
//!
//! Each builder returns the accounting consequence of one transition as a
//! balanced [`Proposal`]. Zero-value postings come back as `None` so the
//! caller can advance the state machine without an empty entry.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::Proposal;

/// Document type codes used by the workflows.
pub mod doc_types {
    /// General journal voucher.
    pub const JOURNAL: &str = "JV";
    /// Sales order confirmation.
    pub const SALES_ORDER: &str = "SO";
    /// Delivery / shipment.
    pub const DELIVERY: &str = "DN";
    /// Sales invoice.
    pub const SALES_INVOICE: &str = "SINV";
    /// Customer receipt.
    pub const CUSTOMER_RECEIPT: &str = "RCPT";
    /// Purchase order approval.
    pub const PURCHASE_ORDER: &str = "PO";
    /// Goods receipt.
    pub const GOODS_RECEIPT: &str = "GRN";
    /// Vendor invoice.
    pub const PURCHASE_INVOICE: &str = "PINV";
    /// Vendor payment.
    pub const VENDOR_PAYMENT: &str = "PAY";
}

/// Header values shared by every line of a workflow posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingContext {
    /// Company code.
    pub company_code: String,
    /// Transaction currency.
    pub currency: String,
    /// Rate to base currency.
    pub exchange_rate: Decimal,
    /// Posting date.
    pub posting_date: NaiveDate,
}

impl PostingContext {
    fn proposal(&self, document_type: &str, key: String, narration: String) -> Proposal {
        Proposal::new(
            document_type,
            self.company_code.clone(),
            key,
            self.currency.clone(),
            self.posting_date,
        )
        .with_exchange_rate(self.exchange_rate)
        .with_narration(narration)
    }
}

/// Deterministic idempotency key for a one-shot transition of a document.
#[must_use]
pub fn transition_key(prefix: &str, document_id: Uuid, step: &str) -> String {
    format!("{prefix}-{document_id}-{step}")
}

/// Sums amounts per account code, dropping zero totals.
fn group_by_account(lines: &[(String, Decimal)]) -> BTreeMap<String, Decimal> {
    let mut grouped: BTreeMap<String, Decimal> = BTreeMap::new();
    for (code, amount) in lines {
        *grouped.entry(code.clone()).or_default() += *amount;
    }
    grouped.retain(|_, amount| !amount.is_zero());
    grouped
}

/// Stateless builders for workflow postings.
pub struct PostingBuilder;

impl PostingBuilder {
    fn two_line(
        ctx: &PostingContext,
        document_type: &str,
        key: String,
        narration: String,
        debit_account: &str,
        credit_account: &str,
        amount: Decimal,
    ) -> Option<Proposal> {
        if amount <= Decimal::ZERO {
            return None;
        }
        Some(
            ctx.proposal(document_type, key, narration)
                .debit(debit_account, amount)
                .credit(credit_account, amount),
        )
    }

    /// Shipment: Dr COGS / Cr Inventory at the cost in effect at shipment.
    #[must_use]
    pub fn shipment(
        ctx: &PostingContext,
        key: String,
        narration: String,
        cogs_account: &str,
        inventory_account: &str,
        cost: Decimal,
    ) -> Option<Proposal> {
        Self::two_line(
            ctx,
            doc_types::DELIVERY,
            key,
            narration,
            cogs_account,
            inventory_account,
            cost,
        )
    }

    /// Sales invoice: Dr AR for the total / Cr each revenue account for its share.
    #[must_use]
    pub fn sales_invoice(
        ctx: &PostingContext,
        key: String,
        narration: String,
        receivable_account: &str,
        revenue: &[(String, Decimal)],
    ) -> Option<Proposal> {
        let grouped = group_by_account(revenue);
        let total: Decimal = grouped.values().copied().sum();
        if total <= Decimal::ZERO {
            return None;
        }

        let mut proposal = ctx
            .proposal(doc_types::SALES_INVOICE, key, narration)
            .debit(receivable_account, total);
        for (code, amount) in grouped {
            proposal = proposal.credit(code, amount);
        }
        Some(proposal)
    }

    /// Customer payment: Dr Bank / Cr AR.
    #[must_use]
    pub fn customer_payment(
        ctx: &PostingContext,
        key: String,
        narration: String,
        bank_account: &str,
        receivable_account: &str,
        amount: Decimal,
    ) -> Option<Proposal> {
        Self::two_line(
            ctx,
            doc_types::CUSTOMER_RECEIPT,
            key,
            narration,
            bank_account,
            receivable_account,
            amount,
        )
    }

    /// Goods receipt: Dr Inventory (or expense) per line / Cr the clearing account.
    #[must_use]
    pub fn receipt(
        ctx: &PostingContext,
        key: String,
        narration: String,
        debits: &[(String, Decimal)],
        clearing_account: &str,
    ) -> Option<Proposal> {
        let grouped = group_by_account(debits);
        let total: Decimal = grouped.values().copied().sum();
        if total <= Decimal::ZERO {
            return None;
        }

        let mut proposal = ctx.proposal(doc_types::GOODS_RECEIPT, key, narration);
        for (code, amount) in grouped {
            proposal = proposal.debit(code, amount);
        }
        Some(proposal.credit(clearing_account, total))
    }

    /// Vendor invoice: Dr GR-clearing / Cr AP at the PO total.
    #[must_use]
    pub fn vendor_invoice(
        ctx: &PostingContext,
        key: String,
        narration: String,
        clearing_account: &str,
        payable_account: &str,
        amount: Decimal,
    ) -> Option<Proposal> {
        Self::two_line(
            ctx,
            doc_types::PURCHASE_INVOICE,
            key,
            narration,
            clearing_account,
            payable_account,
            amount,
        )
    }

    /// Vendor payment: Dr AP / Cr the chosen bank account.
    #[must_use]
    pub fn vendor_payment(
        ctx: &PostingContext,
        key: String,
        narration: String,
        payable_account: &str,
        bank_account: &str,
        amount: Decimal,
    ) -> Option<Proposal> {
        Self::two_line(
            ctx,
            doc_types::VENDOR_PAYMENT,
            key,
            narration,
            payable_account,
            bank_account,
            amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerService;
    use rust_decimal_macros::dec;

    fn ctx() -> PostingContext {
        PostingContext {
            company_code: "ACME".into(),
            currency: "USD".into(),
            exchange_rate: Decimal::ONE,
            posting_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        }
    }

    #[test]
    fn test_sales_invoice_groups_revenue() {
        let proposal = PostingBuilder::sales_invoice(
            &ctx(),
            "k".into(),
            "inv".into(),
            "1100",
            &[
                ("4000".into(), dec!(3000)),
                ("4100".into(), dec!(500)),
                ("4000".into(), dec!(1500)),
            ],
        )
        .unwrap();

        assert_eq!(proposal.document_type, "SINV");
        assert_eq!(proposal.lines.len(), 3);
        assert!(proposal.lines[0].is_debit);
        assert_eq!(proposal.lines[0].amount, "5000");
        assert_eq!(proposal.lines[1].account_code, "4000");
        assert_eq!(proposal.lines[1].amount, "4500");

        let validated = LedgerService::prepare(proposal).unwrap();
        assert_eq!(validated.totals.debit, dec!(5000));
    }

    #[test]
    fn test_zero_value_postings_are_skipped() {
        assert!(PostingBuilder::shipment(&ctx(), "k".into(), String::new(), "5000", "1300", Decimal::ZERO).is_none());
        assert!(PostingBuilder::sales_invoice(
            &ctx(),
            "k".into(),
            String::new(),
            "1100",
            &[("4000".into(), Decimal::ZERO)]
        )
        .is_none());
        assert!(PostingBuilder::receipt(&ctx(), "k".into(), String::new(), &[], "2150").is_none());
    }

    #[test]
    fn test_receipt_mixes_inventory_and_expense() {
        let proposal = PostingBuilder::receipt(
            &ctx(),
            "k".into(),
            "grn".into(),
            &[("1300".into(), dec!(2000)), ("6100".into(), dec!(150))],
            "2150",
        )
        .unwrap();
        let validated = LedgerService::prepare(proposal).unwrap();
        assert_eq!(validated.lines.len(), 3);
        assert_eq!(validated.lines[2].account_code, "2150");
        assert_eq!(validated.lines[2].base_credit, dec!(2150));
    }

    #[test]
    fn test_two_line_builders_balance_at_rate() {
        let mut c = ctx();
        c.exchange_rate = dec!(16000);
        for proposal in [
            PostingBuilder::customer_payment(&c, "a".into(), String::new(), "1000", "1100", dec!(12.5)),
            PostingBuilder::vendor_invoice(&c, "b".into(), String::new(), "2150", "2100", dec!(12.5)),
            PostingBuilder::vendor_payment(&c, "c".into(), String::new(), "2100", "1000", dec!(12.5)),
        ] {
            let validated = LedgerService::prepare(proposal.unwrap()).unwrap();
            assert_eq!(validated.totals.debit, dec!(200000));
            assert_eq!(validated.totals.credit, dec!(200000));
        }
    }

    #[test]
    fn test_transition_key_is_stable() {
        let id = Uuid::from_u128(7);
        assert_eq!(transition_key("SO", id, "SHIP"), transition_key("SO", id, "SHIP"));
        assert_ne!(transition_key("SO", id, "SHIP"), transition_key("SO", id, "INV"));
    }
}
