//! Property-based tests for WorkflowService.

use proptest::prelude::*;

use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{Decision, PurchaseOrderStatus, SalesOrderStatus};

/// Strategy for generating random SalesOrderStatus values.
fn arb_sales_status() -> impl Strategy<Value = SalesOrderStatus> {
    prop_oneof![
        Just(SalesOrderStatus::Draft),
        Just(SalesOrderStatus::Confirmed),
        Just(SalesOrderStatus::Shipped),
        Just(SalesOrderStatus::Invoiced),
        Just(SalesOrderStatus::Paid),
        Just(SalesOrderStatus::Cancelled),
    ]
}

/// Strategy for generating random PurchaseOrderStatus values.
fn arb_po_status() -> impl Strategy<Value = PurchaseOrderStatus> {
    prop_oneof![
        Just(PurchaseOrderStatus::Draft),
        Just(PurchaseOrderStatus::Approved),
        Just(PurchaseOrderStatus::Received),
        Just(PurchaseOrderStatus::Invoiced),
        Just(PurchaseOrderStatus::Paid),
    ]
}

type SalesStep = fn(SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError>;

fn sales_steps() -> [(SalesStep, SalesOrderStatus); 5] {
    [
        (WorkflowService::confirm_order, SalesOrderStatus::Draft),
        (WorkflowService::ship_order, SalesOrderStatus::Confirmed),
        (WorkflowService::invoice_order, SalesOrderStatus::Shipped),
        (WorkflowService::pay_order, SalesOrderStatus::Invoiced),
        (WorkflowService::cancel_order, SalesOrderStatus::Draft),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Each sales transition succeeds from exactly one status.
    #[test]
    fn prop_sales_transition_requires_predecessor(status in arb_sales_status()) {
        for (step, predecessor) in sales_steps() {
            let result = step(status);
            if status == predecessor {
                prop_assert!(result.is_ok());
            } else {
                let is_invalid = matches!(result, Err(WorkflowError::InvalidTransition { .. }));
                prop_assert!(is_invalid);
            }
        }
    }

    /// Terminal sales statuses accept no transition.
    #[test]
    fn prop_terminal_sales_status_is_final(status in arb_sales_status()) {
        prop_assume!(status.is_terminal());
        for (step, _) in sales_steps() {
            prop_assert!(step(status).is_err());
        }
    }

    /// Approve proceeds from Draft, is a no-op from Approved, and fails otherwise.
    #[test]
    fn prop_approve_po(status in arb_po_status()) {
        let result = WorkflowService::approve_po(status);
        match status {
            PurchaseOrderStatus::Draft => prop_assert_eq!(result.unwrap(), Decision::Proceed),
            PurchaseOrderStatus::Approved => prop_assert_eq!(result.unwrap(), Decision::AlreadyApplied),
            _ => prop_assert!(result.is_err()),
        }
    }

    /// Receipts, vendor invoices and payments each require their predecessor.
    #[test]
    fn prop_po_forward_steps(status in arb_po_status()) {
        prop_assert_eq!(
            WorkflowService::receive_po(status).is_ok(),
            status == PurchaseOrderStatus::Approved
        );
        prop_assert_eq!(
            WorkflowService::invoice_po(status).is_ok(),
            status == PurchaseOrderStatus::Received
        );
        prop_assert_eq!(
            WorkflowService::pay_po(status).is_ok(),
            status == PurchaseOrderStatus::Invoiced
        );
    }
}
