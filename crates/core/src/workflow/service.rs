//! Workflow service for order and purchase-order state transitions.
//!
//! Every forward transition requires the immediately preceding status.
//! Skipping or repeating a transition is rejected, with one exception:
//! approving an already approved purchase order is a no-op.

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Decision, PurchaseOrderStatus, SalesOrderStatus};

const SALES_ORDER: &str = "sales order";
const PURCHASE_ORDER: &str = "purchase order";

/// Stateless service for validating workflow transitions.
pub struct WorkflowService;

impl WorkflowService {
    fn require_sales(
        current: SalesOrderStatus,
        expected: SalesOrderStatus,
        target: SalesOrderStatus,
    ) -> Result<SalesOrderStatus, WorkflowError> {
        if current == expected {
            Ok(target)
        } else {
            Err(WorkflowError::InvalidTransition {
                document: SALES_ORDER,
                attempted: target.as_str(),
                actual: current.as_str(),
            })
        }
    }

    fn require_purchase(
        current: PurchaseOrderStatus,
        expected: PurchaseOrderStatus,
        target: PurchaseOrderStatus,
    ) -> Result<PurchaseOrderStatus, WorkflowError> {
        if current == expected {
            Ok(target)
        } else {
            Err(WorkflowError::InvalidTransition {
                document: PURCHASE_ORDER,
                attempted: target.as_str(),
                actual: current.as_str(),
            })
        }
    }

    /// Draft → Confirmed.
    pub fn confirm_order(current: SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError> {
        Self::require_sales(current, SalesOrderStatus::Draft, SalesOrderStatus::Confirmed)
    }

    /// Confirmed → Shipped.
    pub fn ship_order(current: SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError> {
        Self::require_sales(current, SalesOrderStatus::Confirmed, SalesOrderStatus::Shipped)
    }

    /// Shipped → Invoiced.
    pub fn invoice_order(current: SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError> {
        Self::require_sales(current, SalesOrderStatus::Shipped, SalesOrderStatus::Invoiced)
    }

    /// Invoiced → Paid.
    pub fn pay_order(current: SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError> {
        Self::require_sales(current, SalesOrderStatus::Invoiced, SalesOrderStatus::Paid)
    }

    /// Draft → Cancelled. The only cancellation path.
    pub fn cancel_order(current: SalesOrderStatus) -> Result<SalesOrderStatus, WorkflowError> {
        Self::require_sales(current, SalesOrderStatus::Draft, SalesOrderStatus::Cancelled)
    }

    /// Draft → Approved; Approved → no-op.
    pub fn approve_po(current: PurchaseOrderStatus) -> Result<Decision, WorkflowError> {
        match current {
            PurchaseOrderStatus::Draft => Ok(Decision::Proceed),
            PurchaseOrderStatus::Approved => Ok(Decision::AlreadyApplied),
            other => Err(WorkflowError::InvalidTransition {
                document: PURCHASE_ORDER,
                attempted: PurchaseOrderStatus::Approved.as_str(),
                actual: other.as_str(),
            }),
        }
    }

    /// Receipts are accepted only while the PO is Approved.
    ///
    /// The PO moves to Received once every line is fully received; partial
    /// receipts leave it Approved.
    pub fn receive_po(current: PurchaseOrderStatus) -> Result<(), WorkflowError> {
        Self::require_purchase(
            current,
            PurchaseOrderStatus::Approved,
            PurchaseOrderStatus::Received,
        )
        .map(|_| ())
    }

    /// Received → Invoiced.
    pub fn invoice_po(current: PurchaseOrderStatus) -> Result<PurchaseOrderStatus, WorkflowError> {
        Self::require_purchase(
            current,
            PurchaseOrderStatus::Received,
            PurchaseOrderStatus::Invoiced,
        )
    }

    /// Invoiced → Paid.
    pub fn pay_po(current: PurchaseOrderStatus) -> Result<PurchaseOrderStatus, WorkflowError> {
        Self::require_purchase(current, PurchaseOrderStatus::Invoiced, PurchaseOrderStatus::Paid)
    }
}
