//! Workflow domain types for order and purchase-order lifecycles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sales order status.
///
/// The valid transitions are:
/// - Draft → Confirmed (confirm: order number, stock reserved)
/// - Confirmed → Shipped (ship: stock deducted, COGS booked)
/// - Shipped → Invoiced (invoice: AR / revenue booked, invoice number)
/// - Invoiced → Paid (payment: bank / AR booked)
/// - Draft → Cancelled (cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SalesOrderStatus {
    /// Editable, nothing reserved.
    Draft,
    /// Numbered, stock reserved.
    Confirmed,
    /// Goods left the warehouse.
    Shipped,
    /// Customer billed.
    Invoiced,
    /// Customer paid.
    Paid,
    /// Abandoned before confirmation.
    Cancelled,
}

impl SalesOrderStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Invoiced => "INVOICED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "CONFIRMED" => Some(Self::Confirmed),
            "SHIPPED" => Some(Self::Shipped),
            "INVOICED" => Some(Self::Invoiced),
            "PAID" => Some(Self::Paid),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Purchase order status.
///
/// The valid transitions are:
/// - Draft → Approved (approve: PO number; repeating it is a no-op)
/// - Approved → Received (receive: once every line is fully received)
/// - Received → Invoiced (vendor invoice: GR-clearing / AP booked)
/// - Invoiced → Paid (pay vendor: AP / bank booked)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseOrderStatus {
    /// Editable.
    Draft,
    /// Numbered, open for receipts.
    Approved,
    /// Every line fully received.
    Received,
    /// Vendor invoice recorded.
    Invoiced,
    /// Vendor paid.
    Paid,
}

impl PurchaseOrderStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
            Self::Received => "RECEIVED",
            Self::Invoiced => "INVOICED",
            Self::Paid => "PAID",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "APPROVED" => Some(Self::Approved),
            "RECEIVED" => Some(Self::Received),
            "INVOICED" => Some(Self::Invoiced),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of checking a requested transition against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Perform the transition.
    Proceed,
    /// The transition already happened and repeating it is defined as a no-op.
    AlreadyApplied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_status_strings() {
        for s in [
            SalesOrderStatus::Draft,
            SalesOrderStatus::Confirmed,
            SalesOrderStatus::Shipped,
            SalesOrderStatus::Invoiced,
            SalesOrderStatus::Paid,
            SalesOrderStatus::Cancelled,
        ] {
            assert_eq!(SalesOrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SalesOrderStatus::parse("shipped"), Some(SalesOrderStatus::Shipped));
        assert_eq!(SalesOrderStatus::parse("void"), None);
    }

    #[test]
    fn test_purchase_status_strings() {
        assert_eq!(
            PurchaseOrderStatus::parse("approved"),
            Some(PurchaseOrderStatus::Approved)
        );
        assert_eq!(PurchaseOrderStatus::Received.to_string(), "RECEIVED");
        assert_eq!(PurchaseOrderStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SalesOrderStatus::Paid.is_terminal());
        assert!(SalesOrderStatus::Cancelled.is_terminal());
        assert!(!SalesOrderStatus::Shipped.is_terminal());
    }
}
