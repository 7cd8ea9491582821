//! Inventory costing and quantity guards.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::workflow::error::WorkflowError;

/// Decimal places kept on weighted-average unit costs.
pub const UNIT_COST_SCALE: u32 = 6;

/// Warning raised when a vendor invoice strays from the PO total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDeviation {
    /// PO total.
    pub expected: Decimal,
    /// Amount on the vendor's invoice.
    pub invoiced: Decimal,
    /// `|invoiced - expected| / expected * 100`, two decimals.
    pub deviation_pct: Decimal,
}

impl InvoiceDeviation {
    /// Human-readable warning text.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Vendor invoice {} deviates {}% from PO total {}",
            self.invoiced, self.deviation_pct, self.expected
        )
    }
}

/// Stateless costing helpers.
pub struct CostingService;

impl CostingService {
    /// Weighted-average unit cost after a receipt.
    ///
    /// `(old_qty * old_cost + qty * cost) / (old_qty + qty)`. When nothing is
    /// on hand (or the item is short), the receipt cost is taken as-is.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` when the blended stock value exceeds the decimal range.
    pub fn weighted_average(
        on_hand: Decimal,
        unit_cost: Decimal,
        received_qty: Decimal,
        received_cost: Decimal,
    ) -> Result<Decimal, WorkflowError> {
        if on_hand <= Decimal::ZERO {
            return Ok(received_cost);
        }
        let overflow = || WorkflowError::AmountOverflow("stock value");
        let total_qty = on_hand.checked_add(received_qty).ok_or_else(overflow)?;
        if total_qty.is_zero() {
            return Ok(received_cost);
        }
        let value = Self::line_total(on_hand, unit_cost)?
            .checked_add(Self::line_total(received_qty, received_cost)?)
            .ok_or_else(overflow)?;
        let blended = value.checked_div(total_qty).ok_or_else(overflow)?;
        Ok(blended
            .round_dp_with_strategy(UNIT_COST_SCALE, RoundingStrategy::MidpointNearestEven)
            .normalize())
    }

    /// `quantity * unit_price`.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` when the product exceeds the decimal range.
    pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, WorkflowError> {
        quantity
            .checked_mul(unit_price)
            .ok_or(WorkflowError::AmountOverflow("line total"))
    }

    /// Sums line totals.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` when a line total or the running sum exceeds the
    /// decimal range.
    pub fn document_total<I>(lines: I) -> Result<Decimal, WorkflowError>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        lines
            .into_iter()
            .try_fold(Decimal::ZERO, |total, (quantity, price)| {
                total
                    .checked_add(Self::line_total(quantity, price)?)
                    .ok_or(WorkflowError::AmountOverflow("document total"))
            })
    }

    /// Rejects non-positive quantities.
    pub fn ensure_positive(quantity: Decimal) -> Result<(), WorkflowError> {
        if quantity > Decimal::ZERO {
            Ok(())
        } else {
            Err(WorkflowError::InvalidQuantity(quantity))
        }
    }

    /// Over-receipt guard for one purchase-order line.
    ///
    /// Callers must hold the line's row lock while summing `already_received`
    /// and inserting the receipt.
    pub fn check_receipt(
        line_id: Uuid,
        ordered: Decimal,
        already_received: Decimal,
        receiving: Decimal,
    ) -> Result<(), WorkflowError> {
        Self::ensure_positive(receiving)?;
        let attempted_total = already_received + receiving;
        if attempted_total > ordered {
            return Err(WorkflowError::QuantityExceedsOrdered {
                line_id,
                attempted_total,
                ordered,
                already_received,
            });
        }
        Ok(())
    }

    /// Checks that `requested` units are available (on hand minus reserved).
    pub fn check_available(
        product_id: Uuid,
        on_hand: Decimal,
        reserved: Decimal,
        requested: Decimal,
    ) -> Result<(), WorkflowError> {
        let available = on_hand - reserved;
        if requested > available {
            return Err(WorkflowError::InsufficientStock {
                product_id,
                requested,
                available,
            });
        }
        Ok(())
    }

    /// Returns a warning when `invoiced` differs from `expected` by more than `tolerance_pct`.
    ///
    /// Never blocks; the caller records the invoice either way.
    #[must_use]
    pub fn invoice_deviation(
        expected: Decimal,
        invoiced: Decimal,
        tolerance_pct: Decimal,
    ) -> Option<InvoiceDeviation> {
        let Some(diff) = invoiced.checked_sub(expected).map(|d| d.abs()) else {
            return Some(InvoiceDeviation {
                expected,
                invoiced,
                deviation_pct: Decimal::MAX,
            });
        };
        let exact_pct = if expected.is_zero() {
            if diff.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::ONE_HUNDRED
            }
        } else {
            diff.checked_div(expected.abs())
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::MAX)
        };

        (exact_pct > tolerance_pct).then(|| InvoiceDeviation {
            expected,
            invoiced,
            deviation_pct: exact_pct.round_dp(2),
        })
    }
}
