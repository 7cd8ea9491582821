//! Account balances and running statements.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Per-account totals for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    /// Account id.
    pub account_id: Uuid,
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Sum of base debits.
    pub total_debit: Decimal,
    /// Sum of base credits.
    pub total_credit: Decimal,
    /// `total_debit - total_credit`.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Builds a balance row from its totals.
    #[must_use]
    pub fn new(
        account_id: Uuid,
        account_code: String,
        account_name: String,
        total_debit: Decimal,
        total_credit: Decimal,
    ) -> Self {
        Self {
            account_id,
            account_code,
            account_name,
            total_debit,
            total_credit,
            balance: total_debit - total_credit,
        }
    }
}

/// One ledger line as read for a statement, before the running balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    /// Owning entry.
    pub entry_id: Uuid,
    /// Entry posting date.
    pub posting_date: NaiveDate,
    /// Line position within the entry.
    pub line_no: i32,
    /// Entry narration.
    pub narration: String,
    /// Base debit.
    pub debit: Decimal,
    /// Base credit.
    pub credit: Decimal,
}

/// A statement line with its running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    /// Owning entry.
    pub entry_id: Uuid,
    /// Entry posting date.
    pub posting_date: NaiveDate,
    /// Line position within the entry.
    pub line_no: i32,
    /// Entry narration.
    pub narration: String,
    /// Base debit.
    pub debit: Decimal,
    /// Base credit.
    pub credit: Decimal,
    /// Opening balance plus cumulative `debit - credit` up to and including this line.
    pub running_balance: Decimal,
}

/// An account statement over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatement {
    /// Account code.
    pub account_code: String,
    /// First date included.
    pub from: NaiveDate,
    /// Last date included.
    pub to: NaiveDate,
    /// Balance of all lines dated before `from`.
    pub opening_balance: Decimal,
    /// Lines in (posting date, entry id, line number) order.
    pub lines: Vec<StatementLine>,
    /// Balance after the last line.
    pub closing_balance: Decimal,
}

/// Builds a statement, ordering rows by posting date, then entry id, then line.
///
/// Entry ids are time-ordered, so the order is stable when several entries
/// share a posting date.
#[must_use]
pub fn build_statement(
    account_code: String,
    from: NaiveDate,
    to: NaiveDate,
    opening_balance: Decimal,
    mut rows: Vec<StatementRow>,
) -> AccountStatement {
    rows.sort_by(|a, b| {
        a.posting_date
            .cmp(&b.posting_date)
            .then(a.entry_id.cmp(&b.entry_id))
            .then(a.line_no.cmp(&b.line_no))
    });

    let mut running = opening_balance;
    let lines = rows
        .into_iter()
        .map(|row| {
            running += row.debit - row.credit;
            StatementLine {
                entry_id: row.entry_id,
                posting_date: row.posting_date,
                line_no: row.line_no,
                narration: row.narration,
                debit: row.debit,
                credit: row.credit,
                running_balance: running,
            }
        })
        .collect();

    AccountStatement {
        account_code,
        from,
        to,
        opening_balance,
        lines,
        closing_balance: running,
    }
}
