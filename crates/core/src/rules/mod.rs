//! Account rule engine: semantic role to concrete account code.
//!
//! Workflows never hard-code account codes. They ask for a role ("AR",
//! "inventory", "COGS") and the company's rules answer with a code, versioned
//! by effective date range and priority.

use std::fmt;

use chrono::NaiveDate;
use corebook_shared::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic account roles used by workflow postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Trade receivables.
    AccountsReceivable,
    /// Trade payables.
    AccountsPayable,
    /// Stock on hand.
    Inventory,
    /// Cost of goods sold.
    CostOfGoodsSold,
    /// Default sales revenue for products without their own revenue account.
    SalesRevenue,
    /// Default bank / cash account.
    Bank,
    /// Goods received, not yet invoiced.
    GoodsReceivedClearing,
}

impl AccountRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::AccountsReceivable,
        Self::AccountsPayable,
        Self::Inventory,
        Self::CostOfGoodsSold,
        Self::SalesRevenue,
        Self::Bank,
        Self::GoodsReceivedClearing,
    ];

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountsReceivable => "accounts_receivable",
            Self::AccountsPayable => "accounts_payable",
            Self::Inventory => "inventory",
            Self::CostOfGoodsSold => "cost_of_goods_sold",
            Self::SalesRevenue => "sales_revenue",
            Self::Bank => "bank",
            Self::GoodsReceivedClearing => "goods_received_clearing",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One versioned mapping from role to account code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRule {
    /// Role this rule answers.
    pub role: AccountRole,
    /// Account code within the company.
    pub account_code: String,
    /// First day the rule applies (inclusive).
    pub effective_from: NaiveDate,
    /// Last day the rule applies (inclusive); open-ended when `None`.
    pub effective_to: Option<NaiveDate>,
    /// Lower value wins.
    pub priority: i32,
    /// Inactive rules never match.
    pub is_active: bool,
}

impl AccountRule {
    /// Returns true if the rule is active and in effect on `date`.
    #[must_use]
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_from <= date
            && self.effective_to.is_none_or(|to| date <= to)
    }
}

/// Errors from rule resolution.
#[derive(Debug, Error)]
pub enum RuleError {
    /// No active rule covers the role on the date.
    #[error("No account rule configured for role {role} on {date}")]
    NoRuleConfigured {
        /// Requested role.
        role: AccountRole,
        /// Requested date.
        date: NaiveDate,
    },

    /// Rule range is inverted.
    #[error("Rule effective_to {to} is before effective_from {from}")]
    InvalidRange {
        /// Start.
        from: NaiveDate,
        /// End.
        to: NaiveDate,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl RuleError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoRuleConfigured { .. } => "NO_RULE_CONFIGURED",
            Self::InvalidRange { .. } => "INVALID_RULE_RANGE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<RuleError> for AppError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::NoRuleConfigured { .. } => Self::BusinessRule(err.to_string()),
            RuleError::InvalidRange { .. } => Self::Validation(err.to_string()),
            RuleError::Database(msg) => Self::Database(msg),
        }
    }
}

/// Stateless engine for selecting account rules.
pub struct RuleEngine;

impl RuleEngine {
    /// Selects the account code for `role` on `date`.
    ///
    /// Among active rules in effect, the lowest priority value wins; ties go
    /// to the most recent `effective_from`. An unresolved role is a hard
    /// failure, never a fallback to some default account.
    ///
    /// # Errors
    ///
    /// Returns `NoRuleConfigured` if nothing matches.
    pub fn select(
        rules: &[AccountRule],
        role: AccountRole,
        date: NaiveDate,
    ) -> Result<String, RuleError> {
        rules
            .iter()
            .filter(|r| r.role == role && r.applies_on(date))
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.effective_from.cmp(&a.effective_from))
            })
            .map(|r| r.account_code.clone())
            .ok_or(RuleError::NoRuleConfigured { role, date })
    }

    /// Checks a rule's date range before it is stored.
    pub fn validate_range(from: NaiveDate, to: Option<NaiveDate>) -> Result<(), RuleError> {
        match to {
            Some(to) if to < from => Err(RuleError::InvalidRange { from, to }),
            _ => Ok(()),
        }
    }
}
