//! Account rule repository: persists role-to-code rules and resolves them.

use chrono::{NaiveDate, Utc};
use corebook_core::rules::{AccountRole, AccountRule, RuleEngine, RuleError};
use corebook_shared::types::CompanyId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::entities::{account_rules, sea_orm_active_enums};

/// Input for creating a rule.
#[derive(Debug, Clone)]
pub struct CreateRuleInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Role the rule answers.
    pub role: AccountRole,
    /// Account code the role maps to.
    pub account_code: String,
    /// First day in effect.
    pub effective_from: NaiveDate,
    /// Last day in effect, open-ended when `None`.
    pub effective_to: Option<NaiveDate>,
    /// Lower wins.
    pub priority: i32,
}

/// Repository for account rules.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    db: DatabaseConnection,
}

impl RuleRepository {
    /// Creates a new rule repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stores an active rule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` when `effective_to` precedes `effective_from`.
    #[tracing::instrument(skip(self), fields(company_id = %input.company_id, role = %input.role))]
    pub async fn create_rule(
        &self,
        input: CreateRuleInput,
    ) -> Result<account_rules::Model, RuleError> {
        RuleEngine::validate_range(input.effective_from, input.effective_to)?;

        let rule = account_rules::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(input.company_id.into_inner()),
            role: Set(input.role.into()),
            account_code: Set(input.account_code.trim().to_string()),
            effective_from: Set(input.effective_from),
            effective_to: Set(input.effective_to),
            priority: Set(input.priority),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        rule.insert(&self.db)
            .await
            .map_err(|e| RuleError::Database(e.to_string()))
    }

    /// Resolves `role` to an account code for the company on `date`.
    ///
    /// # Errors
    ///
    /// Returns `NoRuleConfigured` if no active rule is in effect.
    pub async fn resolve(
        &self,
        company_id: CompanyId,
        role: AccountRole,
        date: NaiveDate,
    ) -> Result<String, RuleError> {
        Self::resolve_in_tx(&self.db, company_id.into_inner(), role, date).await
    }

    /// Resolves a role on any connection, typically a workflow transaction.
    ///
    /// # Errors
    ///
    /// Returns `NoRuleConfigured` if no active rule is in effect.
    pub async fn resolve_in_tx<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        role: AccountRole,
        date: NaiveDate,
    ) -> Result<String, RuleError> {
        let rules: Vec<AccountRule> = account_rules::Entity::find()
            .filter(account_rules::Column::CompanyId.eq(company_id))
            .filter(account_rules::Column::Role.eq(sea_orm_active_enums::AccountRole::from(role)))
            .filter(account_rules::Column::IsActive.eq(true))
            .filter(account_rules::Column::EffectiveFrom.lte(date))
            .all(conn)
            .await
            .map_err(|e| RuleError::Database(e.to_string()))?
            .into_iter()
            .map(|m| AccountRule {
                role: m.role.into(),
                account_code: m.account_code,
                effective_from: m.effective_from,
                effective_to: m.effective_to,
                priority: m.priority,
                is_active: m.is_active,
            })
            .collect();

        let code = RuleEngine::select(&rules, role, date)?;
        tracing::debug!(%company_id, %role, %date, %code, "Account rule resolved");
        Ok(code)
    }
}
