//! Account directory: chart-of-accounts setup and code resolution.
//!
//! Codes are only ever resolved within one company. A code that exists
//! under another company is reported exactly like a missing one.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use corebook_core::ledger::LedgerError;
use corebook_shared::AppError;
use corebook_shared::types::{AccountId, CompanyId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use crate::entities::{accounts, companies, sea_orm_active_enums::AccountType};

/// Error types for account setup.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account code already exists in the company.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Company not found.
    #[error("Company not found: {0}")]
    CompanyNotFound(Uuid),

    /// Code or name is blank.
    #[error("Invalid account: {0}")]
    Invalid(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::DuplicateCode(_) => Self::Conflict(err.to_string()),
            AccountError::CompanyNotFound(_) => Self::NotFound(err.to_string()),
            AccountError::Invalid(_) => Self::Validation(err.to_string()),
            AccountError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Account code (unique within the company).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an active account.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode` if the code exists in the company, or
    /// `CompanyNotFound` if the company does not exist.
    #[tracing::instrument(skip(self), fields(company_id = %input.company_id, code = %input.code))]
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(AccountError::Invalid("code is required"));
        }
        if input.name.trim().is_empty() {
            return Err(AccountError::Invalid("name is required"));
        }

        let company_id = Uuid::from(input.company_id);
        if companies::Entity::find_by_id(company_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(AccountError::CompanyNotFound(company_id));
        }

        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            company_id: Set(company_id),
            code: Set(code.clone()),
            name: Set(input.name.trim().to_string()),
            account_type: Set(input.account_type),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        match account.insert(&self.db).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AccountError::DuplicateCode(code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists a company's accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(&self, company_id: CompanyId) -> Result<Vec<accounts::Model>, DbErr> {
        accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(Uuid::from(company_id)))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await
    }

    /// Resolves one active account code within the company.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing, inactive or foreign codes.
    pub async fn resolve_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<Uuid, LedgerError> {
        let resolved =
            Self::resolve_codes_in_tx(&self.db, Uuid::from(company_id), [code.to_string()]).await?;
        resolved
            .get(code.trim())
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// Resolves a set of account codes within the company in one query.
    ///
    /// Works on any connection, so it can run inside a caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` naming the first (by code) unresolved code.
    pub async fn resolve_codes_in_tx<C, I>(
        conn: &C,
        company_id: Uuid,
        codes: I,
    ) -> Result<HashMap<String, Uuid>, LedgerError>
    where
        C: ConnectionTrait,
        I: IntoIterator<Item = String>,
    {
        let wanted: BTreeSet<String> = codes.into_iter().map(|c| c.trim().to_string()).collect();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let found: HashMap<String, Uuid> = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company_id))
            .filter(accounts::Column::Code.is_in(wanted.iter().cloned()))
            .filter(accounts::Column::IsActive.eq(true))
            .all(conn)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?
            .into_iter()
            .map(|a| (a.code, a.id))
            .collect();

        if let Some(missing) = wanted.iter().find(|code| !found.contains_key(*code)) {
            return Err(LedgerError::AccountNotFound(missing.clone()));
        }
        Ok(found)
    }
}
