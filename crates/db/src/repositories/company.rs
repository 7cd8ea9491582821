//! Company repository.

use chrono::Utc;
use corebook_shared::AppError;
use corebook_shared::types::CompanyId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use uuid::Uuid;

use crate::entities::companies;

/// Error types for company setup.
#[derive(Debug, thiserror::Error)]
pub enum CompanyError {
    /// Company code already exists.
    #[error("Company code '{0}' already exists")]
    DuplicateCode(String),

    /// Code, name or currency is blank.
    #[error("Invalid company: {0}")]
    Invalid(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CompanyError> for AppError {
    fn from(err: CompanyError) -> Self {
        match err {
            CompanyError::DuplicateCode(_) => Self::Conflict(err.to_string()),
            CompanyError::Invalid(_) => Self::Validation(err.to_string()),
            CompanyError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Repository for companies.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    db: DatabaseConnection,
}

impl CompanyRepository {
    /// Creates a new company repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a company. Codes are unique across the store.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode` if the code is taken.
    #[tracing::instrument(skip(self))]
    pub async fn create_company(
        &self,
        code: &str,
        name: &str,
        base_currency: &str,
    ) -> Result<companies::Model, CompanyError> {
        let code = code.trim();
        let base_currency = base_currency.trim().to_uppercase();
        if code.is_empty() {
            return Err(CompanyError::Invalid("code is required"));
        }
        if name.trim().is_empty() {
            return Err(CompanyError::Invalid("name is required"));
        }
        if base_currency.len() != 3 {
            return Err(CompanyError::Invalid("base currency must be a 3-letter code"));
        }

        let company = companies::ActiveModel {
            id: Set(CompanyId::new().into_inner()),
            code: Set(code.to_string()),
            name: Set(name.trim().to_string()),
            base_currency: Set(base_currency),
            created_at: Set(Utc::now().into()),
        };

        match company.insert(&self.db).await {
            Ok(model) => {
                tracing::info!(company_id = %model.id, code = %model.code, "Company created");
                Ok(model)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(CompanyError::DuplicateCode(code.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Finds a company by its code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<companies::Model>, DbErr> {
        companies::Entity::find()
            .filter(companies::Column::Code.eq(code.trim()))
            .one(&self.db)
            .await
    }

    /// Finds a company by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: CompanyId) -> Result<Option<companies::Model>, DbErr> {
        companies::Entity::find_by_id(Uuid::from(id)).one(&self.db).await
    }
}
