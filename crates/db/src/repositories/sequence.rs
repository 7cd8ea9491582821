//! Document sequencer: gapless numbering under concurrent callers.
//!
//! A number is drawn only when a DRAFT document is posted, inside the same
//! transaction that flips it to POSTED. The counter row is advanced with a
//! single `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement, so two
//! callers in the same scope serialize on that row and a rolled-back caller
//! gives its value back.

use chrono::Utc;
use corebook_core::sequence::{
    DEFAULT_NUMBER_WIDTH, DocumentTypeConfig, SequenceError, SequenceScope, SequenceService,
};
use corebook_shared::types::{CompanyId, DocumentId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QuerySelect, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    companies, document_types, documents, sea_orm_active_enums::DocumentStatus,
};

const NEXT_VALUE_SQL: &str = r"
INSERT INTO document_sequences (company_id, document_type, financial_year, branch, last_value, updated_at)
VALUES ($1, $2, $3, $4, 1, NOW())
ON CONFLICT (company_id, document_type, financial_year, branch)
DO UPDATE SET last_value = document_sequences.last_value + 1, updated_at = NOW()
RETURNING last_value
";

fn db_err(e: sea_orm::DbErr) -> SequenceError {
    SequenceError::Database(e.to_string())
}

fn type_config(model: &document_types::Model) -> DocumentTypeConfig {
    DocumentTypeConfig {
        code: model.code.clone(),
        strategy: model.numbering_strategy.into(),
        resets_yearly: model.resets_yearly,
    }
}

/// Repository for numbered documents.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
    width: usize,
}

impl SequenceRepository {
    /// Creates a sequencer with the default number width.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            width: DEFAULT_NUMBER_WIDTH,
        }
    }

    /// Overrides the zero-padding width of the counter segment.
    #[must_use]
    pub const fn with_number_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Loads a document type's numbering configuration.
    ///
    /// # Errors
    ///
    /// Returns `DocumentTypeNotFound` for unknown codes.
    pub async fn document_type<C: ConnectionTrait>(
        conn: &C,
        code: &str,
    ) -> Result<document_types::Model, SequenceError> {
        document_types::Entity::find_by_id(code.trim().to_string())
            .one(conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| SequenceError::DocumentTypeNotFound(code.to_string()))
    }

    /// Creates a DRAFT document. No number is drawn.
    ///
    /// # Errors
    ///
    /// Returns `DocumentTypeNotFound`, `CompanyNotFound`, or a missing-scope
    /// error when the type needs a year or branch that was not given.
    #[tracing::instrument(skip(self))]
    pub async fn create_draft(
        &self,
        company_id: CompanyId,
        document_type: &str,
        financial_year: Option<i32>,
        branch: Option<&str>,
    ) -> Result<documents::Model, SequenceError> {
        Self::create_draft_in_tx(
            &self.db,
            company_id.into_inner(),
            document_type,
            financial_year,
            branch,
        )
        .await
    }

    /// Creates a DRAFT document on the given connection.
    ///
    /// # Errors
    ///
    /// See [`SequenceRepository::create_draft`].
    pub async fn create_draft_in_tx<C: ConnectionTrait>(
        conn: &C,
        company_id: Uuid,
        document_type: &str,
        financial_year: Option<i32>,
        branch: Option<&str>,
    ) -> Result<documents::Model, SequenceError> {
        let doc_type = Self::document_type(conn, document_type).await?;
        let scope = SequenceService::resolve_scope(&type_config(&doc_type), financial_year, branch)?;

        if companies::Entity::find_by_id(company_id)
            .one(conn)
            .await
            .map_err(db_err)?
            .is_none()
        {
            return Err(SequenceError::CompanyNotFound(company_id.to_string()));
        }

        let document = documents::ActiveModel {
            id: Set(DocumentId::new().into_inner()),
            company_id: Set(company_id),
            document_type: Set(doc_type.code),
            status: Set(DocumentStatus::Draft),
            financial_year: Set(scope.has_year().then_some(scope.financial_year)),
            branch: Set(scope.has_branch().then(|| scope.branch.clone())),
            number: Set(None),
            posted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        document.insert(conn).await.map_err(db_err)
    }

    /// Posts a DRAFT document in its own transaction, assigning its number.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for missing or foreign documents and
    /// `NotDraft` for documents already posted or cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn post(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
    ) -> Result<documents::Model, SequenceError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let posted = self
            .post_in_tx(&txn, company_id.into_inner(), document_id.into_inner())
            .await?;
        txn.commit().await.map_err(db_err)?;
        Ok(posted)
    }

    /// Posts a DRAFT document inside the caller's transaction.
    ///
    /// Locks the document row, draws the next counter value for its scope and
    /// writes POSTED, number and timestamp. Never commits or rolls back.
    ///
    /// # Errors
    ///
    /// See [`SequenceRepository::post`].
    pub async fn post_in_tx(
        &self,
        txn: &DatabaseTransaction,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<documents::Model, SequenceError> {
        let document = Self::lock_document(txn, company_id, document_id).await?;
        SequenceService::ensure_draft(document.id, document.status.into())?;

        let doc_type = Self::document_type(txn, &document.document_type).await?;
        let scope = SequenceService::resolve_scope(
            &type_config(&doc_type),
            document.financial_year,
            document.branch.as_deref(),
        )?;

        let counter = Self::next_value(txn, company_id, &doc_type.code, &scope).await?;
        let number = SequenceService::format_number(&doc_type.code, &scope, counter, self.width);

        let mut active: documents::ActiveModel = document.into();
        active.status = Set(DocumentStatus::Posted);
        active.number = Set(Some(number.clone()));
        active.posted_at = Set(Some(Utc::now().into()));
        let posted = active.update(txn).await.map_err(db_err)?;

        tracing::info!(%company_id, %document_id, %number, "Document posted");
        Ok(posted)
    }

    /// Creates and immediately posts a document inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`SequenceRepository::create_draft`] and [`SequenceRepository::post`].
    pub async fn assign_in_tx(
        &self,
        txn: &DatabaseTransaction,
        company_id: Uuid,
        document_type: &str,
        financial_year: Option<i32>,
        branch: Option<&str>,
    ) -> Result<documents::Model, SequenceError> {
        let draft =
            Self::create_draft_in_tx(txn, company_id, document_type, financial_year, branch).await?;
        self.post_in_tx(txn, company_id, draft.id).await
    }

    /// Cancels a DRAFT document. Posted documents keep their number forever.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` or `NotDraft`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
    ) -> Result<documents::Model, SequenceError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let document =
            Self::lock_document(&txn, company_id.into_inner(), document_id.into_inner()).await?;
        SequenceService::ensure_draft(document.id, document.status.into())?;

        let mut active: documents::ActiveModel = document.into();
        active.status = Set(DocumentStatus::Cancelled);
        let cancelled = active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(%company_id, %document_id, "Document cancelled");
        Ok(cancelled)
    }

    /// Fetches a document owned by the company.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for missing or foreign documents.
    pub async fn get_document(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
    ) -> Result<documents::Model, SequenceError> {
        let id = document_id.into_inner();
        documents::Entity::find_by_id(id)
            .filter(documents::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(SequenceError::DocumentNotFound(id))
    }

    async fn lock_document(
        txn: &DatabaseTransaction,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<documents::Model, SequenceError> {
        documents::Entity::find_by_id(document_id)
            .filter(documents::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(SequenceError::DocumentNotFound(document_id))
    }

    async fn next_value(
        txn: &DatabaseTransaction,
        company_id: Uuid,
        document_type: &str,
        scope: &SequenceScope,
    ) -> Result<i64, SequenceError> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_VALUE_SQL,
            [
                company_id.into(),
                document_type.into(),
                scope.financial_year.into(),
                scope.branch.clone().into(),
            ],
        );

        let row = txn
            .query_one(statement)
            .await
            .map_err(db_err)?
            .ok_or_else(|| SequenceError::Database("counter upsert returned no row".into()))?;
        row.try_get::<i64>("", "last_value").map_err(db_err)
    }
}
