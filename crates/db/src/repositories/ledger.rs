//! Ledger repository: idempotent commit, reversal, balances and statements.
//!
//! Journal rows are append-only. A commit either writes the entry and every
//! line or nothing; a reversal is a new entry pointing back at the original.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use corebook_core::ledger::{
    AccountBalance, AccountStatement, LedgerError, LedgerService, PostedLine, Proposal,
    ReversalService, StatementRow, ValidatedProposal, build_statement,
};
use corebook_core::sequence::SequenceError;
use corebook_shared::types::{CompanyId, DocumentId, JournalEntryId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{accounts, companies, documents, journal_entries, journal_lines};
use crate::repositories::account::AccountRepository;
use crate::repositories::sequence::SequenceRepository;

fn db_err(e: DbErr) -> LedgerError {
    LedgerError::Database(e.to_string())
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// A journal entry with its lines in line order.
#[derive(Debug, Clone)]
pub struct EntryWithLines {
    /// Entry header.
    pub entry: journal_entries::Model,
    /// Lines ordered by line number.
    pub lines: Vec<journal_lines::Model>,
}

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    sequencer: SequenceRepository,
}

impl LedgerRepository {
    /// Creates a ledger repository with a default-width sequencer.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let sequencer = SequenceRepository::new(db.clone());
        Self { db, sequencer }
    }

    /// Uses the given sequencer for auto-numbered document types.
    #[must_use]
    pub fn with_sequencer(mut self, sequencer: SequenceRepository) -> Self {
        self.sequencer = sequencer;
        self
    }

    /// The sequencer that numbers this ledger's documents.
    #[must_use]
    pub const fn sequencer(&self) -> &SequenceRepository {
        &self.sequencer
    }

    /// Normalizes and structurally validates a proposal without touching the
    /// database. No idempotency check.
    ///
    /// # Errors
    ///
    /// Returns the first structural error found.
    pub fn validate(proposal: &Proposal) -> Result<ValidatedProposal, LedgerError> {
        LedgerService::prepare(proposal.clone())
    }

    /// Commits a proposal in its own transaction and returns the entry id.
    ///
    /// # Errors
    ///
    /// Structural errors, `CompanyNotFound`, `AccountNotFound`,
    /// `DocumentTypeNotFound`, or `DuplicateProposal` when the company
    /// already holds the idempotency key. Nothing is written on error.
    #[tracing::instrument(skip(self, proposal), fields(company = %proposal.company_code, key = %proposal.idempotency_key))]
    pub async fn commit(&self, proposal: Proposal) -> Result<Uuid, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let entry_id = self.commit_in_tx(&txn, proposal).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(entry_id)
    }

    /// Commits a proposal inside the caller's transaction.
    ///
    /// Never commits or rolls back; on error the caller drops the transaction.
    ///
    /// # Errors
    ///
    /// See [`LedgerRepository::commit`].
    pub async fn commit_in_tx(
        &self,
        txn: &DatabaseTransaction,
        proposal: Proposal,
    ) -> Result<Uuid, LedgerError> {
        let validated = LedgerService::prepare(proposal)?;

        let company = companies::Entity::find()
            .filter(companies::Column::Code.eq(&validated.company_code))
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::CompanyNotFound(validated.company_code.clone()))?;

        let doc_type = SequenceRepository::document_type(txn, &validated.document_type)
            .await
            .map_err(|e| match e {
                SequenceError::DocumentTypeNotFound(code) => LedgerError::DocumentTypeNotFound(code),
                other => LedgerError::Database(other.to_string()),
            })?;

        let existing = journal_entries::Entity::find()
            .filter(journal_entries::Column::CompanyId.eq(company.id))
            .filter(journal_entries::Column::IdempotencyKey.eq(&validated.idempotency_key))
            .one(txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            tracing::warn!(key = %validated.idempotency_key, "Duplicate proposal rejected");
            return Err(LedgerError::DuplicateProposal(validated.idempotency_key));
        }

        let accounts = AccountRepository::resolve_codes_in_tx(
            txn,
            company.id,
            validated.lines.iter().map(|l| l.account_code.clone()),
        )
        .await?;

        let document_id = match validated.document_id {
            Some(id) => {
                let owned = documents::Entity::find_by_id(id)
                    .filter(documents::Column::CompanyId.eq(company.id))
                    .one(txn)
                    .await
                    .map_err(db_err)?;
                if owned.is_none() {
                    return Err(LedgerError::Numbering(format!("Document not found: {id}")));
                }
                Some(id)
            }
            None if doc_type.auto_number => {
                let document = self
                    .sequencer
                    .assign_in_tx(
                        txn,
                        company.id,
                        &doc_type.code,
                        Some(validated.posting_date.year()),
                        None,
                    )
                    .await
                    .map_err(|e| LedgerError::Numbering(e.to_string()))?;
                Some(document.id)
            }
            None => None,
        };

        let entry_id = JournalEntryId::new().into_inner();
        let entry = journal_entries::ActiveModel {
            id: Set(entry_id),
            company_id: Set(company.id),
            idempotency_key: Set(validated.idempotency_key.clone()),
            document_type: Set(doc_type.code.clone()),
            currency: Set(validated.currency.clone()),
            exchange_rate: Set(validated.exchange_rate),
            posting_date: Set(validated.posting_date),
            document_date: Set(validated.document_date),
            narration: Set(validated.narration.clone()),
            document_id: Set(document_id),
            reverses_entry_id: Set(None),
            created_at: Set(Utc::now().into()),
        };
        if let Err(e) = entry.insert(txn).await {
            if is_unique_violation(&e) {
                tracing::warn!(key = %validated.idempotency_key, "Duplicate proposal rejected");
                return Err(LedgerError::DuplicateProposal(validated.idempotency_key));
            }
            return Err(db_err(e));
        }

        let lines = validated.lines.iter().map(|line| journal_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            entry_id: Set(entry_id),
            company_id: Set(company.id),
            account_id: Set(accounts[&line.account_code]),
            line_no: Set(line.line_no),
            amount: Set(line.amount),
            exchange_rate: Set(validated.exchange_rate),
            base_debit: Set(line.base_debit),
            base_credit: Set(line.base_credit),
        });
        journal_lines::Entity::insert_many(lines)
            .exec(txn)
            .await
            .map_err(db_err)?;

        tracing::info!(
            %entry_id,
            company = %validated.company_code,
            document_type = %doc_type.code,
            total = %validated.totals.debit,
            "Journal entry committed"
        );
        Ok(entry_id)
    }

    /// Reverses a posted entry with a mirrored entry dated today.
    ///
    /// # Errors
    ///
    /// `ReversalReasonRequired` for a blank reason, `EntryNotFound` for
    /// missing or foreign entries, `AlreadyReversed` if a reversal exists.
    #[tracing::instrument(skip(self))]
    pub async fn reverse(
        &self,
        company_id: CompanyId,
        entry_id: JournalEntryId,
        reason: &str,
    ) -> Result<Uuid, LedgerError> {
        let original_id = entry_id.into_inner();
        let narration = ReversalService::narration(original_id, reason)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let original = journal_entries::Entity::find_by_id(original_id)
            .filter(journal_entries::Column::CompanyId.eq(company_id.into_inner()))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::EntryNotFound(original_id))?;

        let already = journal_entries::Entity::find()
            .filter(journal_entries::Column::ReversesEntryId.eq(original_id))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if already.is_some() {
            return Err(LedgerError::AlreadyReversed(original_id));
        }

        let posted: Vec<PostedLine> = journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(original_id))
            .order_by_asc(journal_lines::Column::LineNo)
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|l| PostedLine {
                account_id: l.account_id,
                line_no: l.line_no,
                amount: l.amount,
                exchange_rate: l.exchange_rate,
                base_debit: l.base_debit,
                base_credit: l.base_credit,
            })
            .collect();
        let mirrored = ReversalService::mirror_lines(&posted);

        let reversal_id = JournalEntryId::new().into_inner();
        let reversal = journal_entries::ActiveModel {
            id: Set(reversal_id),
            company_id: Set(original.company_id),
            idempotency_key: Set(ReversalService::reversal_key(original_id)),
            document_type: Set(original.document_type.clone()),
            currency: Set(original.currency.clone()),
            exchange_rate: Set(original.exchange_rate),
            posting_date: Set(Utc::now().date_naive()),
            document_date: Set(original.document_date),
            narration: Set(narration),
            document_id: Set(None),
            reverses_entry_id: Set(Some(original_id)),
            created_at: Set(Utc::now().into()),
        };
        if let Err(e) = reversal.insert(&txn).await {
            if is_unique_violation(&e) {
                return Err(LedgerError::AlreadyReversed(original_id));
            }
            return Err(db_err(e));
        }

        let lines = mirrored.iter().map(|line| journal_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            entry_id: Set(reversal_id),
            company_id: Set(original.company_id),
            account_id: Set(line.account_id),
            line_no: Set(line.line_no),
            amount: Set(line.amount),
            exchange_rate: Set(line.exchange_rate),
            base_debit: Set(line.base_debit),
            base_credit: Set(line.base_credit),
        });
        journal_lines::Entity::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(%original_id, %reversal_id, "Journal entry reversed");
        Ok(reversal_id)
    }

    /// Fetches one entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` for missing or foreign entries.
    pub async fn get_entry(
        &self,
        company_id: CompanyId,
        entry_id: JournalEntryId,
    ) -> Result<EntryWithLines, LedgerError> {
        let id = entry_id.into_inner();
        let entry = journal_entries::Entity::find_by_id(id)
            .filter(journal_entries::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::EntryNotFound(id))?;
        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(id))
            .order_by_asc(journal_lines::Column::LineNo)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(EntryWithLines { entry, lines })
    }

    /// Finds the entry committed under an idempotency key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_key(
        &self,
        company_id: CompanyId,
        idempotency_key: &str,
    ) -> Result<Option<journal_entries::Model>, LedgerError> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::CompanyId.eq(company_id.into_inner()))
            .filter(journal_entries::Column::IdempotencyKey.eq(idempotency_key))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Entries linked to a numbered document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn entries_for_document(
        &self,
        company_id: CompanyId,
        document_id: DocumentId,
    ) -> Result<Vec<journal_entries::Model>, LedgerError> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::CompanyId.eq(company_id.into_inner()))
            .filter(journal_entries::Column::DocumentId.eq(document_id.into_inner()))
            .order_by_asc(journal_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Per-account debit, credit and balance totals for the company.
    ///
    /// Accounts without lines are included with zero totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[tracing::instrument(skip(self))]
    pub async fn get_balances(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<AccountBalance>, LedgerError> {
        let company_id = company_id.into_inner();
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company_id))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let amounts: Vec<(Uuid, Decimal, Decimal)> = journal_lines::Entity::find()
            .filter(journal_lines::Column::CompanyId.eq(company_id))
            .select_only()
            .column(journal_lines::Column::AccountId)
            .column(journal_lines::Column::BaseDebit)
            .column(journal_lines::Column::BaseCredit)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut totals: BTreeMap<Uuid, (Decimal, Decimal)> = BTreeMap::new();
        for (account_id, debit, credit) in amounts {
            let entry = totals.entry(account_id).or_default();
            entry.0 += debit;
            entry.1 += credit;
        }

        Ok(accounts
            .into_iter()
            .map(|a| {
                let (debit, credit) = totals.get(&a.id).copied().unwrap_or_default();
                AccountBalance::new(a.id, a.code, a.name, debit, credit)
            })
            .collect())
    }

    /// Account statement over `[from, to]` with running balances.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the code does not exist in the company.
    #[tracing::instrument(skip(self))]
    pub async fn get_account_statement(
        &self,
        company_id: CompanyId,
        account_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AccountStatement, LedgerError> {
        let company_id = company_id.into_inner();
        let account = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company_id))
            .filter(accounts::Column::Code.eq(account_code.trim()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::AccountNotFound(account_code.to_string()))?;

        let before: Vec<(journal_lines::Model, Option<journal_entries::Model>)> =
            journal_lines::Entity::find()
                .find_also_related(journal_entries::Entity)
                .filter(journal_lines::Column::AccountId.eq(account.id))
                .filter(journal_entries::Column::PostingDate.lt(from))
                .all(&self.db)
                .await
                .map_err(db_err)?;
        let opening: Decimal = before
            .iter()
            .map(|(line, _)| line.base_debit - line.base_credit)
            .sum();

        let rows: Vec<StatementRow> = journal_lines::Entity::find()
            .find_also_related(journal_entries::Entity)
            .filter(journal_lines::Column::AccountId.eq(account.id))
            .filter(journal_entries::Column::PostingDate.gte(from))
            .filter(journal_entries::Column::PostingDate.lte(to))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .filter_map(|(line, entry)| {
                entry.map(|entry| StatementRow {
                    entry_id: entry.id,
                    posting_date: entry.posting_date,
                    line_no: line.line_no,
                    narration: entry.narration,
                    debit: line.base_debit,
                    credit: line.base_credit,
                })
            })
            .collect();

        Ok(build_statement(account.code, from, to, opening, rows))
    }
}
