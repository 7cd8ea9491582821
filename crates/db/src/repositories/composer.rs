//! Workflow composition: one domain transition and its ledger posting in a
//! single database transaction.
//!
//! Every transition follows the same steps:
//!
//! 1. begin
//! 2. lock the header row (company and id in one query)
//! 3. check the current status against the legal predecessor
//! 4. write domain state (stock, receipts, movements)
//! 5. build the ledger proposal, if the transition has a monetary effect
//! 6. `commit_in_tx` the proposal
//! 7. write the new status and its timestamp
//! 8. commit once
//!
//! Any error drops the transaction, which rolls everything back.

use async_trait::async_trait;
use corebook_core::ledger::Proposal;
use corebook_core::workflow::{Decision, WorkflowError};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use uuid::Uuid;

use crate::repositories::ledger::LedgerRepository;

pub(crate) fn db_err(e: DbErr) -> WorkflowError {
    WorkflowError::Database(e.to_string())
}

/// What `apply` hands on: state for `finish` and the posting, if any.
#[derive(Debug)]
pub struct Staged<S> {
    /// Carried to `finish`.
    pub state: S,
    /// Posted through the ledger before `finish` runs.
    pub proposal: Option<Proposal>,
}

impl<S> Staged<S> {
    /// Stages state and an optional posting.
    pub const fn new(state: S, proposal: Option<Proposal>) -> Self {
        Self { state, proposal }
    }
}

/// One state transition of a workflow document.
#[async_trait]
pub trait Transition: Send + Sync {
    /// Locked header row.
    type Header: Send + Sync;
    /// State passed from `apply` to `finish`.
    type State: Send;
    /// What the caller gets back.
    type Output: Send;

    /// Locks the header `FOR UPDATE`, scoped to the caller's company.
    ///
    /// A missing header and one owned by another company must both yield
    /// the same `NotFound`.
    async fn lock(&self, txn: &DatabaseTransaction) -> Result<Self::Header, WorkflowError>;

    /// Checks the header's current status.
    fn check(&self, header: &Self::Header) -> Result<Decision, WorkflowError>;

    /// Writes domain state and stages the posting, if any.
    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        header: &Self::Header,
    ) -> Result<Staged<Self::State>, WorkflowError>;

    /// Writes the new status once the posting (if any) is in.
    async fn finish(
        &self,
        txn: &DatabaseTransaction,
        header: Self::Header,
        state: Self::State,
        entry_id: Option<Uuid>,
    ) -> Result<Self::Output, WorkflowError>;

    /// Output for a transition that already happened and is a defined no-op.
    fn unchanged(&self, header: Self::Header) -> Result<Self::Output, WorkflowError>;
}

/// Runs a transition end to end in one transaction.
///
/// # Errors
///
/// Whatever a step returns; the transaction is rolled back on every error.
pub async fn run_transition<T: Transition>(
    db: &DatabaseConnection,
    ledger: &LedgerRepository,
    transition: &T,
) -> Result<T::Output, WorkflowError> {
    let txn = db.begin().await.map_err(db_err)?;

    let header = transition.lock(&txn).await?;
    if transition.check(&header)? == Decision::AlreadyApplied {
        txn.commit().await.map_err(db_err)?;
        return transition.unchanged(header);
    }

    let staged = transition.apply(&txn, &header).await?;
    let entry_id = match staged.proposal {
        Some(proposal) => Some(ledger.commit_in_tx(&txn, proposal).await?),
        None => None,
    };

    let output = transition.finish(&txn, header, staged.state, entry_id).await?;
    txn.commit().await.map_err(db_err)?;
    Ok(output)
}
