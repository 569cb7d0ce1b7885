//! Narrow interfaces to the collaborators this core calls out to.
//!
//! Each module receives these as `Arc<dyn ...>` at composition time. Calls are
//! made while the calling module holds its state lock, so implementations must
//! not call back into that module.

use crate::CollaboratorResult;
use aice_types::{Address, Amount, JobId};
use async_trait::async_trait;

/// Reputation engine hook invoked when an audit fails
#[async_trait]
pub trait PenaltySink: Send + Sync {
    async fn subtract(&self, agent: Address, amount: Amount) -> CollaboratorResult<()>;
}

/// Validator-selection service that forms a jury for a disputed job
#[async_trait]
pub trait ValidatorSelector: Send + Sync {
    async fn select_validators(&self, job_id: JobId) -> CollaboratorResult<Vec<Address>>;
}

/// Job-ledger lookup for the employer of a job
#[async_trait]
pub trait EmployerLookup: Send + Sync {
    async fn employer_of(&self, job_id: JobId) -> CollaboratorResult<Address>;
}

/// The fungible settlement asset
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    async fn balance_of(&self, account: Address) -> CollaboratorResult<Amount>;

    /// Move `amount` from `from` to `to`. Must be all-or-nothing.
    async fn transfer(&self, from: Address, to: Address, amount: Amount) -> CollaboratorResult<()>;
}
