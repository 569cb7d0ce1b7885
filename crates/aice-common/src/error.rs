use aice_types::{Address, Amount, JobId};
use thiserror::Error;

/// Failure reported by an external collaborator during a synchronous call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Insufficient funds in {account}: needed {needed}, available {available}")]
    InsufficientFunds {
        account: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    #[error("Transfer rejected: {0}")]
    TransferRejected(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;
