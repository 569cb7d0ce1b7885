use aice_common::CollaboratorError;
use aice_types::{Address, JobId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Address },

    #[error("Audit scheduler is paused")]
    Paused,

    #[error("Invalid probability: {0} bps exceeds 10000")]
    InvalidProbability(u16),

    #[error("Audit not scheduled for {0}")]
    AuditNotScheduled(JobId),

    #[error("Audit already completed for {0}")]
    AuditAlreadyCompleted(JobId),

    #[error("Audit already scheduled for {0}")]
    AuditAlreadyScheduled(JobId),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

pub type Result<T> = std::result::Result<T, AuditError>;
