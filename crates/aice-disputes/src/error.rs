use aice_common::CollaboratorError;
use aice_types::{Address, Amount, JobId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisputeError {
    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Address },

    #[error("Incorrect bond amount: expected {expected}, provided {provided}")]
    IncorrectBondAmount { expected: Amount, provided: Amount },

    #[error("Dispute already open for {0}")]
    DisputeAlreadyOpen(JobId),

    #[error("Jury too small: required {required}, selected {actual}")]
    JuryTooSmall { required: usize, actual: usize },

    #[error("Caller {caller} is not the resolution authority")]
    ResolutionUnauthorized { caller: Address },

    #[error("No outstanding bond for {0}")]
    NoOutstandingBond(JobId),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

pub type Result<T> = std::result::Result<T, DisputeError>;
