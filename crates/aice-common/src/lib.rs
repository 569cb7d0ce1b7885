//! Shared plumbing for the AICE subsystems.
//!
//! - **capabilities**: narrow async interfaces to external collaborators
//!   (penalty sink, validator selection, employer lookup, settlement ledger)
//! - **events**: append-only, sequence-numbered event log with broadcast
//! - **memory**: in-memory collaborator implementations for simulation and tests
//! - **authority**: the single controlling authority each module carries

pub mod authority;
pub mod capabilities;
pub mod error;
pub mod events;
pub mod memory;

pub use authority::Authority;
pub use capabilities::{EmployerLookup, PenaltySink, SettlementLedger, ValidatorSelector};
pub use error::{CollaboratorError, CollaboratorResult};
pub use events::{EventLog, EventRecord, IntegrityEvent, Module};
pub use memory::{InMemoryLedger, JobRegistry, ReputationBook, ValidatorPool};
