//! Bonded dispute resolution.
//!
//! A party disputing a job attaches exactly the configured appeal bond. The
//! resolver asks the validator-selection service for a jury, escrows the bond
//! on the settlement ledger and waits for the resolution authority, which
//! decides whether the employer or the appellant receives the bond.

pub mod error;
pub mod resolver;
pub mod types;

pub use error::{DisputeError, Result};
pub use resolver::{DisputeDeps, DisputeResolver};
pub use types::{DisputeConfig, DisputeRecord, DisputeSettings, DisputeStats};
