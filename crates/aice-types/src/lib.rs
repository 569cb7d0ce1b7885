//! Shared primitive types for AICE: account addresses, settlement amounts,
//! job identifiers and roles.

pub mod address;
pub mod amount;
pub mod error;
pub mod job;

pub use address::Address;
pub use amount::Amount;
pub use error::{Result, TypeError};
pub use job::{Hash, JobId, Role};
