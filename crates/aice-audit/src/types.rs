use crate::randomness::Seed;
use aice_types::{Address, Amount, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit of one job. Permanent history: never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub agent: Address,
    pub result_hash: Hash,
    pub seed: Seed,
    /// Unix seconds at scheduling time
    pub scheduled_at: i64,
    pub completed: bool,
    pub passed: bool,
}

/// What happens when a job that already has an audit record is selected again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReschedulePolicy {
    /// Overwrite the existing record, losing its commitment
    #[default]
    LastWriteWins,
    /// Refuse the finalization with `AuditAlreadyScheduled`
    RejectExisting,
}

impl ReschedulePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReschedulePolicy::LastWriteWins => "last_write_wins",
            ReschedulePolicy::RejectExisting => "reject_existing",
        }
    }
}

impl fmt::Display for ReschedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Trusted completion notifier (the job ledger)
    pub notifier: Address,
    /// Selection probability in basis points
    pub probability_bps: u16,
    /// Reputation subtracted when an audit fails; zero disables penalties
    pub penalty_amount: Amount,
    pub auditors: Vec<Address>,
    #[serde(default)]
    pub reschedule_policy: ReschedulePolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            notifier: Address::ZERO,
            probability_bps: 500, // 5%
            penalty_amount: Amount::ZERO,
            auditors: Vec::new(),
            reschedule_policy: ReschedulePolicy::default(),
        }
    }
}

/// Current administrative configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSettings {
    pub authority: Address,
    pub notifier: Address,
    pub probability_bps: u16,
    pub penalty_amount: Amount,
    pub penalty_sink_configured: bool,
    pub reschedule_policy: ReschedulePolicy,
    pub paused: bool,
    pub auditors: Vec<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub evaluated: u64,
    pub scheduled: u64,
    pub replaced: u64,
    pub completed: u64,
    pub passed: u64,
    pub failed: u64,
    pub penalties_applied: u64,
    pub pending: u64,
}
