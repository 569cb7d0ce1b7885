use aice_types::{Address, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open dispute for one job. Removed when resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub appellant: Address,
    /// Amount held in escrow
    pub bond: Amount,
    /// Validators selected to adjudicate
    pub jury: Vec<Address>,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeConfig {
    /// Exact payment required to raise a dispute
    pub appeal_bond: Amount,
    pub min_jury_size: usize,
    /// Only address allowed to resolve disputes
    pub resolution_authority: Address,
    /// Account holding escrowed bonds on the settlement ledger
    pub escrow_account: Address,
}

impl Default for DisputeConfig {
    fn default() -> Self {
        Self {
            appeal_bond: Amount::from_base_units(100),
            min_jury_size: 3,
            resolution_authority: Address::ZERO,
            escrow_account: Address::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeSettings {
    pub authority: Address,
    pub appeal_bond: Amount,
    pub min_jury_size: usize,
    pub resolution_authority: Address,
    pub escrow_account: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeStats {
    pub raised: u64,
    pub resolved_for_employer: u64,
    pub resolved_for_appellant: u64,
    pub outstanding: u64,
    /// Sum of bonds currently held in escrow
    pub escrowed: Amount,
}
