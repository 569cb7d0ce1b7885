//! In-memory collaborators.
//!
//! Stand-ins for the job ledger, reputation engine, validator registry and
//! settlement asset. They back the `aice` simulation commands and the test
//! suites; production wiring supplies its own implementations of the
//! capability traits.

use crate::{
    CollaboratorError, CollaboratorResult, EmployerLookup, PenaltySink, SettlementLedger,
    ValidatorSelector,
};
use aice_types::{Address, Amount, JobId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Balance book for the settlement asset
#[derive(Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<Address, Amount>>,
    frozen: RwLock<HashSet<Address>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn credit(&self, account: Address, amount: Amount) -> CollaboratorResult<()> {
        let mut balances = self.balances.write().await;
        let current = balances.get(&account).copied().unwrap_or_default();
        let updated = current.checked_add(amount).ok_or_else(|| {
            CollaboratorError::TransferRejected(format!("balance overflow for {}", account))
        })?;
        balances.insert(account, updated);

        info!(
            account = %account.short(),
            amount = amount.to_base_units(),
            balance_after = updated.to_base_units(),
            "💰 Ledger credited"
        );
        Ok(())
    }

    /// Refuse every transfer into `account` until thawed
    pub async fn freeze(&self, account: Address) {
        self.frozen.write().await.insert(account);
    }

    pub async fn thaw(&self, account: Address) {
        self.frozen.write().await.remove(&account);
    }
}

#[async_trait]
impl SettlementLedger for InMemoryLedger {
    async fn balance_of(&self, account: Address) -> CollaboratorResult<Amount> {
        Ok(self
            .balances
            .read()
            .await
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn transfer(&self, from: Address, to: Address, amount: Amount) -> CollaboratorResult<()> {
        if self.frozen.read().await.contains(&to) {
            return Err(CollaboratorError::TransferRejected(format!(
                "recipient {} is frozen",
                to
            )));
        }

        let mut balances = self.balances.write().await;
        let available = balances.get(&from).copied().unwrap_or_default();
        let remaining = available
            .checked_sub(amount)
            .ok_or(CollaboratorError::InsufficientFunds {
                account: from,
                needed: amount,
                available,
            })?;
        let credited = balances
            .get(&to)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or_else(|| {
                CollaboratorError::TransferRejected(format!("balance overflow for {}", to))
            })?;

        balances.insert(from, remaining);
        balances.insert(to, credited);

        debug!(
            from = %from.short(),
            to = %to.short(),
            amount = amount.to_base_units(),
            "Ledger transfer applied"
        );
        Ok(())
    }
}

/// Reputation scores with a log of every penalty applied
#[derive(Default)]
pub struct ReputationBook {
    scores: RwLock<HashMap<Address, u64>>,
    penalties: RwLock<Vec<(Address, Amount)>>,
    offline: RwLock<bool>,
}

impl ReputationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_score(&self, account: Address, score: u64) {
        self.scores.write().await.insert(account, score);
    }

    pub async fn score(&self, account: &Address) -> u64 {
        self.scores.read().await.get(account).copied().unwrap_or(0)
    }

    pub async fn penalties(&self) -> Vec<(Address, Amount)> {
        self.penalties.read().await.clone()
    }

    /// Make every subsequent `subtract` fail with `Unavailable`
    pub async fn set_offline(&self, offline: bool) {
        *self.offline.write().await = offline;
    }
}

#[async_trait]
impl PenaltySink for ReputationBook {
    async fn subtract(&self, agent: Address, amount: Amount) -> CollaboratorResult<()> {
        if *self.offline.read().await {
            return Err(CollaboratorError::Unavailable(
                "reputation engine offline".to_string(),
            ));
        }

        let mut scores = self.scores.write().await;
        let score = scores.entry(agent).or_insert(0);
        *score = score.saturating_sub(amount.to_base_units());
        self.penalties.write().await.push((agent, amount));

        info!(
            agent = %agent.short(),
            amount = amount.to_base_units(),
            score_after = *score,
            "⚖️ Reputation reduced"
        );
        Ok(())
    }
}

/// Employer registry for jobs
#[derive(Default)]
pub struct JobRegistry {
    employers: RwLock<HashMap<JobId, Address>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, job_id: JobId, employer: Address) {
        self.employers.write().await.insert(job_id, employer);
    }
}

#[async_trait]
impl EmployerLookup for JobRegistry {
    async fn employer_of(&self, job_id: JobId) -> CollaboratorResult<Address> {
        self.employers
            .read()
            .await
            .get(&job_id)
            .copied()
            .ok_or(CollaboratorError::UnknownJob(job_id))
    }
}

/// Fixed validator set that hands out a rotating jury per job
pub struct ValidatorPool {
    validators: RwLock<Vec<Address>>,
    jury_size: usize,
}

impl ValidatorPool {
    pub fn new(validators: Vec<Address>, jury_size: usize) -> Self {
        Self {
            validators: RwLock::new(validators),
            jury_size,
        }
    }

    pub async fn add(&self, validator: Address) {
        let mut validators = self.validators.write().await;
        if !validators.contains(&validator) {
            validators.push(validator);
        }
    }

    pub async fn len(&self) -> usize {
        self.validators.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.validators.read().await.is_empty()
    }
}

#[async_trait]
impl ValidatorSelector for ValidatorPool {
    async fn select_validators(&self, job_id: JobId) -> CollaboratorResult<Vec<Address>> {
        let validators = self.validators.read().await;
        if validators.is_empty() {
            return Ok(Vec::new());
        }

        let start = (job_id.value() % validators.len() as u64) as usize;
        let take = self.jury_size.min(validators.len());
        Ok(validators
            .iter()
            .cycle()
            .skip(start)
            .take(take)
            .copied()
            .collect())
    }
}
