use crate::types::{DisputeConfig, DisputeRecord, DisputeSettings, DisputeStats};
use crate::{DisputeError, Result};
use aice_common::{
    Authority, EmployerLookup, EventLog, IntegrityEvent, Module, SettlementLedger,
    ValidatorSelector,
};
use aice_types::{Address, Amount, JobId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Capabilities the resolver is wired with at composition time
pub struct DisputeDeps {
    pub validator_selector: Arc<dyn ValidatorSelector>,
    pub employer_lookup: Arc<dyn EmployerLookup>,
    pub ledger: Arc<dyn SettlementLedger>,
}

struct ResolverState {
    authority: Authority,
    appeal_bond: Amount,
    min_jury_size: usize,
    resolution_authority: Address,
    escrow_account: Address,
    validator_selector: Arc<dyn ValidatorSelector>,
    employer_lookup: Arc<dyn EmployerLookup>,
    disputes: HashMap<JobId, DisputeRecord>,
    raised: u64,
    resolved_for_employer: u64,
    resolved_for_appellant: u64,
}

impl ResolverState {
    fn ensure_authority(&self, caller: &Address) -> Result<()> {
        if !self.authority.is_held_by(caller) {
            warn!(caller = %caller.short(), "🚫 Dispute admin call rejected");
            return Err(DisputeError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    fn escrowed(&self) -> Amount {
        self.disputes.values().fold(Amount::ZERO, |total, record| {
            total
                .checked_add(record.bond)
                .unwrap_or(Amount::from_base_units(u64::MAX))
        })
    }
}

/// Accepts bonded appeals and pays the escrowed bond to the prevailing party.
pub struct DisputeResolver {
    state: Arc<RwLock<ResolverState>>,
    ledger: Arc<dyn SettlementLedger>,
    events: Arc<EventLog>,

    // Metrics
    pub disputes_raised_total: Option<Arc<prometheus::IntCounter>>,
    pub disputes_resolved_total: Option<Arc<prometheus::IntCounter>>,
    pub escrowed_bonds: Option<Arc<prometheus::IntGauge>>,
}

impl DisputeResolver {
    pub fn new(
        authority: Address,
        config: DisputeConfig,
        deps: DisputeDeps,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(ResolverState {
                authority: Authority::new(authority),
                appeal_bond: config.appeal_bond,
                min_jury_size: config.min_jury_size,
                resolution_authority: config.resolution_authority,
                escrow_account: config.escrow_account,
                validator_selector: deps.validator_selector,
                employer_lookup: deps.employer_lookup,
                disputes: HashMap::new(),
                raised: 0,
                resolved_for_employer: 0,
                resolved_for_appellant: 0,
            })),
            ledger: deps.ledger,
            events,
            disputes_raised_total: None,
            disputes_resolved_total: None,
            escrowed_bonds: None,
        }
    }

    /// Set metrics for dispute tracking
    pub fn set_metrics(
        &mut self,
        disputes_raised_total: Arc<prometheus::IntCounter>,
        disputes_resolved_total: Arc<prometheus::IntCounter>,
        escrowed_bonds: Arc<prometheus::IntGauge>,
    ) {
        self.disputes_raised_total = Some(disputes_raised_total);
        self.disputes_resolved_total = Some(disputes_resolved_total);
        self.escrowed_bonds = Some(escrowed_bonds);
    }

    fn observe_escrow(&self, escrowed: Amount) {
        if let Some(ref gauge) = self.escrowed_bonds {
            gauge.set(i64::try_from(escrowed.to_base_units()).unwrap_or(i64::MAX));
        }
    }

    /// Open a dispute for `job_id`, collecting `attached` from the caller
    /// into escrow once every check has passed.
    pub async fn raise_dispute(
        &self,
        caller: &Address,
        job_id: JobId,
        attached: Amount,
    ) -> Result<DisputeRecord> {
        let mut state = self.state.write().await;

        if attached != state.appeal_bond {
            warn!(
                job_id = %job_id,
                expected = state.appeal_bond.to_base_units(),
                provided = attached.to_base_units(),
                "❌ Dispute rejected: wrong bond"
            );
            return Err(DisputeError::IncorrectBondAmount {
                expected: state.appeal_bond,
                provided: attached,
            });
        }

        if state.disputes.contains_key(&job_id) {
            return Err(DisputeError::DisputeAlreadyOpen(job_id));
        }

        let selector = state.validator_selector.clone();
        let jury = selector.select_validators(job_id).await?;
        if jury.len() < state.min_jury_size {
            warn!(
                job_id = %job_id,
                required = state.min_jury_size,
                selected = jury.len(),
                "❌ Dispute rejected: jury too small"
            );
            return Err(DisputeError::JuryTooSmall {
                required: state.min_jury_size,
                actual: jury.len(),
            });
        }

        // Last step before commit: nothing has changed yet if this fails
        self.ledger
            .transfer(*caller, state.escrow_account, attached)
            .await?;

        let record = DisputeRecord {
            appellant: *caller,
            bond: attached,
            jury,
            raised_at: Utc::now(),
        };
        state.disputes.insert(job_id, record.clone());
        state.raised += 1;
        let escrowed = state.escrowed();

        self.events
            .emit(IntegrityEvent::DisputeRaised {
                job_id,
                appellant: *caller,
                bond: attached,
                jury_size: record.jury.len(),
            })
            .await;
        if let Some(ref counter) = self.disputes_raised_total {
            counter.inc();
        }
        self.observe_escrow(escrowed);

        info!(
            job_id = %job_id,
            appellant = %caller.short(),
            bond = attached.to_base_units(),
            jury_size = record.jury.len(),
            "⚖️ Dispute raised"
        );
        Ok(record)
    }

    /// Settle the dispute for `job_id`. Returns the address paid.
    pub async fn resolve(
        &self,
        caller: &Address,
        job_id: JobId,
        employer_wins: bool,
    ) -> Result<Address> {
        let mut state = self.state.write().await;

        if state.resolution_authority.is_null() || state.resolution_authority != *caller {
            warn!(
                caller = %caller.short(),
                job_id = %job_id,
                "🚫 Resolution from non-authority"
            );
            return Err(DisputeError::ResolutionUnauthorized { caller: *caller });
        }

        // The record stays in place until the payout returns, so a dropped
        // future leaves the dispute open and the bond claimable.
        let (appellant, bond) = state
            .disputes
            .get(&job_id)
            .map(|record| (record.appellant, record.bond))
            .ok_or(DisputeError::NoOutstandingBond(job_id))?;

        let recipient = if employer_wins {
            let lookup = state.employer_lookup.clone();
            match lookup.employer_of(job_id).await {
                Ok(employer) => employer,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "↩️ Employer lookup failed, dispute kept open");
                    return Err(e.into());
                }
            }
        } else {
            appellant
        };

        if let Err(e) = self
            .ledger
            .transfer(state.escrow_account, recipient, bond)
            .await
        {
            warn!(
                job_id = %job_id,
                recipient = %recipient.short(),
                error = %e,
                "↩️ Bond payout failed, dispute kept open"
            );
            return Err(e.into());
        }

        state.disputes.remove(&job_id);
        if employer_wins {
            state.resolved_for_employer += 1;
        } else {
            state.resolved_for_appellant += 1;
        }
        let escrowed = state.escrowed();

        self.events
            .emit(IntegrityEvent::DisputeResolved {
                job_id,
                employer_wins,
                recipient,
                bond,
            })
            .await;
        if let Some(ref counter) = self.disputes_resolved_total {
            counter.inc();
        }
        self.observe_escrow(escrowed);

        info!(
            job_id = %job_id,
            employer_wins,
            recipient = %recipient.short(),
            bond = bond.to_base_units(),
            "✅ Dispute resolved"
        );
        Ok(recipient)
    }

    pub async fn transfer_authority(&self, caller: &Address, new_authority: Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        let previous = state.authority.replace(new_authority);

        self.events
            .emit(IntegrityEvent::AuthorityTransferred {
                module: Module::Disputes,
                previous,
                new: new_authority,
            })
            .await;
        info!(
            previous = %previous.short(),
            new = %new_authority.short(),
            "🔑 Dispute authority transferred"
        );
        Ok(())
    }

    /// Takes effect for disputes raised afterwards; open bonds keep their amount.
    pub async fn set_appeal_bond(&self, caller: &Address, amount: Amount) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.appeal_bond = amount;

        self.events
            .emit(IntegrityEvent::AppealBondUpdated { amount })
            .await;
        info!(amount = amount.to_base_units(), "⚙️ Appeal bond updated");
        Ok(())
    }

    pub async fn set_min_jury_size(&self, caller: &Address, size: usize) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.min_jury_size = size;

        self.events
            .emit(IntegrityEvent::MinJurySizeUpdated { size })
            .await;
        info!(size, "⚙️ Minimum jury size updated");
        Ok(())
    }

    pub async fn set_resolution_authority(&self, caller: &Address, authority: Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.resolution_authority = authority;

        self.events
            .emit(IntegrityEvent::ResolutionAuthorityUpdated { authority })
            .await;
        info!(authority = %authority.short(), "⚙️ Resolution authority updated");
        Ok(())
    }

    pub async fn set_validator_selector(
        &self,
        caller: &Address,
        selector: Arc<dyn ValidatorSelector>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.validator_selector = selector;

        self.events
            .emit(IntegrityEvent::ValidatorSelectorUpdated)
            .await;
        info!("⚙️ Validator selector replaced");
        Ok(())
    }

    pub async fn set_employer_lookup(
        &self,
        caller: &Address,
        lookup: Arc<dyn EmployerLookup>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.employer_lookup = lookup;

        self.events.emit(IntegrityEvent::EmployerLookupUpdated).await;
        info!("⚙️ Employer lookup replaced");
        Ok(())
    }

    /// Escrowed bond for `job_id`, zero when no dispute is open
    pub async fn outstanding_bond(&self, job_id: JobId) -> Amount {
        let state = self.state.read().await;
        let bond = state
            .disputes
            .get(&job_id)
            .map(|record| record.bond)
            .unwrap_or(Amount::ZERO);
        debug!(job_id = %job_id, bond = bond.to_base_units(), "Outstanding bond queried");
        bond
    }

    pub async fn dispute(&self, job_id: JobId) -> Option<DisputeRecord> {
        self.state.read().await.disputes.get(&job_id).cloned()
    }

    pub async fn settings(&self) -> DisputeSettings {
        let state = self.state.read().await;
        DisputeSettings {
            authority: state.authority.holder(),
            appeal_bond: state.appeal_bond,
            min_jury_size: state.min_jury_size,
            resolution_authority: state.resolution_authority,
            escrow_account: state.escrow_account,
        }
    }

    pub async fn stats(&self) -> DisputeStats {
        let state = self.state.read().await;
        DisputeStats {
            raised: state.raised,
            resolved_for_employer: state.resolved_for_employer,
            resolved_for_appellant: state.resolved_for_appellant,
            outstanding: state.disputes.len() as u64,
            escrowed: state.escrowed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aice_common::{InMemoryLedger, JobRegistry, ValidatorPool};

    const ADMIN: Address = Address::from_bytes([0xA1; 32]);
    const JUDGE: Address = Address::from_bytes([0x1D; 32]);
    const ESCROW: Address = Address::from_bytes([0xE5; 32]);
    const EMPLOYER: Address = Address::from_bytes([0xE1; 32]);
    const APPELLANT: Address = Address::from_bytes([0xAB; 32]);

    fn validators(n: u8) -> Vec<Address> {
        (0..n).map(|i| Address::from_bytes([0x50 + i; 32])).collect()
    }

    struct Fixture {
        resolver: DisputeResolver,
        ledger: Arc<InMemoryLedger>,
        events: Arc<EventLog>,
    }

    async fn fixture(pool_size: u8) -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .credit(APPELLANT, Amount::from_base_units(50))
            .await
            .unwrap();
        let registry = Arc::new(JobRegistry::new());
        registry.register(JobId::new(1), EMPLOYER).await;

        let events = Arc::new(EventLog::new());
        let resolver = DisputeResolver::new(
            ADMIN,
            DisputeConfig {
                appeal_bond: Amount::from_base_units(5),
                min_jury_size: 3,
                resolution_authority: JUDGE,
                escrow_account: ESCROW,
            },
            DisputeDeps {
                validator_selector: Arc::new(ValidatorPool::new(validators(pool_size), 5)),
                employer_lookup: registry,
                ledger: ledger.clone(),
            },
            events.clone(),
        );
        Fixture {
            resolver,
            ledger,
            events,
        }
    }

    async fn balance(ledger: &InMemoryLedger, account: Address) -> u64 {
        ledger.balance_of(account).await.unwrap().to_base_units()
    }

    #[tokio::test]
    async fn test_raise_escrows_bond() {
        let f = fixture(5).await;

        let record = f
            .resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap();

        assert_eq!(record.appellant, APPELLANT);
        assert_eq!(record.jury.len(), 5);
        assert_eq!(balance(&f.ledger, APPELLANT).await, 45);
        assert_eq!(balance(&f.ledger, ESCROW).await, 5);
        assert_eq!(
            f.resolver.outstanding_bond(JobId::new(1)).await,
            Amount::from_base_units(5)
        );
        assert_eq!(f.events.len().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_bond_rejected_without_side_effects() {
        let f = fixture(5).await;

        for attached in [4, 6, 0] {
            let err = f
                .resolver
                .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(attached))
                .await
                .unwrap_err();
            assert!(matches!(err, DisputeError::IncorrectBondAmount { .. }));
        }

        assert!(f.resolver.dispute(JobId::new(1)).await.is_none());
        assert_eq!(balance(&f.ledger, APPELLANT).await, 50);
        assert!(f.events.is_empty().await);
    }

    #[tokio::test]
    async fn test_small_jury_keeps_funds_with_payer() {
        let f = fixture(2).await;

        let err = f
            .resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DisputeError::JuryTooSmall {
                required: 3,
                actual: 2
            }
        ));
        assert!(f.resolver.dispute(JobId::new(1)).await.is_none());
        assert_eq!(balance(&f.ledger, APPELLANT).await, 50);
        assert_eq!(balance(&f.ledger, ESCROW).await, 0);
    }

    #[tokio::test]
    async fn test_second_raise_rejected() {
        let f = fixture(5).await;
        f.resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap();

        let err = f
            .resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::DisputeAlreadyOpen(_)));
        assert_eq!(balance(&f.ledger, APPELLANT).await, 45);
    }

    #[tokio::test]
    async fn test_unfunded_appellant_cannot_raise() {
        let f = fixture(5).await;
        let broke = Address::from_bytes([0x99; 32]);

        let err = f
            .resolver
            .raise_dispute(&broke, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::Collaborator(_)));
        assert!(f.resolver.dispute(JobId::new(1)).await.is_none());
        assert_eq!(f.resolver.stats().await.raised, 0);
    }

    #[tokio::test]
    async fn test_resolve_pays_employer() {
        let f = fixture(5).await;
        f.resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap();

        let paid = f.resolver.resolve(&JUDGE, JobId::new(1), true).await.unwrap();

        assert_eq!(paid, EMPLOYER);
        assert_eq!(balance(&f.ledger, EMPLOYER).await, 5);
        assert_eq!(balance(&f.ledger, ESCROW).await, 0);
        assert!(f.resolver.dispute(JobId::new(1)).await.is_none());
        assert_eq!(f.resolver.stats().await.resolved_for_employer, 1);
    }

    #[tokio::test]
    async fn test_resolve_requires_resolution_authority() {
        let f = fixture(5).await;
        f.resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap();

        let err = f
            .resolver
            .resolve(&ADMIN, JobId::new(1), false)
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::ResolutionUnauthorized { .. }));
        assert!(f.resolver.dispute(JobId::new(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_failed_payout_keeps_dispute_open() {
        let f = fixture(5).await;
        f.resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(5))
            .await
            .unwrap();

        f.ledger.freeze(EMPLOYER).await;
        let err = f
            .resolver
            .resolve(&JUDGE, JobId::new(1), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DisputeError::Collaborator(_)));
        assert_eq!(
            f.resolver.outstanding_bond(JobId::new(1)).await,
            Amount::from_base_units(5)
        );
        assert_eq!(balance(&f.ledger, ESCROW).await, 5);

        f.ledger.thaw(EMPLOYER).await;
        f.resolver.resolve(&JUDGE, JobId::new(1), true).await.unwrap();
        assert_eq!(balance(&f.ledger, EMPLOYER).await, 5);
    }

    #[tokio::test]
    async fn test_unknown_employer_keeps_dispute_open() {
        let f = fixture(5).await;
        f.ledger
            .credit(APPELLANT, Amount::from_base_units(5))
            .await
            .unwrap();
        f.resolver
            .raise_dispute(&APPELLANT, JobId::new(404), Amount::from_base_units(5))
            .await
            .unwrap();

        let err = f
            .resolver
            .resolve(&JUDGE, JobId::new(404), true)
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::Collaborator(_)));
        assert!(f.resolver.dispute(JobId::new(404)).await.is_some());
    }

    #[tokio::test]
    async fn test_admin_setters() {
        let f = fixture(2).await;

        assert!(matches!(
            f.resolver.set_min_jury_size(&JUDGE, 1).await,
            Err(DisputeError::Unauthorized { .. })
        ));
        f.resolver.set_min_jury_size(&ADMIN, 2).await.unwrap();
        f.resolver
            .set_appeal_bond(&ADMIN, Amount::from_base_units(7))
            .await
            .unwrap();

        let settings = f.resolver.settings().await;
        assert_eq!(settings.min_jury_size, 2);
        assert_eq!(settings.appeal_bond, Amount::from_base_units(7));

        let record = f
            .resolver
            .raise_dispute(&APPELLANT, JobId::new(1), Amount::from_base_units(7))
            .await
            .unwrap();
        assert_eq!(record.jury.len(), 2);
    }
}
