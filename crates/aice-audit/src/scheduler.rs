use crate::randomness::{is_selected, ChainContext, SeedInput, SeedSource};
use crate::types::{AuditConfig, AuditRecord, AuditSettings, AuditStats, ReschedulePolicy};
use crate::{AuditError, Result, BPS_DENOMINATOR};
use aice_common::{Authority, EventLog, IntegrityEvent, Module, PenaltySink};
use aice_types::{Address, Amount, Hash, JobId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Capabilities the scheduler is wired with at composition time
pub struct AuditDeps {
    pub seed_source: Arc<dyn SeedSource>,
    pub chain: Arc<dyn ChainContext>,
    pub penalty_sink: Option<Arc<dyn PenaltySink>>,
}

struct SchedulerState {
    authority: Authority,
    notifier: Address,
    auditors: BTreeSet<Address>,
    probability_bps: u16,
    penalty_amount: Amount,
    penalty_sink: Option<Arc<dyn PenaltySink>>,
    policy: ReschedulePolicy,
    paused: bool,
    records: HashMap<JobId, AuditRecord>,
    stats: AuditStats,
}

impl SchedulerState {
    fn ensure_authority(&self, caller: &Address) -> Result<()> {
        if !self.authority.is_held_by(caller) {
            warn!(caller = %caller.short(), "🚫 Audit admin call rejected");
            return Err(AuditError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(AuditError::Paused);
        }
        Ok(())
    }
}

fn validate_probability(probability_bps: u16) -> Result<()> {
    if probability_bps > BPS_DENOMINATOR {
        return Err(AuditError::InvalidProbability(probability_bps));
    }
    Ok(())
}

/// Probabilistic audit scheduler with penalty enforcement.
///
/// State lives behind a single write lock held for the whole of each
/// operation, including the awaited penalty-sink call, so two outcome
/// recordings for the same job can never both succeed.
pub struct AuditScheduler {
    state: Arc<RwLock<SchedulerState>>,
    seed_source: Arc<dyn SeedSource>,
    chain: Arc<dyn ChainContext>,
    events: Arc<EventLog>,

    // Metrics
    pub audits_scheduled_total: Option<Arc<prometheus::IntCounter>>,
    pub audits_recorded_total: Option<Arc<prometheus::IntCounter>>,
    pub penalties_total: Option<Arc<prometheus::IntCounter>>,
}

impl AuditScheduler {
    pub fn new(
        authority: Address,
        config: AuditConfig,
        deps: AuditDeps,
        events: Arc<EventLog>,
    ) -> Result<Self> {
        validate_probability(config.probability_bps)?;

        Ok(Self {
            state: Arc::new(RwLock::new(SchedulerState {
                authority: Authority::new(authority),
                notifier: config.notifier,
                auditors: config.auditors.into_iter().collect(),
                probability_bps: config.probability_bps,
                penalty_amount: config.penalty_amount,
                penalty_sink: deps.penalty_sink,
                policy: config.reschedule_policy,
                paused: false,
                records: HashMap::new(),
                stats: AuditStats::default(),
            })),
            seed_source: deps.seed_source,
            chain: deps.chain,
            events,
            audits_scheduled_total: None,
            audits_recorded_total: None,
            penalties_total: None,
        })
    }

    /// Set metrics for audit tracking
    pub fn set_metrics(
        &mut self,
        audits_scheduled_total: Arc<prometheus::IntCounter>,
        audits_recorded_total: Arc<prometheus::IntCounter>,
        penalties_total: Arc<prometheus::IntCounter>,
    ) {
        self.audits_scheduled_total = Some(audits_scheduled_total);
        self.audits_recorded_total = Some(audits_recorded_total);
        self.penalties_total = Some(penalties_total);
    }

    /// Completion notification from the job ledger.
    ///
    /// Returns the new record when the job is selected, `None` when the
    /// notification is ignored or the job is not selected.
    pub async fn on_job_finalized(
        &self,
        caller: &Address,
        job_id: JobId,
        agent: Address,
        success: bool,
        result_hash: Hash,
    ) -> Result<Option<AuditRecord>> {
        let mut state = self.state.write().await;
        state.ensure_not_paused()?;
        if state.notifier.is_null() || state.notifier != *caller {
            warn!(
                caller = %caller.short(),
                job_id = %job_id,
                "🚫 Finalization from untrusted notifier"
            );
            return Err(AuditError::Unauthorized { caller: *caller });
        }

        if !success || agent.is_null() || state.probability_bps == 0 {
            debug!(
                job_id = %job_id,
                success,
                null_agent = agent.is_null(),
                probability_bps = state.probability_bps,
                "Finalization not eligible for audit"
            );
            return Ok(None);
        }

        let existing = state.records.contains_key(&job_id);
        if existing && state.policy == ReschedulePolicy::RejectExisting {
            warn!(job_id = %job_id, "⛔ Repeat finalization rejected");
            return Err(AuditError::AuditAlreadyScheduled(job_id));
        }

        let chain = self.chain.snapshot();
        let seed = self.seed_source.derive_seed(
            &SeedInput {
                job_id,
                agent,
                result_hash,
            },
            &chain,
        );
        state.stats.evaluated += 1;

        if !is_selected(&seed, state.probability_bps) {
            debug!(
                job_id = %job_id,
                seed = %hex::encode(&seed[..8]),
                "Job not selected for audit"
            );
            return Ok(None);
        }

        let record = AuditRecord {
            agent,
            result_hash,
            seed,
            scheduled_at: chain.timestamp,
            completed: false,
            passed: false,
        };

        if let Some(previous) = state.records.insert(job_id, record.clone()) {
            state.stats.replaced += 1;
            if !previous.completed {
                state.stats.pending -= 1;
            }
            warn!(
                job_id = %job_id,
                previous_seed = %hex::encode(&previous.seed[..8]),
                previous_completed = previous.completed,
                "⚠️ Existing audit record overwritten"
            );
        }
        state.stats.scheduled += 1;
        state.stats.pending += 1;

        self.events
            .emit(IntegrityEvent::AuditScheduled {
                job_id,
                agent,
                seed: hex::encode(seed),
                replaced_existing: existing,
            })
            .await;
        if let Some(ref counter) = self.audits_scheduled_total {
            counter.inc();
        }

        info!(
            job_id = %job_id,
            agent = %agent.short(),
            seed = %hex::encode(&seed[..8]),
            scheduled_at = chain.timestamp,
            "🔍 Audit scheduled"
        );
        Ok(Some(record))
    }

    /// Record the outcome of a scheduled audit. Each audit completes once.
    pub async fn record_audit(
        &self,
        caller: &Address,
        job_id: JobId,
        passed: bool,
        details: &str,
    ) -> Result<AuditRecord> {
        let mut state = self.state.write().await;
        state.ensure_not_paused()?;
        if !state.auditors.contains(caller) {
            warn!(caller = %caller.short(), job_id = %job_id, "🚫 Audit from non-auditor");
            return Err(AuditError::Unauthorized { caller: *caller });
        }

        let record = state
            .records
            .get(&job_id)
            .ok_or(AuditError::AuditNotScheduled(job_id))?;
        if record.completed {
            return Err(AuditError::AuditAlreadyCompleted(job_id));
        }
        let agent = record.agent;

        let penalty = match (&state.penalty_sink, passed) {
            (Some(sink), false) if !state.penalty_amount.is_zero() => {
                Some((sink.clone(), state.penalty_amount))
            }
            _ => None,
        };

        // The guard is still held, so no competing recording can slip in
        // between the completed check above and the commit below.
        if let Some((sink, amount)) = &penalty {
            if let Err(e) = sink.subtract(agent, *amount).await {
                warn!(
                    job_id = %job_id,
                    agent = %agent.short(),
                    error = %e,
                    "❌ Penalty sink failed, audit outcome not recorded"
                );
                return Err(e.into());
            }
        }

        let updated = {
            let record = state
                .records
                .get_mut(&job_id)
                .ok_or(AuditError::AuditNotScheduled(job_id))?;
            record.completed = true;
            record.passed = passed;
            record.clone()
        };
        state.stats.completed += 1;
        state.stats.pending -= 1;
        if passed {
            state.stats.passed += 1;
        } else {
            state.stats.failed += 1;
        }
        if penalty.is_some() {
            state.stats.penalties_applied += 1;
        }

        self.events
            .emit(IntegrityEvent::AuditRecorded {
                job_id,
                auditor: *caller,
                passed,
                details: details.to_string(),
            })
            .await;
        if let Some(ref counter) = self.audits_recorded_total {
            counter.inc();
        }

        info!(
            job_id = %job_id,
            auditor = %caller.short(),
            passed,
            "📋 Audit recorded"
        );

        if let Some((_, amount)) = penalty {
            self.events
                .emit(IntegrityEvent::AgentPenalized {
                    job_id,
                    agent,
                    amount,
                })
                .await;
            if let Some(ref counter) = self.penalties_total {
                counter.inc();
            }
            info!(
                job_id = %job_id,
                agent = %agent.short(),
                amount = amount.to_base_units(),
                "⚔️ Agent penalized for failed audit"
            );
        }

        Ok(updated)
    }

    pub async fn transfer_authority(&self, caller: &Address, new_authority: Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        let previous = state.authority.replace(new_authority);

        self.events
            .emit(IntegrityEvent::AuthorityTransferred {
                module: Module::Audit,
                previous,
                new: new_authority,
            })
            .await;
        info!(
            previous = %previous.short(),
            new = %new_authority.short(),
            "🔑 Audit authority transferred"
        );
        Ok(())
    }

    pub async fn set_notifier(&self, caller: &Address, notifier: Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.notifier = notifier;

        self.events
            .emit(IntegrityEvent::NotifierUpdated { notifier })
            .await;
        info!(notifier = %notifier.short(), "⚙️ Completion notifier updated");
        Ok(())
    }

    /// Replace or remove the penalty sink
    pub async fn set_penalty_sink(
        &self,
        caller: &Address,
        sink: Option<Arc<dyn PenaltySink>>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        let configured = sink.is_some();
        state.penalty_sink = sink;

        self.events
            .emit(IntegrityEvent::PenaltySinkUpdated { configured })
            .await;
        info!(configured, "⚙️ Penalty sink updated");
        Ok(())
    }

    pub async fn set_probability_bps(&self, caller: &Address, probability_bps: u16) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        validate_probability(probability_bps)?;
        state.probability_bps = probability_bps;

        self.events
            .emit(IntegrityEvent::AuditProbabilityUpdated { probability_bps })
            .await;
        info!(probability_bps, "⚙️ Audit probability updated");
        Ok(())
    }

    pub async fn set_penalty_amount(&self, caller: &Address, amount: Amount) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.penalty_amount = amount;

        self.events
            .emit(IntegrityEvent::PenaltyAmountUpdated { amount })
            .await;
        info!(amount = amount.to_base_units(), "⚙️ Penalty amount updated");
        Ok(())
    }

    /// Add or remove an address from the auditor allow-list
    pub async fn set_auditor(&self, caller: &Address, auditor: Address, allowed: bool) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        if allowed {
            state.auditors.insert(auditor);
        } else {
            state.auditors.remove(&auditor);
        }

        self.events
            .emit(IntegrityEvent::AuditorUpdated { auditor, allowed })
            .await;
        info!(auditor = %auditor.short(), allowed, "⚙️ Auditor allow-list updated");
        Ok(())
    }

    pub async fn set_reschedule_policy(
        &self,
        caller: &Address,
        policy: ReschedulePolicy,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.policy = policy;

        self.events
            .emit(IntegrityEvent::ReschedulePolicyUpdated {
                policy: policy.to_string(),
            })
            .await;
        info!(policy = %policy, "⚙️ Reschedule policy updated");
        Ok(())
    }

    pub async fn pause(&self, caller: &Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.paused = true;

        self.events.emit(IntegrityEvent::AuditPaused).await;
        info!("⏸️ Audit scheduler paused");
        Ok(())
    }

    pub async fn unpause(&self, caller: &Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.paused = false;

        self.events.emit(IntegrityEvent::AuditUnpaused).await;
        info!("▶️ Audit scheduler resumed");
        Ok(())
    }

    pub async fn audit(&self, job_id: JobId) -> Option<AuditRecord> {
        self.state.read().await.records.get(&job_id).cloned()
    }

    pub async fn is_auditor(&self, address: &Address) -> bool {
        self.state.read().await.auditors.contains(address)
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }

    pub async fn settings(&self) -> AuditSettings {
        let state = self.state.read().await;
        AuditSettings {
            authority: state.authority.holder(),
            notifier: state.notifier,
            probability_bps: state.probability_bps,
            penalty_amount: state.penalty_amount,
            penalty_sink_configured: state.penalty_sink.is_some(),
            reschedule_policy: state.policy,
            paused: state.paused,
            auditors: state.auditors.iter().copied().collect(),
        }
    }

    pub async fn stats(&self) -> AuditStats {
        self.state.read().await.stats.clone()
    }
}
