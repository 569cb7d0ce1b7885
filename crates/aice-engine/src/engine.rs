use crate::config::EngineConfig;
use crate::metrics::EngineMetrics;
use aice_audit::{AuditDeps, AuditScheduler, ChainContext, SeedSource};
use aice_common::{EmployerLookup, EventLog, PenaltySink, SettlementLedger, ValidatorSelector};
use aice_disputes::{DisputeDeps, DisputeResolver};
use aice_temperature::TemperatureController;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// External capabilities, resolved once when the engine is built
pub struct Collaborators {
    pub penalty_sink: Option<Arc<dyn PenaltySink>>,
    pub validator_selector: Arc<dyn ValidatorSelector>,
    pub employer_lookup: Arc<dyn EmployerLookup>,
    pub ledger: Arc<dyn SettlementLedger>,
    pub seed_source: Arc<dyn SeedSource>,
    pub chain: Arc<dyn ChainContext>,
}

/// The three subsystems sharing one event log
pub struct IntegrityEngine {
    pub temperature: Arc<TemperatureController>,
    pub audit: Arc<AuditScheduler>,
    pub disputes: Arc<DisputeResolver>,
    pub events: Arc<EventLog>,
    metrics: Option<EngineMetrics>,
}

impl IntegrityEngine {
    pub fn build(config: &EngineConfig, collaborators: Collaborators) -> Result<Self> {
        Self::assemble(config, collaborators, None)
    }

    /// Build with prometheus metrics attached to every subsystem
    pub fn build_with_metrics(
        config: &EngineConfig,
        collaborators: Collaborators,
        metrics: EngineMetrics,
    ) -> Result<Self> {
        Self::assemble(config, collaborators, Some(metrics))
    }

    fn assemble(
        config: &EngineConfig,
        collaborators: Collaborators,
        metrics: Option<EngineMetrics>,
    ) -> Result<Self> {
        config.validate()?;
        let events = Arc::new(EventLog::new());

        let mut temperature = TemperatureController::new(
            config.temperature.authority,
            config.temperature_config(),
            events.clone(),
        )
        .context("Failed to create temperature controller")?;

        let mut audit = AuditScheduler::new(
            config.audit.authority,
            config.audit_config(),
            AuditDeps {
                seed_source: collaborators.seed_source,
                chain: collaborators.chain,
                penalty_sink: collaborators.penalty_sink,
            },
            events.clone(),
        )
        .context("Failed to create audit scheduler")?;

        let mut disputes = DisputeResolver::new(
            config.disputes.authority,
            config.dispute_config(),
            DisputeDeps {
                validator_selector: collaborators.validator_selector,
                employer_lookup: collaborators.employer_lookup,
                ledger: collaborators.ledger,
            },
            events.clone(),
        );

        if let Some(ref m) = metrics {
            temperature.set_metrics(
                m.temperature.clone(),
                m.ticks_total.clone(),
                m.rejected_ticks_total.clone(),
            );
            m.temperature.set(config.temperature.initial_temperature);
            audit.set_metrics(
                m.audits_scheduled_total.clone(),
                m.audits_recorded_total.clone(),
                m.penalties_total.clone(),
            );
            disputes.set_metrics(
                m.disputes_raised_total.clone(),
                m.disputes_resolved_total.clone(),
                m.escrowed_bonds.clone(),
            );
        }

        info!(
            temperature = config.temperature.initial_temperature,
            probability_bps = config.audit.probability_bps,
            reschedule_policy = %config.audit.reschedule_policy,
            appeal_bond = config.disputes.appeal_bond.to_base_units(),
            min_jury_size = config.disputes.min_jury_size,
            metrics = metrics.is_some(),
            "✨ Integrity engine assembled"
        );

        Ok(Self {
            temperature: Arc::new(temperature),
            audit: Arc::new(audit),
            disputes: Arc::new(disputes),
            events,
            metrics,
        })
    }

    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    /// Full event history as JSON lines
    pub async fn export_events(&self) -> Result<String> {
        self.events
            .to_json_lines()
            .await
            .context("Failed to serialize event log")
    }
}
