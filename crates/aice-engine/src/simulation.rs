//! Offline runs of the engine against in-memory collaborators.
//!
//! These back the `aice` subcommands: replaying KPI ticks through a
//! controller, measuring the empirical audit selection rate, and an
//! end-to-end demo of all three subsystems.

use crate::config::EngineConfig;
use crate::engine::{Collaborators, IntegrityEngine};
use crate::metrics::EngineMetrics;
use aice_audit::{
    AuditConfig, AuditDeps, AuditScheduler, AuditStats, BlockEntropySeedSource,
    FixedChainContext, WallClockChain,
};
use aice_common::{EventLog, InMemoryLedger, JobRegistry, ReputationBook, ValidatorPool};
use aice_disputes::DisputeStats;
use aice_temperature::{TemperatureController, TemperatureSnapshot};
use aice_types::{Address, Amount, JobId, Role};
use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Stand-in operator for simulations that only need parameters from a config
const SIMULATION_OPERATOR: Address = Address::from_bytes([0x5e; 32]);

/// One line of a tick replay file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub emission_error: i128,
    #[serde(default)]
    pub backlog_error: i128,
    #[serde(default)]
    pub sla_error: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutcome {
    pub index: usize,
    pub temperature: i128,
    pub integral: i128,
    /// Set when the tick was rejected; state is unchanged in that case
    pub rejected: Option<String>,
}

/// Replay ticks through a fresh controller built from the config's
/// temperature parameters. Rejected ticks are reported and skipped.
pub async fn simulate_ticks(config: &EngineConfig, ticks: &[TickInput]) -> Result<Vec<TickOutcome>> {
    let controller = TemperatureController::new(
        SIMULATION_OPERATOR,
        config.temperature_config(),
        Arc::new(EventLog::new()),
    )
    .context("Invalid temperature parameters")?;

    let mut outcomes = Vec::with_capacity(ticks.len());
    for (index, tick) in ticks.iter().enumerate() {
        let rejected = match controller
            .tick(
                &SIMULATION_OPERATOR,
                tick.emission_error,
                tick.backlog_error,
                tick.sla_error,
            )
            .await
        {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };

        let snapshot = controller.snapshot().await;
        outcomes.push(TickOutcome {
            index,
            temperature: snapshot.temperature,
            integral: snapshot.integral,
            rejected,
        });
    }
    Ok(outcomes)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    pub trials: u64,
    pub selected: u64,
    pub expected_bps: u16,
    pub observed_bps: f64,
}

/// Feed `trials` random finalizations through a scheduler and count how many
/// are selected. `rng_seed` makes the run reproducible.
pub async fn sample_audits(probability_bps: u16, trials: u64, rng_seed: u64) -> Result<SampleReport> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(rng_seed);
    let scheduler = AuditScheduler::new(
        SIMULATION_OPERATOR,
        AuditConfig {
            notifier: SIMULATION_OPERATOR,
            probability_bps,
            ..AuditConfig::default()
        },
        AuditDeps {
            seed_source: Arc::new(BlockEntropySeedSource),
            chain: Arc::new(FixedChainContext::new(rng.gen(), rng.gen_range(0..i64::MAX))),
            penalty_sink: None,
        },
        Arc::new(EventLog::new()),
    )?;

    let mut selected = 0u64;
    for job in 0..trials {
        let agent = Address::from_bytes(rng.gen());
        if scheduler
            .on_job_finalized(&SIMULATION_OPERATOR, JobId::new(job), agent, true, rng.gen())
            .await?
            .is_some()
        {
            selected += 1;
        }
    }

    let observed_bps = if trials == 0 {
        0.0
    } else {
        selected as f64 * 10_000.0 / trials as f64
    };
    info!(trials, selected, probability_bps, observed_bps, "📊 Audit sampling finished");

    Ok(SampleReport {
        trials,
        selected,
        expected_bps: probability_bps,
        observed_bps,
    })
}

/// Result of an end-to-end demo run
pub struct DemoReport {
    pub temperature: TemperatureSnapshot,
    pub audit_stats: AuditStats,
    pub dispute_stats: DisputeStats,
    pub events_json: String,
    pub metrics_text: String,
}

fn demo_address(tag: u8) -> Address {
    Address::from_bytes([tag; 32])
}

/// Demo configuration with distinct synthetic parties per role
pub fn demo_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.temperature.authority = demo_address(0x01);
    config.temperature.min_bound = 50;
    config.temperature.max_bound = 150;
    config.temperature.ki = 1;
    config.audit.authority = demo_address(0x02);
    config.audit.notifier = demo_address(0x03);
    config.audit.probability_bps = 10_000;
    config.audit.penalty_amount = Amount::from_base_units(10);
    config.audit.auditors = vec![demo_address(0x04)];
    config.disputes.authority = demo_address(0x05);
    config.disputes.appeal_bond = Amount::from_base_units(5);
    config.disputes.resolution_authority = demo_address(0x06);
    config.disputes.escrow_account = demo_address(0x07);
    config
}

/// Run every subsystem once against in-memory collaborators.
///
/// The config must use the demo's role addresses (see [`demo_config`]); its
/// parameters may differ.
pub async fn run_demo(config: &EngineConfig) -> Result<DemoReport> {
    let employer = demo_address(0x10);
    let agent = demo_address(0x11);
    let appellant = demo_address(0x12);

    let ledger = Arc::new(InMemoryLedger::new());
    ledger.credit(appellant, Amount::from_base_units(100)).await?;
    let reputation = Arc::new(ReputationBook::new());
    reputation.set_score(agent, 100).await;
    let registry = Arc::new(JobRegistry::new());
    let validators = (0x20..0x28).map(demo_address).collect();
    let pool = Arc::new(ValidatorPool::new(
        validators,
        config.disputes.min_jury_size.max(1),
    ));

    let metrics = EngineMetrics::new()?;
    let engine = IntegrityEngine::build_with_metrics(
        config,
        Collaborators {
            penalty_sink: Some(reputation.clone()),
            validator_selector: pool,
            employer_lookup: registry.clone(),
            ledger: ledger.clone(),
            seed_source: Arc::new(BlockEntropySeedSource),
            chain: Arc::new(WallClockChain::new(config.audit.block_interval_secs)),
        },
        metrics,
    )?;

    let temperature_authority = config.temperature.authority;
    for (emission, backlog, sla) in [(10, 0, 0), (5, 5, 0), (-20, 0, 5)] {
        if let Err(e) = engine
            .temperature
            .tick(&temperature_authority, emission, backlog, sla)
            .await
        {
            warn!(error = %e, "Demo tick rejected");
        }
    }
    engine
        .temperature
        .set_role_override(&temperature_authority, Role::Validator, config.temperature.min_bound.into())
        .await?;

    let notifier = config.audit.notifier;
    let auditor = config
        .audit
        .auditors
        .first()
        .copied()
        .context("Demo needs at least one auditor")?;
    for job in 1..=3u64 {
        registry.register(JobId::new(job), employer).await;
        let scheduled = engine
            .audit
            .on_job_finalized(&notifier, JobId::new(job), agent, true, [job as u8; 32])
            .await?;
        if scheduled.is_some() {
            engine
                .audit
                .record_audit(&auditor, JobId::new(job), job != 2, "demo review")
                .await?;
        }
    }

    let judge = config.disputes.resolution_authority;
    let bond = config.disputes.appeal_bond;
    engine
        .disputes
        .raise_dispute(&appellant, JobId::new(1), bond)
        .await?;
    engine.disputes.resolve(&judge, JobId::new(1), false).await?;
    engine
        .disputes
        .raise_dispute(&appellant, JobId::new(2), bond)
        .await?;
    engine.disputes.resolve(&judge, JobId::new(2), true).await?;

    let metrics_text = match engine.metrics() {
        Some(m) => m.render()?,
        None => String::new(),
    };

    Ok(DemoReport {
        temperature: engine.temperature.snapshot().await,
        audit_stats: engine.audit.stats().await,
        dispute_stats: engine.disputes.stats().await,
        events_json: engine.export_events().await?,
        metrics_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulate_ticks_reports_rejections() {
        let mut config = EngineConfig::default();
        config.temperature.min_bound = 50;
        config.temperature.max_bound = 150;

        let ticks = [
            TickInput {
                emission_error: 10,
                backlog_error: 0,
                sla_error: 0,
            },
            TickInput {
                emission_error: i128::MAX,
                backlog_error: 1,
                sla_error: 0,
            },
            TickInput {
                emission_error: -5,
                backlog_error: 0,
                sla_error: 0,
            },
        ];
        let outcomes = simulate_ticks(&config, &ticks).await.unwrap();

        assert_eq!(outcomes[0].temperature, 110);
        assert!(outcomes[0].rejected.is_none());
        assert!(outcomes[1].rejected.is_some());
        assert_eq!(outcomes[1].temperature, 110);
        assert_eq!(outcomes[2].temperature, 105);
    }

    #[tokio::test]
    async fn test_sample_extremes() {
        let none = sample_audits(0, 500, 1).await.unwrap();
        assert_eq!(none.selected, 0);

        let all = sample_audits(10_000, 500, 1).await.unwrap();
        assert_eq!(all.selected, 500);
        assert_eq!(all.observed_bps, 10_000.0);
    }

    #[test]
    fn test_demo_config_is_valid() {
        demo_config().validate().unwrap();
    }
}
