use aice_audit::{BlockEntropySeedSource, FixedChainContext};
use aice_common::{
    EventRecord, InMemoryLedger, IntegrityEvent, JobRegistry, Module, ReputationBook,
    SettlementLedger, ValidatorPool,
};
use aice_engine::{
    demo_config, run_demo, Collaborators, EngineConfig, EngineMetrics, IntegrityEngine,
};
use aice_types::{Address, Amount, JobId, Role};
use std::io::Write;
use std::sync::Arc;

const SAMPLE_CONFIG: &str = include_str!("../../../config/engine.toml");

struct World {
    ledger: Arc<InMemoryLedger>,
    reputation: Arc<ReputationBook>,
    registry: Arc<JobRegistry>,
}

fn collaborators(world: &World) -> Collaborators {
    let validators = (0x20..0x26).map(|i| Address::from_bytes([i; 32])).collect();
    Collaborators {
        penalty_sink: Some(world.reputation.clone()),
        validator_selector: Arc::new(ValidatorPool::new(validators, 3)),
        employer_lookup: world.registry.clone(),
        ledger: world.ledger.clone(),
        seed_source: Arc::new(BlockEntropySeedSource),
        chain: Arc::new(FixedChainContext::new([1; 32], 1_700_000_000)),
    }
}

fn world() -> World {
    World {
        ledger: Arc::new(InMemoryLedger::new()),
        reputation: Arc::new(ReputationBook::new()),
        registry: Arc::new(JobRegistry::new()),
    }
}

#[test]
fn test_sample_config_file_loads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.audit.probability_bps, 500);
    assert_eq!(config.disputes.min_jury_size, 3);
    assert_eq!(config.logging.module_filters.get("aice_common").unwrap(), "warn");
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, SAMPLE_CONFIG.replace("min_bound = 50", "min_bound = -1")).unwrap();

    let err = EngineConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("bounds"));

    let missing = dir.path().join("missing.toml");
    assert!(EngineConfig::from_file(&missing).is_err());
}

#[test]
fn test_log_level_env_override() {
    let mut config = EngineConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
    std::env::set_var("AICE_LOG_LEVEL", "trace");
    config.apply_env_overrides();
    std::env::remove_var("AICE_LOG_LEVEL");
    assert_eq!(config.logging.level, "trace");
}

#[tokio::test]
async fn test_engine_runs_all_subsystems_on_one_log() {
    let config = EngineConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
    let w = world();
    let engine = IntegrityEngine::build(&config, collaborators(&w)).unwrap();

    // Scenario A on the sample bounds
    let step = engine
        .temperature
        .tick(&config.temperature.authority, 10, 0, 0)
        .await
        .unwrap();
    assert_eq!(step.temperature, 110);
    assert_eq!(engine.temperature.effective_temperature(Role::Agent).await, 110);

    // Force selection, then fail the audit
    engine
        .audit
        .set_probability_bps(&config.audit.authority, 10_000)
        .await
        .unwrap();
    let agent = Address::from_bytes([0xA9; 32]);
    w.reputation.set_score(agent, 50).await;
    engine
        .audit
        .on_job_finalized(&config.audit.notifier, JobId::new(1), agent, true, [9; 32])
        .await
        .unwrap()
        .unwrap();
    engine
        .audit
        .record_audit(&config.audit.auditors[0], JobId::new(1), false, "mismatch")
        .await
        .unwrap();
    assert_eq!(w.reputation.score(&agent).await, 40);

    // Appellant wins their bond back
    let appellant = Address::from_bytes([0xAB; 32]);
    w.ledger
        .credit(appellant, Amount::from_base_units(100))
        .await
        .unwrap();
    engine
        .disputes
        .raise_dispute(&appellant, JobId::new(1), Amount::from_base_units(100))
        .await
        .unwrap();
    assert_eq!(
        w.ledger.balance_of(config.disputes.escrow_account).await.unwrap(),
        Amount::from_base_units(100)
    );
    engine
        .disputes
        .resolve(&config.disputes.resolution_authority, JobId::new(1), false)
        .await
        .unwrap();
    assert_eq!(
        w.ledger.balance_of(appellant).await.unwrap(),
        Amount::from_base_units(100)
    );

    let history = engine.events.history().await;
    let sequences: Vec<u64> = history.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, (0..history.len() as u64).collect::<Vec<_>>());
    for module in [Module::Temperature, Module::Audit, Module::Disputes] {
        assert!(!engine.events.history_for(module).await.is_empty());
    }

    let exported = engine.export_events().await.unwrap();
    let parsed: Vec<EventRecord> = exported
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(parsed, history);
}

#[tokio::test]
async fn test_metrics_follow_operations() {
    let config = EngineConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
    let w = world();
    let engine =
        IntegrityEngine::build_with_metrics(&config, collaborators(&w), EngineMetrics::new().unwrap())
            .unwrap();

    engine
        .temperature
        .tick(&config.temperature.authority, 20, 0, 0)
        .await
        .unwrap();
    assert!(engine
        .temperature
        .tick(&config.temperature.authority, i128::MAX, 1, 0)
        .await
        .is_err());

    let text = engine.metrics().unwrap().render().unwrap();
    assert!(text.contains("aice_temperature 120"));
    assert!(text.contains("aice_ticks_total 1"));
    assert!(text.contains("aice_rejected_ticks_total 1"));
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let w = world();
    assert!(IntegrityEngine::build(&EngineConfig::default(), collaborators(&w)).is_err());
}

#[tokio::test]
async fn test_demo_end_to_end() {
    let report = run_demo(&demo_config()).await.unwrap();

    assert_eq!(report.audit_stats.scheduled, 3);
    assert_eq!(report.audit_stats.failed, 1);
    assert_eq!(report.audit_stats.penalties_applied, 1);
    assert_eq!(report.dispute_stats.raised, 2);
    assert_eq!(report.dispute_stats.outstanding, 0);
    assert_eq!(report.temperature.overrides.len(), 1);
    assert!(report.metrics_text.contains("aice_disputes_resolved_total 2"));

    let first = report.events_json.lines().next().unwrap();
    let record: EventRecord = serde_json::from_str(first).unwrap();
    assert!(matches!(record.event, IntegrityEvent::TemperatureTicked { .. }));
}
