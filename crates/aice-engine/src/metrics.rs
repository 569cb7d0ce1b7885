use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics for one engine instance
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,

    // Temperature
    pub temperature: Arc<IntGauge>,
    pub ticks_total: Arc<IntCounter>,
    pub rejected_ticks_total: Arc<IntCounter>,

    // Audits
    pub audits_scheduled_total: Arc<IntCounter>,
    pub audits_recorded_total: Arc<IntCounter>,
    pub penalties_total: Arc<IntCounter>,

    // Disputes
    pub disputes_raised_total: Arc<IntCounter>,
    pub disputes_resolved_total: Arc<IntCounter>,
    pub escrowed_bonds: Arc<IntGauge>,
}

impl EngineMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let temperature = IntGauge::new("aice_temperature", "Current global temperature")?;
        let ticks_total = IntCounter::new("aice_ticks_total", "Total applied temperature ticks")?;
        let rejected_ticks_total = IntCounter::new(
            "aice_rejected_ticks_total",
            "Temperature ticks rejected without state change",
        )?;

        let audits_scheduled_total =
            IntCounter::new("aice_audits_scheduled_total", "Total audits scheduled")?;
        let audits_recorded_total =
            IntCounter::new("aice_audits_recorded_total", "Total audit outcomes recorded")?;
        let penalties_total = IntCounter::new(
            "aice_penalties_total",
            "Total penalties applied for failed audits",
        )?;

        let disputes_raised_total =
            IntCounter::new("aice_disputes_raised_total", "Total disputes raised")?;
        let disputes_resolved_total =
            IntCounter::new("aice_disputes_resolved_total", "Total disputes resolved")?;
        let escrowed_bonds = IntGauge::new(
            "aice_escrowed_bonds",
            "Sum of appeal bonds currently held in escrow",
        )?;

        registry.register(Box::new(temperature.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(rejected_ticks_total.clone()))?;
        registry.register(Box::new(audits_scheduled_total.clone()))?;
        registry.register(Box::new(audits_recorded_total.clone()))?;
        registry.register(Box::new(penalties_total.clone()))?;
        registry.register(Box::new(disputes_raised_total.clone()))?;
        registry.register(Box::new(disputes_resolved_total.clone()))?;
        registry.register(Box::new(escrowed_bonds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            temperature: Arc::new(temperature),
            ticks_total: Arc::new(ticks_total),
            rejected_ticks_total: Arc::new(rejected_ticks_total),
            audits_scheduled_total: Arc::new(audits_scheduled_total),
            audits_recorded_total: Arc::new(audits_recorded_total),
            penalties_total: Arc::new(penalties_total),
            disputes_raised_total: Arc::new(disputes_raised_total),
            disputes_resolved_total: Arc::new(disputes_resolved_total),
            escrowed_bonds: Arc::new(escrowed_bonds),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
