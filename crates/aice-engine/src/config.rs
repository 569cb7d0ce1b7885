//! Engine configuration loaded from TOML.
//!
//! One file carries the initial parameters of all three subsystems plus the
//! logging setup. Addresses are `0x`-prefixed hex strings. TOML integers are
//! 64-bit, so temperature parameters are read as `i64` and widened.

use aice_audit::{AuditConfig, ReschedulePolicy, BPS_DENOMINATOR};
use aice_disputes::DisputeConfig;
use aice_temperature::{PidGains, TemperatureConfig};
use aice_types::{Address, Amount};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub temperature: TemperatureSection,
    #[serde(default)]
    pub audit: AuditSection,
    #[serde(default)]
    pub disputes: DisputeSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemperatureSection {
    pub authority: Address,
    pub initial_temperature: i64,
    pub min_bound: i64,
    pub max_bound: i64,
    #[serde(default)]
    pub kp: i64,
    #[serde(default)]
    pub ki: i64,
    #[serde(default)]
    pub kd: i64,
}

impl Default for TemperatureSection {
    fn default() -> Self {
        Self {
            authority: Address::ZERO,
            initial_temperature: 100,
            min_bound: 1,
            max_bound: 1_000,
            kp: 1,
            ki: 0,
            kd: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditSection {
    pub authority: Address,
    /// Trusted completion notifier (the job ledger)
    pub notifier: Address,
    pub probability_bps: u16,
    #[serde(default)]
    pub penalty_amount: Amount,
    #[serde(default)]
    pub auditors: Vec<Address>,
    #[serde(default)]
    pub reschedule_policy: ReschedulePolicy,
    /// Block interval used to derive wall-clock block entropy
    #[serde(default = "default_block_interval_secs")]
    pub block_interval_secs: u64,
}

fn default_block_interval_secs() -> u64 {
    12
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            authority: Address::ZERO,
            notifier: Address::ZERO,
            probability_bps: 500,
            penalty_amount: Amount::ZERO,
            auditors: Vec::new(),
            reschedule_policy: ReschedulePolicy::default(),
            block_interval_secs: default_block_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisputeSection {
    pub authority: Address,
    pub appeal_bond: Amount,
    pub min_jury_size: usize,
    pub resolution_authority: Address,
    pub escrow_account: Address,
}

impl Default for DisputeSection {
    fn default() -> Self {
        let defaults = DisputeConfig::default();
        Self {
            authority: Address::ZERO,
            appeal_bond: defaults.appeal_bond,
            min_jury_size: defaults.min_jury_size,
            resolution_authority: defaults.resolution_authority,
            escrow_account: defaults.escrow_account,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// pretty, compact or json
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file_output: Option<PathBuf>,
    /// Extra directives, e.g. `aice_audit = "debug"`
    #[serde(default)]
    pub module_filters: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file_output: None,
            module_filters: HashMap::new(),
        }
    }
}

const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

impl EngineConfig {
    /// Read, apply environment overrides and validate
    pub fn from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "⚙️ Loading engine configuration");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        config.validate()?;

        info!(
            probability_bps = config.audit.probability_bps,
            appeal_bond = config.disputes.appeal_bond.to_base_units(),
            auditors = config.audit.auditors.len(),
            "✅ Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Runtime settings only; engine parameters come from the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("AICE_LOG_LEVEL") {
            info!(level = %level, "Overriding log level from environment");
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AICE_LOG_FORMAT") {
            info!(format = %format, "Overriding log format from environment");
            self.logging.format = format;
        }
        if let Ok(file) = std::env::var("AICE_LOG_FILE") {
            self.logging.file_output = Some(PathBuf::from(file));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.temperature;
        if t.authority.is_null() {
            anyhow::bail!("temperature.authority must be set");
        }
        if t.min_bound <= 0 || t.max_bound <= t.min_bound {
            anyhow::bail!(
                "Invalid temperature bounds [{}, {}]: need 0 < min < max",
                t.min_bound,
                t.max_bound
            );
        }
        if t.initial_temperature < t.min_bound || t.initial_temperature > t.max_bound {
            anyhow::bail!(
                "Initial temperature {} outside bounds [{}, {}]",
                t.initial_temperature,
                t.min_bound,
                t.max_bound
            );
        }

        let a = &self.audit;
        if a.authority.is_null() {
            anyhow::bail!("audit.authority must be set");
        }
        if a.notifier.is_null() {
            anyhow::bail!("audit.notifier must be set");
        }
        if a.probability_bps > BPS_DENOMINATOR {
            anyhow::bail!(
                "audit.probability_bps = {} exceeds {}",
                a.probability_bps,
                BPS_DENOMINATOR
            );
        }
        if a.block_interval_secs == 0 {
            anyhow::bail!("audit.block_interval_secs must be > 0");
        }

        let d = &self.disputes;
        if d.authority.is_null() {
            anyhow::bail!("disputes.authority must be set");
        }
        if d.resolution_authority.is_null() {
            anyhow::bail!("disputes.resolution_authority must be set");
        }
        if d.escrow_account.is_null() {
            anyhow::bail!("disputes.escrow_account must be set");
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Valid options: {}",
                self.logging.format,
                LOG_FORMATS.join(", ")
            );
        }
        Ok(())
    }

    pub fn temperature_config(&self) -> TemperatureConfig {
        let t = &self.temperature;
        TemperatureConfig {
            initial_temperature: t.initial_temperature.into(),
            min_bound: t.min_bound.into(),
            max_bound: t.max_bound.into(),
            gains: PidGains {
                kp: t.kp.into(),
                ki: t.ki.into(),
                kd: t.kd.into(),
            },
        }
    }

    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            notifier: self.audit.notifier,
            probability_bps: self.audit.probability_bps,
            penalty_amount: self.audit.penalty_amount,
            auditors: self.audit.auditors.clone(),
            reschedule_policy: self.audit.reschedule_policy,
        }
    }

    pub fn dispute_config(&self) -> DisputeConfig {
        DisputeConfig {
            appeal_bond: self.disputes.appeal_bond,
            min_jury_size: self.disputes.min_jury_size,
            resolution_authority: self.disputes.resolution_authority,
            escrow_account: self.disputes.escrow_account,
        }
    }
}
