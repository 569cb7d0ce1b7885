use crate::pid::{self, Bounds, KpiErrors, PidGains, PidStep};
use crate::{Result, TemperatureError};
use aice_common::{Authority, EventLog, IntegrityEvent, Module};
use aice_types::{Address, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Initial controller parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub initial_temperature: i128,
    pub min_bound: i128,
    pub max_bound: i128,
    pub gains: PidGains,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 100,
            min_bound: 1,
            max_bound: 1_000,
            gains: PidGains {
                kp: 1,
                ki: 0,
                kd: 0,
            },
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureSnapshot {
    pub authority: Address,
    pub temperature: i128,
    pub bounds: Bounds,
    pub gains: PidGains,
    pub integral: i128,
    pub last_error: i128,
    pub overrides: BTreeMap<Role, i128>,
}

struct ControllerState {
    authority: Authority,
    temperature: i128,
    bounds: Bounds,
    gains: PidGains,
    integral: i128,
    last_error: i128,
    overrides: BTreeMap<Role, i128>,
}

impl ControllerState {
    fn ensure_authority(&self, caller: &Address) -> Result<()> {
        if !self.authority.is_held_by(caller) {
            warn!(caller = %caller.short(), "🚫 Temperature admin call rejected");
            return Err(TemperatureError::Unauthorized { caller: *caller });
        }
        Ok(())
    }
}

/// PID-driven temperature controller.
///
/// All mutations go through one write lock, so ticks are applied strictly in
/// arrival order and the integral and last error accumulate sequentially.
pub struct TemperatureController {
    state: Arc<RwLock<ControllerState>>,
    events: Arc<EventLog>,

    // Metrics
    pub temperature_gauge: Option<Arc<prometheus::IntGauge>>,
    pub ticks_total: Option<Arc<prometheus::IntCounter>>,
    pub rejected_ticks_total: Option<Arc<prometheus::IntCounter>>,
}

impl TemperatureController {
    pub fn new(
        authority: Address,
        config: TemperatureConfig,
        events: Arc<EventLog>,
    ) -> Result<Self> {
        let bounds = Bounds::new(config.min_bound, config.max_bound)?;
        bounds.check(config.initial_temperature)?;

        Ok(Self {
            state: Arc::new(RwLock::new(ControllerState {
                authority: Authority::new(authority),
                temperature: config.initial_temperature,
                bounds,
                gains: config.gains,
                integral: 0,
                last_error: 0,
                overrides: BTreeMap::new(),
            })),
            events,
            temperature_gauge: None,
            ticks_total: None,
            rejected_ticks_total: None,
        })
    }

    /// Set metrics for controller tracking
    pub fn set_metrics(
        &mut self,
        temperature_gauge: Arc<prometheus::IntGauge>,
        ticks_total: Arc<prometheus::IntCounter>,
        rejected_ticks_total: Arc<prometheus::IntCounter>,
    ) {
        self.temperature_gauge = Some(temperature_gauge);
        self.ticks_total = Some(ticks_total);
        self.rejected_ticks_total = Some(rejected_ticks_total);
    }

    fn observe_temperature(&self, temperature: i128) {
        if let Some(ref gauge) = self.temperature_gauge {
            gauge.set(i64::try_from(temperature).unwrap_or(i64::MAX));
        }
    }

    pub async fn transfer_authority(&self, caller: &Address, new_authority: Address) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        let previous = state.authority.replace(new_authority);

        self.events
            .emit(IntegrityEvent::AuthorityTransferred {
                module: Module::Temperature,
                previous,
                new: new_authority,
            })
            .await;
        info!(
            previous = %previous.short(),
            new = %new_authority.short(),
            "🔑 Temperature authority transferred"
        );
        Ok(())
    }

    /// Replace the PID gains. Magnitudes are not checked.
    pub async fn set_pid(&self, caller: &Address, kp: i128, ki: i128, kd: i128) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.gains = PidGains { kp, ki, kd };

        self.events
            .emit(IntegrityEvent::PidGainsUpdated { kp, ki, kd })
            .await;
        info!(kp, ki, kd, "🎛️ PID gains updated");
        Ok(())
    }

    /// Replace the bounds and pull the current temperature inside them.
    pub async fn set_bounds(&self, caller: &Address, min: i128, max: i128) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        let bounds = Bounds::new(min, max)?;

        let previous = state.temperature;
        state.bounds = bounds;
        state.temperature = bounds.clamp(previous);
        let temperature = state.temperature;

        // Overrides live under the same bounds as the global temperature
        let mut reclamped_overrides = Vec::new();
        for (role, value) in state.overrides.iter_mut() {
            let clamped = bounds.clamp(*value);
            if clamped != *value {
                *value = clamped;
                reclamped_overrides.push((*role, clamped));
            }
        }

        self.events
            .emit(IntegrityEvent::BoundsUpdated { min, max })
            .await;
        self.events
            .emit(IntegrityEvent::TemperatureUpdated {
                previous,
                temperature,
            })
            .await;
        for (role, value) in &reclamped_overrides {
            self.events
                .emit(IntegrityEvent::RoleOverrideSet {
                    role: *role,
                    temperature: *value,
                })
                .await;
        }
        self.observe_temperature(temperature);

        info!(
            min,
            max,
            previous,
            temperature,
            reclamped = previous != temperature,
            reclamped_overrides = reclamped_overrides.len(),
            "📏 Temperature bounds updated"
        );
        Ok(())
    }

    pub async fn set_temperature(&self, caller: &Address, value: i128) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.bounds.check(value)?;

        let previous = std::mem::replace(&mut state.temperature, value);

        self.events
            .emit(IntegrityEvent::TemperatureUpdated {
                previous,
                temperature: value,
            })
            .await;
        self.observe_temperature(value);
        info!(previous, temperature = value, "🌡️ Temperature set");
        Ok(())
    }

    pub async fn set_role_override(&self, caller: &Address, role: Role, value: i128) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.bounds.check(value)?;
        state.overrides.insert(role, value);

        self.events
            .emit(IntegrityEvent::RoleOverrideSet {
                role,
                temperature: value,
            })
            .await;
        info!(role = %role, temperature = value, "🌡️ Role override set");
        Ok(())
    }

    /// Drop a role override so the role follows the global temperature again
    pub async fn clear_role_override(&self, caller: &Address, role: Role) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;
        state.overrides.remove(&role);

        self.events
            .emit(IntegrityEvent::RoleOverrideCleared { role })
            .await;
        info!(role = %role, "🌡️ Role override cleared");
        Ok(())
    }

    /// Apply one PID step from the three KPI error signals.
    ///
    /// Fails closed: on any error nothing changes, not even `last_error`.
    pub async fn tick(
        &self,
        caller: &Address,
        emission_error: i128,
        backlog_error: i128,
        sla_error: i128,
    ) -> Result<PidStep> {
        let mut state = self.state.write().await;
        state.ensure_authority(caller)?;

        let errors = KpiErrors::new(emission_error, backlog_error, sla_error);
        let outcome = match pid::step(
            &state.gains,
            &state.bounds,
            state.temperature,
            state.integral,
            state.last_error,
            &errors,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(ref counter) = self.rejected_ticks_total {
                    counter.inc();
                }
                warn!(
                    emission_error,
                    backlog_error,
                    sla_error,
                    error = %e,
                    "❌ Temperature tick rejected"
                );
                return Err(e);
            }
        };

        state.integral = outcome.integral;
        state.last_error = outcome.error;
        state.temperature = outcome.temperature;

        self.events
            .emit(IntegrityEvent::TemperatureTicked {
                error: outcome.error,
                integral: outcome.integral,
                derivative: outcome.derivative,
                delta: outcome.delta,
                temperature: outcome.temperature,
            })
            .await;
        if let Some(ref counter) = self.ticks_total {
            counter.inc();
        }
        self.observe_temperature(outcome.temperature);

        info!(
            error = outcome.error,
            integral = outcome.integral,
            derivative = outcome.derivative,
            delta = outcome.delta,
            temperature = outcome.temperature,
            "🔄 Temperature ticked"
        );
        Ok(outcome)
    }

    pub async fn temperature(&self) -> i128 {
        self.state.read().await.temperature
    }

    /// Role override if one is set, otherwise the global temperature
    pub async fn effective_temperature(&self, role: Role) -> i128 {
        let state = self.state.read().await;
        state
            .overrides
            .get(&role)
            .copied()
            .unwrap_or(state.temperature)
    }

    pub async fn snapshot(&self) -> TemperatureSnapshot {
        let state = self.state.read().await;
        TemperatureSnapshot {
            authority: state.authority.holder(),
            temperature: state.temperature,
            bounds: state.bounds,
            gains: state.gains,
            integral: state.integral,
            last_error: state.last_error,
            overrides: state.overrides.clone(),
        }
    }
}
