use crate::{Result, TemperatureError};
use serde::{Deserialize, Serialize};

/// Inclusive temperature bounds, always `0 < min < max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    min: i128,
    max: i128,
}

impl Bounds {
    pub fn new(min: i128, max: i128) -> Result<Self> {
        if min <= 0 || max <= min {
            return Err(TemperatureError::NonPositiveBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i128 {
        self.min
    }

    pub fn max(&self) -> i128 {
        self.max
    }

    pub fn clamp(&self, value: i128) -> i128 {
        value.clamp(self.min, self.max)
    }

    /// Check that `value` is an admissible temperature under these bounds
    pub fn check(&self, value: i128) -> Result<()> {
        if value <= 0 || value < self.min || value > self.max {
            return Err(TemperatureError::TemperatureOutOfBounds {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: i128,
    pub ki: i128,
    pub kd: i128,
}

/// KPI error signals supplied with each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiErrors {
    pub emission: i128,
    pub backlog: i128,
    pub sla: i128,
}

impl KpiErrors {
    pub fn new(emission: i128, backlog: i128, sla: i128) -> Self {
        Self {
            emission,
            backlog,
            sla,
        }
    }

    pub fn combined(&self) -> Result<i128> {
        self.emission
            .checked_add(self.backlog)
            .and_then(|v| v.checked_add(self.sla))
            .ok_or(TemperatureError::ArithmeticOverflow("error"))
    }
}

/// Result of one control step, not yet applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidStep {
    pub error: i128,
    pub integral: i128,
    pub derivative: i128,
    pub delta: i128,
    pub temperature: i128,
}

/// Compute the next controller state without mutating anything.
pub fn step(
    gains: &PidGains,
    bounds: &Bounds,
    temperature: i128,
    integral: i128,
    last_error: i128,
    errors: &KpiErrors,
) -> Result<PidStep> {
    let error = errors.combined()?;
    let integral = integral
        .checked_add(error)
        .ok_or(TemperatureError::ArithmeticOverflow("integral"))?;
    let derivative = error
        .checked_sub(last_error)
        .ok_or(TemperatureError::ArithmeticOverflow("derivative"))?;

    let p = gains
        .kp
        .checked_mul(error)
        .ok_or(TemperatureError::ArithmeticOverflow("proportional term"))?;
    let i = gains
        .ki
        .checked_mul(integral)
        .ok_or(TemperatureError::ArithmeticOverflow("integral term"))?;
    let d = gains
        .kd
        .checked_mul(derivative)
        .ok_or(TemperatureError::ArithmeticOverflow("derivative term"))?;
    let delta = p
        .checked_add(i)
        .and_then(|v| v.checked_add(d))
        .ok_or(TemperatureError::ArithmeticOverflow("delta"))?;

    let unclamped = temperature
        .checked_add(delta)
        .ok_or(TemperatureError::ArithmeticOverflow("temperature"))?;
    let next = bounds.clamp(unclamped);
    if next <= 0 {
        return Err(TemperatureError::DegenerateTemperature(next));
    }

    Ok(PidStep {
        error,
        integral,
        derivative,
        delta,
        temperature: next,
    })
}
