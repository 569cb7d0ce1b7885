use aice_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemperatureError {
    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Address },

    #[error("Non-positive bounds: min {min}, max {max} (require 0 < min < max)")]
    NonPositiveBounds { min: i128, max: i128 },

    #[error("Temperature out of bounds: {value} not in [{min}, {max}]")]
    TemperatureOutOfBounds { value: i128, min: i128, max: i128 },

    #[error("Degenerate temperature after tick: {0}")]
    DegenerateTemperature(i128),

    #[error("Arithmetic overflow computing {0}")]
    ArithmeticOverflow(&'static str),
}

pub type Result<T> = std::result::Result<T, TemperatureError>;
