//! Composition root for the AICE integrity engine.
//!
//! - **config**: TOML configuration with environment overrides and validation
//! - **engine**: wires the temperature controller, audit scheduler and
//!   dispute resolver to their collaborators and a shared event log
//! - **logging**: `tracing-subscriber` setup
//! - **metrics**: prometheus registry for all three subsystems
//! - **simulation**: offline runs against in-memory collaborators

pub mod config;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod simulation;

pub use config::{AuditSection, DisputeSection, EngineConfig, LoggingConfig, TemperatureSection};
pub use engine::{Collaborators, IntegrityEngine};
pub use logging::init_logging;
pub use metrics::EngineMetrics;
pub use simulation::{
    demo_config, run_demo, sample_audits, simulate_ticks, DemoReport, SampleReport, TickInput,
    TickOutcome,
};
