use aice_engine::{
    demo_config, init_logging, run_demo, sample_audits, simulate_ticks, EngineConfig, TickInput,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

#[derive(Parser)]
#[command(name = "aice")]
#[command(about = "AICE - Adaptive Incentive Control & Integrity Engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    CheckConfig,

    /// Replay KPI ticks from a JSON file through a temperature controller
    SimulateTicks {
        /// JSON array of {"emission_error", "backlog_error", "sla_error"}
        #[arg(short, long)]
        ticks: PathBuf,
    },

    /// Measure the empirical audit selection rate
    SampleAudits {
        /// Selection probability in basis points
        #[arg(short, long, default_value = "500")]
        bps: u16,

        /// Number of simulated finalizations
        #[arg(short, long, default_value = "10000")]
        trials: u64,

        /// RNG seed for reproducible runs
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Run all three subsystems end to end with in-memory collaborators
    Demo {
        /// Write the event log here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also print the prometheus exposition
        #[arg(long)]
        metrics: bool,
    },
}

fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    match cli_path {
        Some(path) => Some(path.to_path_buf()),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Some(PathBuf::from(DEFAULT_CONFIG_PATH))
        }
        None => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    // Load config early to get logging settings
    let logging_config = config_path
        .as_deref()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|contents| EngineConfig::from_toml_str(&contents).ok())
        .map(|mut config| {
            config.apply_env_overrides();
            config.logging
        })
        .unwrap_or_else(|| {
            let mut config = EngineConfig::default();
            config.apply_env_overrides();
            config.logging
        });

    if let Err(e) = init_logging(&logging_config, cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::CheckConfig => {
            let path = config_path
                .context("No configuration file given and config/engine.toml not found")?;
            let config = EngineConfig::from_file(&path)?;
            println!("✅ {} is valid", path.display());
            println!("{}", config.to_toml_string()?);
        }

        Commands::SimulateTicks { ticks } => {
            let config = match config_path {
                Some(path) => EngineConfig::from_file(&path)?,
                None => EngineConfig::default(),
            };
            let contents = std::fs::read_to_string(&ticks)
                .with_context(|| format!("Failed to read ticks file: {}", ticks.display()))?;
            let inputs: Vec<TickInput> = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse ticks file: {}", ticks.display()))?;

            info!(ticks = inputs.len(), "🎛️ Replaying temperature ticks");
            for outcome in simulate_ticks(&config, &inputs).await? {
                match outcome.rejected {
                    Some(reason) => println!(
                        "#{:<4} T={:<8} integral={:<10} REJECTED: {}",
                        outcome.index, outcome.temperature, outcome.integral, reason
                    ),
                    None => println!(
                        "#{:<4} T={:<8} integral={}",
                        outcome.index, outcome.temperature, outcome.integral
                    ),
                }
            }
        }

        Commands::SampleAudits { bps, trials, seed } => {
            let report = sample_audits(bps, trials, seed).await?;
            println!(
                "selected {} of {} finalizations: {:.1} bps observed, {} bps configured",
                report.selected, report.trials, report.observed_bps, report.expected_bps
            );
        }

        Commands::Demo { output, metrics } => {
            let report = run_demo(&demo_config()).await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &report.events_json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "📦 Event log written");
                }
                None => print!("{}", report.events_json),
            }

            eprintln!(
                "temperature={} audits scheduled={} failed={} disputes raised={} outstanding={}",
                report.temperature.temperature,
                report.audit_stats.scheduled,
                report.audit_stats.failed,
                report.dispute_stats.raised,
                report.dispute_stats.outstanding
            );
            if metrics {
                print!("{}", report.metrics_text);
            }
        }
    }

    Ok(())
}
