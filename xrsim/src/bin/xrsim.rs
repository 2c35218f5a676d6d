use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xrsim::{Config, Testbed};
use xrsim_core::{SimTime, TextDuration};

/// Run an XR/AR access-network testbed and print what reached the
/// access point.
#[derive(Parser)]
struct Command {
    /// testbed description (YAML), the built-in testbed if omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// override the seed of the testbed
    #[arg(long)]
    seed: Option<u64>,

    /// override the simulated duration of the run (e.g. `2s`, `500ms`)
    #[arg(long)]
    duration: Option<TextDuration>,

    /// log filter (e.g. `debug`, `xrsim_core=trace`), `RUST_LOG` or
    /// `info` if omitted
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cmd = Command::parse();

    init_tracing(cmd.log_level.as_deref())?;

    let mut config = match &cmd.config {
        Some(path) => Config::load(path)?,
        None => Config::default_testbed()?,
    };
    if let Some(seed) = cmd.seed {
        config.seed = seed;
    }
    if let Some(duration) = cmd.duration {
        config.duration = duration.into_duration();
    }

    info!(
        seed = config.seed,
        duration = ?config.duration,
        sources = config.sources.len(),
        "testbed loaded"
    );

    let mut testbed = Testbed::new(&config)?;
    testbed.run_until(SimTime::ZERO + config.duration);
    let report = testbed.shutdown();

    println!("{report}");

    Ok(())
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level `{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
