// src/main.rs
mod brain_utils;
mod classifier;
mod config;
mod drivers;
mod engine;
mod recorder;
mod types;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use crate::config::{init_logging, DecoderConfig, LogLevel};
use crate::drivers::{connect_streams, CommandLog, Decoder, StaticDirectory};
use crate::engine::SimulationSettings;
use crate::types::RunMode;
/// SSVEP decoder: classifies EEG windows by canonical correlation against
/// per-stimulus reference signals and emits one command per window.
#[derive(Parser, Debug)]
#[command(name = "ssvep-decoder", version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,
    /// Overrides `logging.level` from the configuration
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
    /// Write every classified window to this CSV file
    #[arg(long)]
    results_csv: Option<PathBuf>,
    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,
    /// Simulated open-loop trials (ignored when a label file is configured)
    #[arg(long, default_value_t = 12)]
    trials: usize,
    /// Simulated closed-loop session length in seconds
    #[arg(long, default_value_t = 30.0)]
    duration: f64,
    /// Simulated amplifier sample rate in Hz
    #[arg(long, default_value_t = 256.0)]
    sample_rate: f64,
    /// Peak amplitude of the simulated background noise
    #[arg(long, default_value_t = 1.0)]
    noise: f64,
    #[arg(long, default_value_t = 7)]
    seed: u64,
}
fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DecoderConfig::load(&cli.config)?;
    init_logging(cli.log_level.unwrap_or(config.log_level));
    info!("configuration loaded from {}", cli.config.display());
    let labels = config.load_labels()?;
    // 没有真实的 LSL 流时用模拟放大器驱动解码器
    let mut settings = SimulationSettings {
        stream_name: config.streams.eeg.clone(),
        sample_rate_hz: cli.sample_rate,
        noise: cli.noise,
        seed: cli.seed,
        trials: cli.trials,
        duration: cli.duration,
        ..SimulationSettings::default()
    };
    if let Some(labels) = &labels {
        settings.targets = labels.clone();
    }
    let session = engine::session(config.mode, &config.frequencies(), &settings);
    let labels = match (config.mode, labels) {
        (RunMode::OpenLoop, None) => session.targets.clone(),
        (_, labels) => labels.unwrap_or_default(),
    };
    let names = vec![
        config.streams.eeg.clone(),
        config.streams.markers.clone(),
        config.streams.commands.clone(),
    ];
    let mut directory = StaticDirectory::new(names.clone());
    connect_streams(&mut directory, &names, Duration::from_millis(100), None)
        .context("stream discovery failed")?;
    let mut decoder = Decoder::new(
        &config,
        session.data,
        session.markers,
        CommandLog::default(),
        labels,
    )
    .context("decoder setup failed")?;
    if let Some(path) = &cli.results_csv {
        decoder
            .recorder_mut()
            .start_csv(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }
    let summary = decoder.run();
    info!(
        "{} commands sent to {}",
        decoder.outlet().sent().len(),
        config.streams.commands
    );
    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
