//! Contour CLI Application
//!
//! - `params`: print the parameter layout
//! - `response`: print the magnitude response for a set of values
//! - `run`: drive a simulated real-time session from a TOML config
//! - `init-config`: write a default config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use contour_core::domain::audio::ProcessSpec;
use contour_core::domain::{ContourConfig, ParamId, ResponseAnalyzer, ResponseCurve, Slope};
use contour_infra::{
    AudioEngine, EngineStats, EqProcessor, ParameterStore, ResponseMonitor, StereoBlock,
};
use crossbeam::channel::bounded;
use serde::Serialize;
use std::f64::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contour")]
#[command(about = "Three-band parametric equalizer engine", long_about = None)]
struct Cli {
    /// Enable verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parameter layout
    Params,

    /// Print the magnitude response for a set of parameter values
    Response {
        #[arg(long, default_value_t = 48000.0)]
        sample_rate: f64,

        #[arg(long, default_value_t = 32)]
        bins: usize,

        /// Parameter assignment such as `peak-gain=6` (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        assignments: Vec<(ParamId, f32)>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Run a simulated real-time session
    Run {
        /// TOML config (engine and display setup)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Session length in seconds
        #[arg(long, default_value_t = 2.0)]
        seconds: f64,

        /// Parameter assignment such as `low-cut-freq=120` (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        assignments: Vec<(ParamId, f32)>,

        /// Sweep the peak frequency across the session
        #[arg(long)]
        automate: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Write a default configuration file
    InitConfig { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// `key=value`; slopes also accept `12`/`24`/`36`/`48` or `24db`
fn parse_assignment(s: &str) -> std::result::Result<(ParamId, f32), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let id: ParamId = key.trim().parse()?;
    let value = value.trim();

    let parsed = match id {
        ParamId::LowCutSlope | ParamId::HighCutSlope => parse_slope(value)?,
        _ => value
            .parse::<f32>()
            .map_err(|e| format!("invalid value for {id}: {e}"))?,
    };
    Ok((id, parsed))
}

fn parse_slope(value: &str) -> std::result::Result<f32, String> {
    let digits = value.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '/');
    let number: u32 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid slope `{value}`"))?;

    match number {
        0..=3 => Ok(number as f32),
        _ => Slope::ALL
            .into_iter()
            .find(|slope| slope.db_per_octave() == number)
            .map(|slope| slope.index() as f32)
            .ok_or_else(|| format!("slope must be 12, 24, 36 or 48 dB/Oct, got `{value}`")),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn store_with(assignments: &[(ParamId, f32)]) -> ParameterStore {
    let store = ParameterStore::new();
    for &(id, value) in assignments {
        let stored = store.set(id, value);
        debug!(param = id.key(), value, stored, "Parameter set");
    }
    store
}

fn print_params() {
    println!(
        "{:<14} {:<16} {:>8} {:>8} {:>6} {:>8}  {}",
        "NAME", "KEY", "MIN", "MAX", "STEP", "DEFAULT", "UNIT"
    );
    for id in ParamId::ALL {
        let spec = id.spec();
        let unit = match spec.choices {
            Some(labels) => labels.join(" | "),
            None => spec.unit.to_string(),
        };
        println!(
            "{:<14} {:<16} {:>8} {:>8} {:>6} {:>8}  {}",
            id.name(),
            id.key(),
            spec.range.min,
            spec.range.max,
            spec.range.step,
            spec.default,
            unit
        );
    }
}

fn print_curve(curve: &ResponseCurve) {
    println!("{:>10}  {:>8}", "FREQ (Hz)", "dB");
    for (freq, db) in curve.points() {
        println!("{:>10.1}  {:>8.2}", freq, db);
    }
}

fn response(
    sample_rate: f64,
    bins: usize,
    assignments: &[(ParamId, f32)],
    format: OutputFormat,
) -> Result<()> {
    let settings = store_with(assignments).snapshot();
    let mut analyzer = ResponseAnalyzer::new(sample_rate)?;
    let curve = analyzer.compute_curve(&settings, bins);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&curve)?),
        OutputFormat::Table => {
            println!(
                "LowCut {} Hz {} | Peak {} dB @ {} Hz, Q {} | HighCut {} Hz {}",
                settings.low_cut_freq,
                settings.low_cut_slope,
                settings.peak_gain_db,
                settings.peak_freq,
                settings.peak_q,
                settings.high_cut_freq,
                settings.high_cut_slope
            );
            print_curve(&curve);
        }
    }
    Ok(())
}

/// Exponential sine sweep across the audible band
struct SweepGenerator {
    sample_rate: f64,
    phase: f64,
    position: usize,
    length: usize,
}

impl SweepGenerator {
    const START_HZ: f64 = 20.0;
    const END_HZ: f64 = 20000.0;
    const AMPLITUDE: f64 = 0.5;

    fn new(sample_rate: f64, length: usize) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            position: 0,
            length: length.max(1),
        }
    }

    fn next_block(&mut self, len: usize) -> Vec<f32> {
        (0..len)
            .map(|_| {
                let progress = self.position as f64 / self.length as f64;
                let freq = Self::START_HZ * (Self::END_HZ / Self::START_HZ).powf(progress);
                let sample = Self::AMPLITUDE * self.phase.sin();
                self.phase = (self.phase + TAU * freq / self.sample_rate) % TAU;
                self.position += 1;
                sample as f32
            })
            .collect()
    }
}

fn energy(samples: &[f32]) -> f64 {
    samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum()
}

fn level_db(energy: f64, frames: usize) -> f64 {
    contour_core::domain::gain_to_db((energy / frames.max(1) as f64).sqrt())
}

async fn run_session(
    config_path: Option<PathBuf>,
    seconds: f64,
    assignments: &[(ParamId, f32)],
    automate: bool,
) -> Result<SessionReport> {
    let config = match config_path {
        Some(path) => ContourConfig::load_from_file(&path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ContourConfig::default(),
    };
    config.validate()?;

    let spec = config.engine.process_spec();
    let store = Arc::new(store_with(assignments));

    let mut processor = EqProcessor::new(Arc::clone(&store));
    processor.prepare(spec.sample_rate, spec.maximum_block_size)?;

    let monitor = ResponseMonitor::new(Arc::clone(&store), spec.sample_rate)?;
    let (curve_tx, curve_rx) = bounded(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_task = tokio::spawn(monitor.run(
        config.display.refresh_interval(),
        config.display.response_bins,
        curve_tx,
        shutdown_rx,
    ));

    let (in_tx, in_rx) = bounded(4);
    let (out_tx, out_rx) = bounded(4);
    let engine = AudioEngine::start(processor, in_rx, out_tx)?;

    let total_frames = (seconds.max(0.0) * spec.sample_rate) as usize;
    let block_size = spec.maximum_block_size;
    let sample_rate = spec.sample_rate;
    let control = Arc::clone(&store);

    info!(seconds, total_frames, block_size, automate, "Session started");

    // Host side: paced in real time, as an audio callback would be
    let feeder = tokio::task::spawn_blocking(move || {
        let mut generator = SweepGenerator::new(sample_rate, total_frames);
        let (mut input_energy, mut output_energy) = (0.0, 0.0);
        let mut fed = 0;

        while fed < total_frames {
            let len = (total_frames - fed).min(block_size);
            if automate {
                control.set_normalized(ParamId::PeakFreq, fed as f32 / total_frames as f32);
            }

            let samples = generator.next_block(len);
            input_energy += energy(&samples);
            if in_tx
                .send(StereoBlock::from_channels(samples.clone(), samples))
                .is_err()
            {
                break;
            }
            match out_rx.recv() {
                Ok(block) => output_energy += energy(&block.left),
                Err(_) => break,
            }

            fed += len;
            std::thread::sleep(Duration::from_secs_f64(len as f64 / sample_rate));
        }
        (fed, input_energy, output_energy)
    });

    let (fed, input_energy, output_energy) = feeder.await?;
    let stats = tokio::task::spawn_blocking(move || engine.join()).await??;

    let curves: Vec<ResponseCurve> = curve_rx.try_iter().collect();
    shutdown_tx.send_replace(true);
    let curves_published = monitor_task.await?;

    info!("Session finished");
    Ok(SessionReport {
        spec,
        stats,
        input_level_db: level_db(input_energy, fed),
        output_level_db: level_db(output_energy, fed),
        curves_published,
        curves_pending: curves.len(),
        latest_range_db: curves.last().and_then(|curve| db_range(&curve.magnitudes_db)),
    })
}

/// Summary of a finished `run` session
#[derive(Debug, Serialize)]
struct SessionReport {
    spec: ProcessSpec,
    stats: EngineStats,
    input_level_db: f64,
    output_level_db: f64,
    curves_published: usize,
    curves_pending: usize,
    latest_range_db: Option<(f64, f64)>,
}

fn db_range(magnitudes: &[f64]) -> Option<(f64, f64)> {
    magnitudes.iter().fold(None, |range, &db| match range {
        None => Some((db, db)),
        Some((lo, hi)) => Some((f64::min(lo, db), f64::max(hi, db))),
    })
}

fn print_report(report: &SessionReport, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let stats = &report.stats;
    println!(
        "Processed {} blocks ({} frames per channel), {} errors",
        stats.blocks_processed, stats.samples_processed, stats.processing_errors
    );
    println!(
        "Input level {:.2} dB, output level {:.2} dB",
        report.input_level_db, report.output_level_db
    );
    match report.latest_range_db {
        Some((min, max)) => println!(
            "Display received {} of {} curves; latest spans {:.2} dB to {:.2} dB",
            report.curves_pending, report.curves_published, min, max
        ),
        None => println!("Display received no response curves"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Params => print_params(),
        Command::Response {
            sample_rate,
            bins,
            assignments,
            format,
        } => response(sample_rate, bins, &assignments, format)?,
        Command::Run {
            config,
            seconds,
            assignments,
            automate,
            format,
        } => {
            let report = run_session(config, seconds, &assignments, automate).await?;
            print_report(&report, format)?;
        }
        Command::InitConfig { path } => {
            ContourConfig::default().save_to_file(&path).await?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
