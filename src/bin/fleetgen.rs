// Fleetgen - Generation CLI
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Fleetgen CLI
//!
//! Generates the synthetic fleet dataset from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # Full default run: 200 trucks, 183 days, seed 42
//! fleetgen --output-dir output/
//!
//! # Smoke test: one truck, one day
//! fleetgen --single-truck 17 --single-day 0 --output-dir /tmp/smoke
//!
//! # Controlled checkpoint: 10 trucks x 1 day with pinned faults
//! fleetgen --validation-checkpoint --output-dir /tmp/checkpoint
//! ```
//!
//! Exit codes: 0 success, 2 configuration error, 3 validation failure,
//! 1 anything else.

use clap::Parser;
use fleetgen::validate::{run_checkpoint, scan_output};
use fleetgen::{BatchRunner, CsvSink, Fleet, FleetError, GeneratorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Synthetic predictive-maintenance dataset generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fleet size
    #[arg(long, default_value = "200")]
    trucks: usize,

    /// Simulation horizon in days
    #[arg(long, default_value = "183")]
    days: u32,

    /// Master seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Destination root; per-truck subdirectories are created below it
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Parallel worker count
    #[arg(long, default_value = "8")]
    workers: usize,

    /// Skip work units whose output file already exists
    #[arg(long, default_value = "true")]
    skip_existing: bool,

    /// Generate only this truck id
    #[arg(long)]
    single_truck: Option<u32>,

    /// Generate only this day index (requires --single-truck)
    #[arg(long)]
    single_day: Option<u32>,

    /// Run 10 trucks x 1 day with a fixed controlled-fault manifest
    #[arg(long)]
    validation_checkpoint: bool,

    /// Validate an existing output tree instead of generating
    #[arg(long)]
    validate_only: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Fleetgen v{}", fleetgen::VERSION);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(args: &Args) -> Result<(), FleetError> {
    let mut config = GeneratorConfig::new()
        .with_trucks(args.trucks)
        .with_days(args.days)
        .with_seed(args.seed)
        .with_output_dir(args.output_dir.clone())
        .with_workers(args.workers)
        .with_skip_existing(args.skip_existing);
    if let Some(truck) = args.single_truck {
        config = config.with_single(truck, args.single_day);
    }
    config.validate()?;

    if args.validate_only {
        let report = scan_output(&args.output_dir)?;
        info!("{}", report.summary());
        report.verify_class_shares()?;
        report.verify_repairs()?;
        info!("validation passed");
        return Ok(());
    }

    let fleet = Fleet::build(&config)?;
    let sink = CsvSink::new(&args.output_dir);

    if args.validation_checkpoint {
        info!("running validation checkpoint: 10 trucks x 1 day");
        run_checkpoint(&fleet, &sink)?;
        let report = scan_output(&args.output_dir)?;
        info!("{}", report.summary());
        return Ok(());
    }

    let summary = BatchRunner::new(&config, &fleet, &sink).run()?;
    if !summary.is_clean() {
        for (truck_id, message) in &summary.errors {
            error!(truck_id, "{}", message);
        }
        return Err(FleetError::Logic(fleetgen::LogicError::invariant(
            "batch",
            format!("{} trucks failed", summary.errors.len()),
        )));
    }

    // Distribution bands are only meaningful at fleet scale; smoke tests
    // and single units skip the check.
    let full_run = args.single_truck.is_none() && args.trucks * args.days as usize >= 1000;
    if full_run {
        let report = scan_output(&args.output_dir)?;
        info!("{}", report.summary());
        report.verify_class_shares()?;
        report.verify_repairs()?;
    }

    Ok(())
}
