//! # Fleetgen
//!
//! Deterministic synthetic telemetry generator for a predictive-maintenance
//! fleet of commercial diesel trucks.
//!
//! ## Key Properties
//!
//! - **Reproducible**: one master seed derives every random stream; any
//!   worker count and any scheduling order produce byte-identical output
//! - **Physics-flavored**: Markov duty cycles, first-order thermal lag,
//!   logistic fault degradation, bearing fault frequencies
//! - **Ground truth without leakage**: labels come from internal fault
//!   state, never from the synthesized features
//! - **Full maintenance lifecycle**: detection, inspection, repair,
//!   monitor-improve and false positives with an auditable event log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetgen::{BatchRunner, CsvSink, Fleet, GeneratorConfig};
//!
//! let config = GeneratorConfig::new()
//!     .with_trucks(10)
//!     .with_days(7)
//!     .with_seed(42)
//!     .with_output_dir("output");
//!
//! let fleet = Fleet::build(&config).unwrap();
//! let sink = CsvSink::new("output");
//! let summary = BatchRunner::new(&config, &fleet, &sink).run().unwrap();
//! assert!(summary.is_clean());
//! ```
//!
//! ## Modules
//!
//! - [`fleet`]: per-truck static parameters and initial fault assignment
//! - [`operating`]: Markov duty cycle, RPM/load, ambient temperature
//! - [`degradation`]: severity curves and stage thresholds
//! - [`faults`] / [`effects`]: the eight fault modes and their signatures
//! - [`thermal`] / [`vibration`] / [`features`]: per-window synthesis
//! - [`labels`]: ground-truth label production
//! - [`maintenance`]: detection/inspection/repair lifecycle
//! - [`truck_day`] / [`batch`]: work-unit orchestration
//! - [`frame`] / [`storage`]: output schema and sidecar persistence
//! - [`validate`]: post-generation distribution checks

pub mod batch;
pub mod config;
pub mod constants;
pub mod degradation;
pub mod effects;
pub mod error;
pub mod faults;
pub mod features;
pub mod fleet;
pub mod frame;
pub mod labels;
pub mod maintenance;
pub mod manifest;
pub mod operating;
pub mod storage;
pub mod thermal;
pub mod truck_day;
pub mod validate;
pub mod vibration;

// Re-exports for convenient access
pub use batch::{BatchRunner, BatchSummary};
pub use config::GeneratorConfig;
pub use error::{ConfigError, FleetError, LogicError, Result, SchemaError, ValidationError};
pub use fleet::{EngineVariant, Fleet, TruckDescriptor};
pub use frame::{CsvSink, FrameSink, TruckDayFrame};
pub use labels::{PathALabel, RowLabels};
pub use maintenance::{MaintenanceState, TruckStatus};
pub use manifest::GenerationManifest;
pub use thermal::ThermalState;
pub use truck_day::{generate_truck_day, TruckDayOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fork a named deterministic sub-stream from a parent seed. Components
/// never share an RNG; each one reseeds from its own tag.
pub(crate) fn sub_seed(tag: &str, seed: u64) -> u64 {
    xxhash_rust::xxh64::xxh64(tag.as_bytes(), seed)
}
