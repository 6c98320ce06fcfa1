// Fleetgen - Generator configuration
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Generator configuration.
//!
//! A `GeneratorConfig` describes one full generation run: fleet size,
//! horizon, master seed, output location and scheduling knobs.

use crate::constants::{self, FLEET_SIZE, SIMULATION_DAYS};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of trucks in the fleet.
    pub trucks: usize,
    /// Simulation horizon in days.
    pub days: u32,
    /// Master seed; every other random stream derives from it.
    pub master_seed: u64,
    /// Destination root; per-truck subdirectories are created below it.
    pub output_dir: PathBuf,
    /// Parallel worker count for the batch runner.
    pub workers: usize,
    /// Skip work units whose output file already exists.
    pub skip_existing: bool,
    /// Restrict generation to a single truck.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_truck: Option<u32>,
    /// Restrict generation to a single day (requires `single_truck`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_day: Option<u32>,
    /// Run the maintenance lifecycle engine at day boundaries. Scenario
    /// tests disable it to observe raw degradation.
    pub maintenance_enabled: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            trucks: FLEET_SIZE,
            days: SIMULATION_DAYS,
            master_seed: 42,
            output_dir: PathBuf::from("output"),
            workers: 8,
            skip_existing: true,
            single_truck: None,
            single_day: None,
            maintenance_enabled: true,
        }
    }
}

impl GeneratorConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fleet size.
    pub fn with_trucks(mut self, trucks: usize) -> Self {
        self.trucks = trucks;
        self
    }

    /// Set simulation horizon in days.
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Set master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.master_seed = seed;
        self
    }

    /// Set output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set parallel worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable skip-existing resumability.
    pub fn with_skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Restrict to a single truck, optionally a single day.
    pub fn with_single(mut self, truck: u32, day: Option<u32>) -> Self {
        self.single_truck = Some(truck);
        self.single_day = day;
        self
    }

    /// Enable or disable the maintenance lifecycle engine.
    pub fn with_maintenance(mut self, enabled: bool) -> Self {
        self.maintenance_enabled = enabled;
        self
    }

    /// Total engine-hour horizon of the run.
    pub fn sim_hours(&self) -> f64 {
        self.days as f64 * constants::HOURS_PER_DAY
    }

    /// Validate the configuration and the constant tables it relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trucks == 0 {
            return Err(ConfigError::InvalidDimension("trucks must be > 0".into()));
        }
        if self.days == 0 {
            return Err(ConfigError::InvalidDimension("days must be > 0".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidDimension("workers must be > 0".into()));
        }
        if self.single_day.is_some() && self.single_truck.is_none() {
            return Err(ConfigError::InvalidDimension(
                "--single-day requires --single-truck".into(),
            ));
        }
        constants::validate()
    }
}
