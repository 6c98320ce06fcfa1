// Fleetgen - Generation manifest
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Generation manifest.
//!
//! A small JSON record describing one completed generation run: dimensions,
//! seed, schema version and fault-assignment counts. Consumers use it to
//! sanity-check a dataset without scanning every file.

use crate::config::GeneratorConfig;
use crate::constants::WINDOWS_PER_DAY;
use crate::error::Result;
use crate::fleet::Fleet;
use crate::frame::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Manifest of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationManifest {
    /// Wall-clock time of manifest creation. Metadata only; never feeds a
    /// numeric path.
    pub generated_at: DateTime<Utc>,
    pub schema_version: u32,
    pub master_seed: u64,
    pub num_trucks: usize,
    pub num_days: u32,
    pub total_windows: u64,
    /// Trucks per initial fault count (0..3).
    pub initial_fault_histogram: [usize; 4],
    pub modern_count: usize,
    pub older_count: usize,
}

impl GenerationManifest {
    /// Build the manifest for a run.
    pub fn build(config: &GeneratorConfig, fleet: &Fleet) -> Self {
        let mut histogram = [0usize; 4];
        for truck in &fleet.trucks {
            let n = truck.initial_faults(config.sim_hours()).len().min(3);
            histogram[n] += 1;
        }
        let (modern_count, older_count) = fleet.variant_counts();

        Self {
            generated_at: Utc::now(),
            schema_version: SCHEMA_VERSION,
            master_seed: config.master_seed,
            num_trucks: fleet.trucks.len(),
            num_days: config.days,
            total_windows: fleet.trucks.len() as u64 * config.days as u64 * WINDOWS_PER_DAY as u64,
            initial_fault_histogram: histogram,
            modern_count,
            older_count,
        }
    }

    /// Write to `<root>/metadata/generation_manifest.json`.
    pub fn write(&self, root: impl AsRef<Path>) -> Result<()> {
        let meta_dir = root.as_ref().join("metadata");
        fs::create_dir_all(&meta_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(meta_dir.join("generation_manifest.json"), json)?;
        Ok(())
    }
}
