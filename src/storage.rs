// Fleetgen - Sidecar storage
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sidecar persistence.
//!
//! Thermal state, maintenance state and the maintenance log live next to
//! the generated frames as small JSON records, partitioned per truck and
//! keyed by day. The store is append-only: one record per
//! `(truck_id, day_index)`, written atomically. A worker only ever touches
//! the truck it currently owns, so no locking is needed.

use crate::error::Result;
use crate::fleet::{Fleet, Split};
use crate::maintenance::{MaintenanceEvent, MaintenanceState};
use crate::thermal::ThermalState;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a JSON value atomically: temp file in the same directory, then
/// rename over the final path.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json.as_bytes())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Sidecar store rooted at the output directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn thermal_path(&self, truck_id: u32, day_index: u32) -> PathBuf {
        self.root
            .join("thermal_state")
            .join(format!("truck_{:03}", truck_id))
            .join(format!("day_{:03}.json", day_index))
    }

    fn truck_metadata_dir(&self, truck_id: u32) -> PathBuf {
        self.root
            .join("metadata")
            .join(format!("truck_{:03}", truck_id))
    }

    fn maintenance_state_path(&self, truck_id: u32, day_index: u32) -> PathBuf {
        self.truck_metadata_dir(truck_id)
            .join(format!("maintenance_state_day_{:03}.json", day_index))
    }

    /// Persist the end-of-day thermal state.
    pub fn save_thermal(&self, state: &ThermalState) -> Result<()> {
        write_json_atomic(&self.thermal_path(state.truck_id, state.day_index), state)
    }

    /// Load a day's thermal state. Missing or corrupt records return `None`;
    /// the caller falls back to idle baselines.
    pub fn load_thermal(&self, truck_id: u32, day_index: u32) -> Option<ThermalState> {
        let path = self.thermal_path(truck_id, day_index);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(
                    truck_id,
                    day_index,
                    %err,
                    "corrupt thermal state, falling back to idle baselines"
                );
                None
            }
        }
    }

    /// Persist the end-of-day maintenance state.
    pub fn save_maintenance(&self, state: &MaintenanceState, day_index: u32) -> Result<()> {
        write_json_atomic(&self.maintenance_state_path(state.truck_id, day_index), state)
    }

    /// Load a day's maintenance state, if present and readable.
    pub fn load_maintenance(&self, truck_id: u32, day_index: u32) -> Option<MaintenanceState> {
        let path = self.maintenance_state_path(truck_id, day_index);
        let text = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Write the truck's full maintenance log.
    pub fn write_maintenance_log(&self, truck_id: u32, log: &[MaintenanceEvent]) -> Result<()> {
        write_json_atomic(
            &self.truck_metadata_dir(truck_id).join("maintenance_log.json"),
            &log,
        )
    }

    /// Read a truck's maintenance log, empty if absent.
    pub fn read_maintenance_log(&self, truck_id: u32) -> Vec<MaintenanceEvent> {
        let path = self.truck_metadata_dir(truck_id).join("maintenance_log.json");
        fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    /// Write the train/val/test id files and the stratification summary.
    pub fn write_split_files(&self, fleet: &Fleet) -> Result<()> {
        let meta_dir = self.root.join("metadata");
        fs::create_dir_all(&meta_dir)?;

        for split in [Split::Train, Split::Val, Split::Test] {
            let ids = fleet.split_ids(split);
            let mut text = String::new();
            for id in &ids {
                text.push_str(&id.to_string());
                text.push('\n');
            }
            fs::write(meta_dir.join(format!("{}_trucks.txt", split.as_str())), text)?;
        }

        #[derive(Serialize)]
        struct SplitSummary {
            total: usize,
            modern: usize,
            older: usize,
        }
        let summary: std::collections::BTreeMap<&str, SplitSummary> =
            [Split::Train, Split::Val, Split::Test]
                .into_iter()
                .map(|split| {
                    let members: Vec<_> =
                        fleet.trucks.iter().filter(|t| t.split == split).collect();
                    let modern = members
                        .iter()
                        .filter(|t| t.variant == crate::fleet::EngineVariant::Modern)
                        .count();
                    (
                        split.as_str(),
                        SplitSummary {
                            total: members.len(),
                            modern,
                            older: members.len() - modern,
                        },
                    )
                })
                .collect();
        write_json_atomic(&meta_dir.join("fleet_stratification.json"), &summary)
    }
}
