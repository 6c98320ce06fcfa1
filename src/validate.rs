// Fleetgen - Output validation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Post-generation validation.
//!
//! Scans the emitted frames and maintenance logs and checks the dataset
//! against its distribution contract: Path A class shares inside their
//! bands, repair durations sane, no overlapping workshop intervals. A
//! violation maps to process exit code 3.
//!
//! Also hosts the controlled-fault checkpoint: ten trucks with pinned fault
//! states generated for one day, used to eyeball feature ranges before a
//! full run.

use crate::constants::*;
use crate::error::{Result, SchemaError, ValidationError};
use crate::faults::{FaultEpisode, FaultKind, VibSensor};
use crate::fleet::Fleet;
use crate::frame::{FrameSink, COLUMN_COUNT};
use crate::maintenance::MaintenanceState;
use crate::operating::AmbientModel;
use crate::storage::StateStore;
use crate::thermal::idle_temps;
use crate::truck_day::generate_truck_day;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Rows per Path A class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassCounts {
    pub normal: u64,
    pub imminent: u64,
    pub critical: u64,
}

impl ClassCounts {
    pub fn total(&self) -> u64 {
        self.normal + self.imminent + self.critical
    }
}

/// Aggregated validation facts about one output tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub rows: u64,
    pub counts: ClassCounts,
    /// Calendar-day length of every repair found in the logs.
    pub repair_durations: Vec<u32>,
    /// Trucks whose repair intervals overlap.
    pub overlap_violations: Vec<u32>,
}

impl ValidationReport {
    /// Class shares (normal, imminent, critical) of all scanned rows.
    pub fn shares(&self) -> (f64, f64, f64) {
        let total = self.counts.total().max(1) as f64;
        (
            self.counts.normal as f64 / total,
            self.counts.imminent as f64 / total,
            self.counts.critical as f64 / total,
        )
    }

    /// Human-readable summary line.
    pub fn summary(&self) -> String {
        let (n, i, c) = self.shares();
        format!(
            "{} rows: NORMAL {:.2}%, IMMINENT {:.2}%, CRITICAL {:.2}%; {} repairs",
            self.rows,
            n * 100.0,
            i * 100.0,
            c * 100.0,
            self.repair_durations.len()
        )
    }

    /// Check Path A class shares against their contract bands.
    pub fn verify_class_shares(&self) -> std::result::Result<(), ValidationError> {
        let (normal, imminent, critical) = self.shares();
        for (class, share, (lo, hi)) in [
            ("NORMAL", normal, NORMAL_SHARE),
            ("IMMINENT", imminent, IMMINENT_SHARE),
            ("CRITICAL", critical, CRITICAL_SHARE),
        ] {
            if share < lo || share > hi {
                return Err(ValidationError::ClassShare {
                    class: class.to_string(),
                    share,
                    lo,
                    hi,
                });
            }
        }
        Ok(())
    }

    /// Check repair statistics: mean duration in band, hard maximum, no
    /// overlapping workshop intervals.
    pub fn verify_repairs(&self) -> std::result::Result<(), ValidationError> {
        if let Some(truck) = self.overlap_violations.first() {
            return Err(ValidationError::RepairDuration(format!(
                "truck {} has overlapping repair intervals",
                truck
            )));
        }
        if self.repair_durations.is_empty() {
            return Ok(());
        }
        let max = *self.repair_durations.iter().max().unwrap();
        if max > REPAIR_MAX_DAYS {
            return Err(ValidationError::RepairDuration(format!(
                "max duration {} days exceeds {}",
                max, REPAIR_MAX_DAYS
            )));
        }
        let mean = self.repair_durations.iter().sum::<u32>() as f64
            / self.repair_durations.len() as f64;
        if mean < REPAIR_MEAN_DAYS.0 || mean > REPAIR_MEAN_DAYS.1 {
            return Err(ValidationError::RepairDuration(format!(
                "mean duration {:.2} days outside [{}, {}]",
                mean, REPAIR_MEAN_DAYS.0, REPAIR_MEAN_DAYS.1
            )));
        }
        Ok(())
    }
}

/// Scan every generated frame and maintenance log under `root`.
pub fn scan_output(root: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let store = StateStore::new(root);

    let mut truck_dirs: Vec<_> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("truck_")
        })
        .map(|e| e.path())
        .collect();
    truck_dirs.sort();

    if truck_dirs.is_empty() {
        return Err(ValidationError::NoData(root.display().to_string()).into());
    }

    for truck_dir in &truck_dirs {
        let mut day_files: Vec<_> = fs::read_dir(truck_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        day_files.sort();

        for file in day_files {
            scan_frame(&file, &mut report)?;
        }

        let truck_id: u32 = truck_dir
            .file_name()
            .and_then(|n| n.to_string_lossy().strip_prefix("truck_").map(String::from))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let mut intervals: Vec<(u32, u32)> = Vec::new();
        for event in store.read_maintenance_log(truck_id) {
            if event.outcome != "repair" {
                continue;
            }
            let (Some(start), Some(end)) = (event.repair_start_day, event.repair_end_day) else {
                continue;
            };
            report.repair_durations.push(end - start + 1);
            intervals.push((start, end));
        }
        intervals.sort_unstable();
        if intervals.windows(2).any(|w| w[1].0 <= w[0].1) {
            report.overlap_violations.push(truck_id);
        }
    }

    if report.rows == 0 {
        return Err(ValidationError::NoData(root.display().to_string()).into());
    }
    Ok(report)
}

fn scan_frame(path: &Path, report: &mut ValidationReport) -> Result<()> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line_no == 0 {
            continue;
        }
        let count = line.split(',').count();
        if count != COLUMN_COUNT {
            return Err(SchemaError::ColumnCount {
                row: line_no,
                expected: COLUMN_COUNT,
                actual: count,
            }
            .into());
        }
        report.rows += 1;
        // path_a_label is the final column.
        match line.rsplit(',').next().unwrap_or("") {
            "NORMAL" => report.counts.normal += 1,
            "IMMINENT" => report.counts.imminent += 1,
            "CRITICAL" => report.counts.critical += 1,
            other => {
                return Err(SchemaError::MissingLabel(format!(
                    "path_a_label '{}' in {}",
                    other,
                    path.display()
                ))
                .into())
            }
        }
    }
    Ok(())
}

fn pinned_fault(kind: FaultKind, onset: f64, life: f64, sigma: f64, seed: u64) -> FaultEpisode {
    FaultEpisode {
        kind,
        onset_hours: onset,
        total_life_hours: life,
        sigma,
        noise_seed: seed,
        detection_p: [0.25, 0.70, DETECT_P_STAGE4],
        detected: false,
        detection_day: None,
        detection_stage: None,
        inspection_day: None,
        monitor_continue: false,
        improving: None,
    }
}

/// Controlled fault assignment for the checkpoint run: pairs of healthy,
/// late-stage bearing, turbo, injector and multi-fault trucks.
pub fn checkpoint_faults(index: usize) -> Vec<FaultEpisode> {
    let seed = 100 + index as u64;
    match index {
        0 | 1 => Vec::new(),
        // 475 h into a 500 h life: logistic severity ~0.78, stage 3.
        2 | 3 => vec![pinned_fault(
            FaultKind::BearingWear {
                sensor: VibSensor::Acc1,
            },
            -475.0,
            500.0,
            0.10,
            seed,
        )],
        // 650/700 h: severity ~0.70, late stage 2.
        4 | 5 => vec![pinned_fault(
            FaultKind::TurboWear {
                efficiency_loss_max: 0.3,
            },
            -650.0,
            700.0,
            0.10,
            seed,
        )],
        // 760/800 h: severity ~0.78, stage 3.
        6 | 7 => vec![pinned_fault(
            FaultKind::InjectorWear {
                delta_t3_max: 55.0,
                delta_t_full: 75.0,
            },
            -760.0,
            800.0,
            0.08,
            seed,
        )],
        _ => vec![
            pinned_fault(
                FaultKind::BearingWear {
                    sensor: VibSensor::Acc1,
                },
                -475.0,
                500.0,
                0.10,
                seed,
            ),
            pinned_fault(
                FaultKind::TurboWear {
                    efficiency_loss_max: 0.3,
                },
                -650.0,
                700.0,
                0.10,
                seed + 100,
            ),
        ],
    }
}

/// Generate the validation checkpoint: the first ten trucks, one day each,
/// with the controlled fault manifest.
pub fn run_checkpoint(fleet: &Fleet, sink: &dyn FrameSink) -> Result<()> {
    let ambient = AmbientModel::default();
    for (index, truck) in fleet.trucks.iter().take(10).enumerate() {
        let faults = checkpoint_faults(index);
        let desc: Vec<&str> = faults.iter().map(|f| f.kind.id().as_str()).collect();
        info!(
            truck_id = truck.truck_id,
            faults = %if desc.is_empty() { "HEALTHY".to_string() } else { desc.join(", ") },
            "checkpoint truck"
        );

        let state = MaintenanceState::new(truck.truck_id, faults);
        let temps = idle_temps(truck, ambient.temperature(0, 0));
        let output = generate_truck_day(truck, &state, temps, 0)?;
        sink.write(&output.frame)?;
    }
    Ok(())
}
