// Fleetgen - Maintenance lifecycle engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Maintenance lifecycle engine.
//!
//! Runs once per truck at every day boundary, after the day's rows are
//! written. Undetected faults in stage 2 or later face a daily Bernoulli
//! detection trial; a success schedules an inspection whose delay shrinks
//! with stage. Inspections resolve to repair, monitor (continue or improve)
//! or false positive by stage-dependent odds. Repairs take the truck out of
//! service for a span of calendar days, clear every active fault on return
//! and increment the episode counter. Exactly one repair can be in flight
//! per truck; scheduling collisions cancel in favor of the repair.
//!
//! The state is plain serializable data: it is persisted between days and
//! never shares RNG or memory across workers.

use crate::constants::*;
use crate::degradation::{improving_severity, Stage};
use crate::faults::{FaultEpisode, FaultModeId, Improvement};
use crate::fleet::EngineVariant;
use crate::operating::OperatingMode;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Repair scheduling status of one truck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruckStatus {
    /// Normal operation; no inspection booked.
    Operating,
    /// A detection has booked an inspection.
    RepairScheduled,
    /// The truck occupies the workshop for `start_day..=end_day`.
    InRepair { start_day: u32, end_day: u32 },
}

/// Coarse truck lifecycle state derived from the worst active fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Healthy,
    Degrading,
    Imminent,
    Critical,
    Maintenance,
}

/// One detection-to-outcome cycle in the maintenance log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub episode_id_before: u32,
    pub episode_id_after: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault_repaired: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_stage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_day: Option<u32>,
    /// "repair", "monitor_continue", "monitor_improve", "false_positive" or
    /// "simulation_end".
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_start_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_end_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_to_service_day: Option<u32>,
}

/// Per-truck maintenance state, serialized between days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceState {
    pub truck_id: u32,
    /// Count of completed repairs since simulation start; stamped into
    /// every emitted row.
    pub episode_id: u32,
    pub status: TruckStatus,
    /// Engine hours since simulation start. Frozen while in repair.
    pub engine_hours: f64,
    /// Final operating mode of the last operating day; seeds the next
    /// day's duty cycle.
    pub last_mode: OperatingMode,
    /// Active fault episodes.
    pub faults: Vec<FaultEpisode>,
    /// Thermal state must be re-initialized from idle baselines before the
    /// next operating day.
    pub thermal_reset_pending: bool,
    /// Completed detection-to-outcome cycles.
    pub log: Vec<MaintenanceEvent>,
}

impl MaintenanceState {
    /// Fresh state at simulation start.
    pub fn new(truck_id: u32, faults: Vec<FaultEpisode>) -> Self {
        Self {
            truck_id,
            episode_id: 0,
            status: TruckStatus::Operating,
            engine_hours: 0.0,
            last_mode: OperatingMode::Idle,
            faults,
            thermal_reset_pending: false,
            log: Vec::new(),
        }
    }

    /// Whether the truck occupies the workshop on `day` (no rows emitted).
    pub fn is_in_repair(&self, day: u32) -> bool {
        matches!(self.status, TruckStatus::InRepair { start_day, end_day }
            if start_day <= day && day <= end_day)
    }

    /// Coarse lifecycle state at absolute engine hours `t`.
    pub fn lifecycle_state(&self, day: u32, t_hours: f64) -> LifecycleState {
        if self.is_in_repair(day) {
            return LifecycleState::Maintenance;
        }
        let worst = self
            .faults
            .iter()
            .map(|f| f.stage_at(&f.curve(), t_hours))
            .max();
        match worst {
            None | Some(Stage::Stage1) => LifecycleState::Healthy,
            Some(Stage::Stage2) => LifecycleState::Degrading,
            Some(Stage::Stage3) => LifecycleState::Imminent,
            Some(Stage::Stage4) => LifecycleState::Critical,
        }
    }

    /// Advance the state machine across the boundary after `day`.
    ///
    /// Must be called for every simulated day in ascending order, with a
    /// fresh per-`(truck, day)` RNG so reruns and resumes agree exactly.
    pub fn end_of_day(
        &mut self,
        day: u32,
        variant: EngineVariant,
        sim_end_hours: f64,
        rng: &mut impl Rng,
    ) {
        if let TruckStatus::InRepair { end_day, .. } = self.status {
            // Workshop days: the engine clock is frozen.
            if day >= end_day {
                self.return_to_service(variant, sim_end_hours, rng);
            }
            return;
        }

        self.engine_hours += HOURS_PER_DAY;
        let t = self.engine_hours;

        self.resolve_improvements(t);
        self.process_due_inspections(day, t, rng);
        if !matches!(self.status, TruckStatus::InRepair { .. }) {
            self.run_detection_trials(day, t, rng);
            self.status = if self.faults.iter().any(|f| f.inspection_day.is_some()) {
                TruckStatus::RepairScheduled
            } else {
                TruckStatus::Operating
            };
        }
    }

    /// Drop improving faults whose severity has decayed to resolution.
    /// Self-resolution does not touch the episode counter.
    fn resolve_improvements(&mut self, t_hours: f64) {
        self.faults.retain(|f| match &f.improving {
            Some(imp) => {
                improving_severity(
                    imp.severity_at_decision,
                    t_hours - imp.decided_at_hours,
                    imp.tau_hours,
                ) >= IMPROVEMENT_RESOLVED_THRESHOLD
            }
            None => true,
        });
    }

    fn process_due_inspections(&mut self, day: u32, t_hours: f64, rng: &mut impl Rng) {
        let mut due: Vec<usize> = (0..self.faults.len())
            .filter(|&i| matches!(self.faults[i].inspection_day, Some(d) if d <= day))
            .collect();
        due.sort_by(|&a, &b| {
            (self.faults[a].inspection_day, self.faults[a].onset_hours)
                .partial_cmp(&(self.faults[b].inspection_day, self.faults[b].onset_hours))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for idx in due {
            let fault = &self.faults[idx];
            let stage = fault.stage_at(&fault.curve(), t_hours);

            // A fault already under monitoring that got re-detected goes
            // straight to repair.
            let outcome = if fault.monitor_continue {
                InspectionOutcome::Repair
            } else {
                sample_outcome(stage, rng)
            };

            let repairing = self.apply_outcome(idx, day, t_hours, stage, outcome, rng);
            if repairing {
                // The repair resolves every fault; pending inspections for
                // this truck are moot.
                return;
            }
        }
    }

    /// Apply an inspection outcome to one fault. Returns true when the
    /// truck entered the workshop.
    fn apply_outcome(
        &mut self,
        idx: usize,
        day: u32,
        t_hours: f64,
        stage: Stage,
        outcome: InspectionOutcome,
        rng: &mut impl Rng,
    ) -> bool {
        match outcome {
            InspectionOutcome::Repair => {
                self.begin_repair(idx, day, stage, rng);
                true
            }
            InspectionOutcome::Monitor => {
                let improve = rng.gen::<f64>() < MONITOR_IMPROVE_P;
                let fault = &mut self.faults[idx];
                let severity = fault.severity_at(&fault.curve(), t_hours);
                fault.inspection_day = None;
                let (outcome_str, detection_day, detection_stage) = if improve {
                    fault.improving = Some(Improvement {
                        decided_at_hours: t_hours,
                        severity_at_decision: severity,
                        tau_hours: rng
                            .gen_range(IMPROVEMENT_TAU_HOURS.0..IMPROVEMENT_TAU_HOURS.1),
                    });
                    ("monitor_improve", fault.detection_day, fault.detection_stage)
                } else {
                    let d = (fault.detection_day, fault.detection_stage);
                    fault.monitor_continue = true;
                    fault.detected = false;
                    fault.detection_day = None;
                    fault.detection_stage = None;
                    ("monitor_continue", d.0, d.1)
                };
                self.log.push(MaintenanceEvent {
                    episode_id_before: self.episode_id,
                    episode_id_after: self.episode_id,
                    fault_repaired: None,
                    detection_day,
                    detection_stage: detection_stage.map(|s| s.rank()),
                    inspection_day: Some(day),
                    outcome: outcome_str.to_string(),
                    repair_start_day: None,
                    repair_end_day: None,
                    return_to_service_day: None,
                });
                false
            }
            InspectionOutcome::FalsePositive => {
                let fault = &mut self.faults[idx];
                let detection_day = fault.detection_day;
                let detection_stage = fault.detection_stage;
                fault.detected = false;
                fault.detection_day = None;
                fault.detection_stage = None;
                fault.inspection_day = None;
                self.log.push(MaintenanceEvent {
                    episode_id_before: self.episode_id,
                    episode_id_after: self.episode_id,
                    fault_repaired: None,
                    detection_day,
                    detection_stage: detection_stage.map(|s| s.rank()),
                    inspection_day: Some(day),
                    outcome: "false_positive".to_string(),
                    repair_start_day: None,
                    repair_end_day: None,
                    return_to_service_day: None,
                });
                false
            }
        }
    }

    fn begin_repair(&mut self, idx: usize, day: u32, stage: Stage, rng: &mut impl Rng) {
        let (lo, hi) = match stage {
            Stage::Stage1 | Stage::Stage2 => REPAIR_DURATION_STAGE2,
            Stage::Stage3 => REPAIR_DURATION_STAGE3,
            Stage::Stage4 => REPAIR_DURATION_STAGE4,
        };
        let duration = rng.gen_range(lo..=hi);
        let start_day = day + 1;
        let end_day = day + duration;

        let fault = &self.faults[idx];
        self.log.push(MaintenanceEvent {
            episode_id_before: self.episode_id,
            episode_id_after: self.episode_id + 1,
            fault_repaired: Some(fault.kind.id().as_str().to_string()),
            detection_day: fault.detection_day,
            detection_stage: fault.detection_stage.map(|s| s.rank()),
            inspection_day: Some(day),
            outcome: "repair".to_string(),
            repair_start_day: Some(start_day),
            repair_end_day: Some(end_day),
            return_to_service_day: Some(end_day + 1),
        });

        // Collision rule: entering the workshop cancels every other
        // scheduled inspection.
        for f in &mut self.faults {
            f.inspection_day = None;
        }
        self.status = TruckStatus::InRepair { start_day, end_day };
    }

    fn run_detection_trials(&mut self, day: u32, t_hours: f64, rng: &mut impl Rng) {
        for fault in &mut self.faults {
            if fault.detected || fault.improving.is_some() {
                continue;
            }
            let curve = fault.curve();
            if fault.severity_at(&curve, t_hours) <= 0.0 {
                continue;
            }
            let stage = fault.stage_at(&curve, t_hours);
            let Some(p) = fault.detection_probability(stage) else {
                continue;
            };
            if rng.gen::<f64>() >= p {
                continue;
            }

            fault.detected = true;
            fault.detection_day = Some(day);
            fault.detection_stage = Some(stage);
            let (lo, hi) = match stage {
                Stage::Stage1 | Stage::Stage2 => INSPECTION_DELAY_STAGE2,
                Stage::Stage3 => INSPECTION_DELAY_STAGE3,
                Stage::Stage4 => INSPECTION_DELAY_STAGE4,
            };
            fault.inspection_day = Some(day + rng.gen_range(lo..=hi));
        }
    }

    /// Return to service at the boundary after the final workshop day:
    /// clear all faults, bump the episode counter, reset thermal state and
    /// maybe seed a fresh fault after the healthy buffer.
    fn return_to_service(
        &mut self,
        variant: EngineVariant,
        sim_end_hours: f64,
        rng: &mut impl Rng,
    ) {
        let repaired_modes: Vec<FaultModeId> =
            self.faults.iter().map(|f| f.kind.id()).collect();
        self.faults.clear();
        self.episode_id += 1;
        self.status = TruckStatus::Operating;
        self.last_mode = OperatingMode::Idle;
        self.thermal_reset_pending = true;

        let return_hours = self.engine_hours;
        if sim_end_hours - return_hours < HEALTHY_BUFFER_HOURS {
            return;
        }
        if rng.gen::<f64>() >= POST_REPAIR_NEW_FAULT_P {
            return;
        }

        let candidates: Vec<FaultModeId> = FaultModeId::ALL
            .iter()
            .copied()
            .filter(|id| !repaired_modes.contains(id))
            .collect();
        if candidates.is_empty() {
            return;
        }
        let id = candidates[rng.gen_range(0..candidates.len())];
        let span = sim_end_hours - return_hours - HEALTHY_BUFFER_HOURS;
        let mut onset = return_hours + HEALTHY_BUFFER_HOURS;
        if span > 0.0 {
            onset += rng.gen_range(0.0..span);
        }
        self.faults.push(FaultEpisode::sample(id, onset, variant, rng));
    }

    /// Record terminal `simulation_end` entries for every unresolved fault.
    pub fn finalize(&mut self) {
        for fault in &self.faults {
            self.log.push(MaintenanceEvent {
                episode_id_before: self.episode_id,
                episode_id_after: self.episode_id,
                fault_repaired: None,
                detection_day: fault.detection_day,
                detection_stage: fault.detection_stage.map(|s| s.rank()),
                inspection_day: fault.inspection_day,
                outcome: "simulation_end".to_string(),
                repair_start_day: None,
                repair_end_day: None,
                return_to_service_day: None,
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InspectionOutcome {
    Repair,
    Monitor,
    FalsePositive,
}

fn sample_outcome(stage: Stage, rng: &mut impl Rng) -> InspectionOutcome {
    let table = match stage {
        Stage::Stage1 | Stage::Stage2 => OUTCOME_STAGE2,
        Stage::Stage3 => OUTCOME_STAGE3,
        Stage::Stage4 => OUTCOME_STAGE4,
    };
    let roll = rng.gen::<f64>();
    if roll < table[0] {
        InspectionOutcome::Repair
    } else if roll < table[0] + table[1] {
        InspectionOutcome::Monitor
    } else {
        InspectionOutcome::FalsePositive
    }
}
