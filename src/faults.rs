// Fleetgen - Fault modes
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The eight fault modes and their episode state.
//!
//! The fault-mode set is closed: each mode is a variant of `FaultKind`
//! carrying its sampled physical parameters. A `FaultEpisode` is one live
//! fault instance on one truck; it is plain serializable data so it can
//! cross day boundaries without carrying RNG state.

use crate::constants::*;
use crate::degradation::{improving_severity, stage_for_severity, DegradationCurve, Stage};
use crate::fleet::EngineVariant;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Fault mode identifier, FM-01 through FM-08.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultModeId {
    Fm01Bearing,
    Fm02Cooling,
    Fm03ValveTrain,
    Fm04Oil,
    Fm05Turbo,
    Fm06Injector,
    Fm07EgrCooler,
    Fm08Dpf,
}

impl FaultModeId {
    /// All modes in canonical order.
    pub const ALL: [FaultModeId; 8] = [
        FaultModeId::Fm01Bearing,
        FaultModeId::Fm02Cooling,
        FaultModeId::Fm03ValveTrain,
        FaultModeId::Fm04Oil,
        FaultModeId::Fm05Turbo,
        FaultModeId::Fm06Injector,
        FaultModeId::Fm07EgrCooler,
        FaultModeId::Fm08Dpf,
    ];

    /// Label string used in the output schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultModeId::Fm01Bearing => "FM-01",
            FaultModeId::Fm02Cooling => "FM-02",
            FaultModeId::Fm03ValveTrain => "FM-03",
            FaultModeId::Fm04Oil => "FM-04",
            FaultModeId::Fm05Turbo => "FM-05",
            FaultModeId::Fm06Injector => "FM-06",
            FaultModeId::Fm07EgrCooler => "FM-07",
            FaultModeId::Fm08Dpf => "FM-08",
        }
    }

    /// Parse a label string back into an id.
    pub fn from_str(s: &str) -> Option<FaultModeId> {
        FaultModeId::ALL.iter().copied().find(|id| id.as_str() == s)
    }
}

/// Vibration sensor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VibSensor {
    Acc1,
    Acc2,
    Acc3,
}

impl VibSensor {
    pub fn as_str(&self) -> &'static str {
        match self {
            VibSensor::Acc1 => "acc1",
            VibSensor::Acc2 => "acc2",
            VibSensor::Acc3 => "acc3",
        }
    }
}

/// A fault mode with its sampled physical parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FaultKind {
    /// FM-01: main bearing wear on one accelerometer position.
    BearingWear { sensor: VibSensor },

    /// FM-02: cooling system degradation; coolant (T1) creeps up.
    CoolingLoss { delta_t1_max: f64 },

    /// FM-03: valve train wear; impact energy in the 500-2000 Hz band.
    ValveTrainWear {
        energy_mult_max: f64,
        kurtosis_inc_max: f64,
    },

    /// FM-04: oil degradation; oil temperature (T2) rises with load.
    OilBreakdown { delta_t2_max: f64 },

    /// FM-05: turbocharger wear; T3-T4 delta shrinks, late-stage ACC-3
    /// broadband vibration.
    TurboWear { efficiency_loss_max: f64 },

    /// FM-06: fuel injector wear; T3 rise plus 10-25 kHz energy.
    InjectorWear {
        delta_t3_max: f64,
        delta_t_full: f64,
    },

    /// FM-07: EGR cooler failure; gradual T5 fouling plus discrete coolant
    /// leak spikes on T1/T5.
    EgrCooler {
        delta_t5_max: f64,
        leak_t1_spike: f64,
        leak_t5_spike: f64,
    },

    /// FM-08: DPF blockage; sustained T3 elevation, partially cleared by
    /// regen cycles.
    DpfClogging {
        delta_t3_max: f64,
        regen_interval_hours: f64,
    },
}

impl FaultKind {
    /// The mode identifier of this kind.
    pub fn id(&self) -> FaultModeId {
        match self {
            FaultKind::BearingWear { .. } => FaultModeId::Fm01Bearing,
            FaultKind::CoolingLoss { .. } => FaultModeId::Fm02Cooling,
            FaultKind::ValveTrainWear { .. } => FaultModeId::Fm03ValveTrain,
            FaultKind::OilBreakdown { .. } => FaultModeId::Fm04Oil,
            FaultKind::TurboWear { .. } => FaultModeId::Fm05Turbo,
            FaultKind::InjectorWear { .. } => FaultModeId::Fm06Injector,
            FaultKind::EgrCooler { .. } => FaultModeId::Fm07EgrCooler,
            FaultKind::DpfClogging { .. } => FaultModeId::Fm08Dpf,
        }
    }
}

/// Monitor-improve trajectory state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Improvement {
    /// Engine hours at the monitor decision.
    pub decided_at_hours: f64,
    /// Severity frozen at decision time; decay starts from here.
    pub severity_at_decision: f64,
    /// Exponential time constant, hours.
    pub tau_hours: f64,
}

/// One live fault instance on one truck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultEpisode {
    /// The fault mode and its physical parameters.
    pub kind: FaultKind,
    /// Onset in engine hours from simulation start. May be negative for
    /// pre-aged faults in controlled scenarios.
    pub onset_hours: f64,
    /// Hours from onset to end of stage 4.
    pub total_life_hours: f64,
    /// Stochasticity of the severity path.
    pub sigma: f64,
    /// Seed of the severity noise path.
    pub noise_seed: u64,
    /// Pre-sampled per-day detection probabilities for stages 2, 3, 4.
    pub detection_p: [f64; 3],
    /// Whether a detection trial has succeeded and not been cleared.
    pub detected: bool,
    /// Calendar day of the successful detection, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_day: Option<u32>,
    /// Stage at detection time, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_stage: Option<Stage>,
    /// Calendar day of the scheduled inspection, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_day: Option<u32>,
    /// A prior Monitor outcome chose "continue"; the next detection forces
    /// a repair.
    pub monitor_continue: bool,
    /// Improvement trajectory, if a Monitor outcome chose "improve".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improving: Option<Improvement>,
}

impl FaultEpisode {
    /// Sample a fresh episode of the given mode.
    pub fn sample(
        id: FaultModeId,
        onset_hours: f64,
        variant: EngineVariant,
        rng: &mut impl Rng,
    ) -> Self {
        let (kind, total_life_hours, sigma) = match id {
            FaultModeId::Fm01Bearing => {
                let (spans, sigma_range) = match variant {
                    EngineVariant::Modern => (BEARING_LIFE_MODERN, BEARING_SIGMA_MODERN),
                    EngineVariant::Older => (BEARING_LIFE_OLDER, BEARING_SIGMA_OLDER),
                };
                let life: f64 = spans
                    .iter()
                    .map(|(lo, hi)| rng.gen_range(*lo..*hi))
                    .sum();
                let sigma = rng.gen_range(sigma_range.0..sigma_range.1);
                let sensor = if rng.gen::<bool>() {
                    VibSensor::Acc1
                } else {
                    VibSensor::Acc2
                };
                (FaultKind::BearingWear { sensor }, life, sigma)
            }
            FaultModeId::Fm02Cooling => (
                FaultKind::CoolingLoss {
                    delta_t1_max: rng.gen_range(FM02_DELTA_T1_MAX.0..FM02_DELTA_T1_MAX.1),
                },
                rng.gen_range(FM02_LIFE.life_hours.0..FM02_LIFE.life_hours.1),
                FM02_LIFE.sigma,
            ),
            FaultModeId::Fm03ValveTrain => (
                FaultKind::ValveTrainWear {
                    energy_mult_max: rng.gen_range(FM03_ENERGY_MULT_MAX.0..FM03_ENERGY_MULT_MAX.1),
                    kurtosis_inc_max: rng
                        .gen_range(FM03_KURTOSIS_INC_MAX.0..FM03_KURTOSIS_INC_MAX.1),
                },
                rng.gen_range(FM03_LIFE.life_hours.0..FM03_LIFE.life_hours.1),
                FM03_LIFE.sigma,
            ),
            FaultModeId::Fm04Oil => (
                FaultKind::OilBreakdown {
                    delta_t2_max: rng.gen_range(FM04_DELTA_T2_MAX.0..FM04_DELTA_T2_MAX.1),
                },
                rng.gen_range(FM04_LIFE.life_hours.0..FM04_LIFE.life_hours.1),
                FM04_LIFE.sigma,
            ),
            FaultModeId::Fm05Turbo => (
                FaultKind::TurboWear {
                    efficiency_loss_max: rng
                        .gen_range(FM05_EFFICIENCY_LOSS_MAX.0..FM05_EFFICIENCY_LOSS_MAX.1),
                },
                rng.gen_range(FM05_LIFE.life_hours.0..FM05_LIFE.life_hours.1),
                FM05_LIFE.sigma,
            ),
            FaultModeId::Fm06Injector => (
                FaultKind::InjectorWear {
                    delta_t3_max: rng.gen_range(FM06_DELTA_T3_MAX.0..FM06_DELTA_T3_MAX.1),
                    delta_t_full: rng.gen_range(FM06_DELTA_T_FULL.0..FM06_DELTA_T_FULL.1),
                },
                rng.gen_range(FM06_LIFE.life_hours.0..FM06_LIFE.life_hours.1),
                FM06_LIFE.sigma,
            ),
            FaultModeId::Fm07EgrCooler => (
                FaultKind::EgrCooler {
                    delta_t5_max: rng.gen_range(FM07_DELTA_T5_MAX.0..FM07_DELTA_T5_MAX.1),
                    leak_t1_spike: rng.gen_range(FM07_LEAK_T1_SPIKE.0..FM07_LEAK_T1_SPIKE.1),
                    leak_t5_spike: rng.gen_range(FM07_LEAK_T5_SPIKE.0..FM07_LEAK_T5_SPIKE.1),
                },
                rng.gen_range(FM07_LIFE.life_hours.0..FM07_LIFE.life_hours.1),
                FM07_LIFE.sigma,
            ),
            FaultModeId::Fm08Dpf => (
                FaultKind::DpfClogging {
                    delta_t3_max: rng.gen_range(FM08_DELTA_T3_MAX.0..FM08_DELTA_T3_MAX.1),
                    regen_interval_hours: rng
                        .gen_range(FM08_REGEN_INTERVAL_HOURS.0..FM08_REGEN_INTERVAL_HOURS.1),
                },
                rng.gen_range(FM08_LIFE.life_hours.0..FM08_LIFE.life_hours.1),
                FM08_LIFE.sigma,
            ),
        };

        Self {
            kind,
            onset_hours,
            total_life_hours,
            sigma,
            noise_seed: rng.gen(),
            detection_p: [
                rng.gen_range(DETECT_P_STAGE2.0..DETECT_P_STAGE2.1),
                rng.gen_range(DETECT_P_STAGE3.0..DETECT_P_STAGE3.1),
                DETECT_P_STAGE4,
            ],
            detected: false,
            detection_day: None,
            detection_stage: None,
            inspection_day: None,
            monitor_continue: false,
            improving: None,
        }
    }

    /// Build the severity curve for this episode. Callers cache it for the
    /// duration of a truck-day; rebuilding is deterministic.
    pub fn curve(&self) -> DegradationCurve {
        DegradationCurve::new(self.total_life_hours, self.sigma, self.noise_seed)
    }

    /// Severity at absolute engine hours `t`, honoring the improvement
    /// overlay when present.
    pub fn severity_at(&self, curve: &DegradationCurve, t_hours: f64) -> f64 {
        if let Some(imp) = &self.improving {
            return improving_severity(
                imp.severity_at_decision,
                t_hours - imp.decided_at_hours,
                imp.tau_hours,
            );
        }
        curve.severity_at(t_hours - self.onset_hours)
    }

    /// Stage at absolute engine hours `t`.
    pub fn stage_at(&self, curve: &DegradationCurve, t_hours: f64) -> Stage {
        stage_for_severity(self.severity_at(curve, t_hours))
    }

    /// Remaining useful life at absolute engine hours `t`.
    pub fn rul_at(&self, t_hours: f64) -> f64 {
        (self.onset_hours + self.total_life_hours - t_hours).max(0.0)
    }

    /// Pre-sampled detection probability for the given stage; stage 1 faults
    /// are not detectable.
    pub fn detection_probability(&self, stage: Stage) -> Option<f64> {
        match stage {
            Stage::Stage1 => None,
            Stage::Stage2 => Some(self.detection_p[0]),
            Stage::Stage3 => Some(self.detection_p[1]),
            Stage::Stage4 => Some(self.detection_p[2]),
        }
    }
}
