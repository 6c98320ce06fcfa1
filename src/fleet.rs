// Fleetgen - Fleet factory
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fleet factory.
//!
//! Builds the immutable per-truck parameters from the master seed: engine
//! variant, sampled thermal baselines, bearing geometry with its
//! characteristic frequencies, the stratified train/val/test split, and the
//! initial fault assignment. Everything derives from
//! `truck_seed = master_seed + truck_id`, so a truck's static description
//! does not depend on fleet size or iteration order.

use crate::config::GeneratorConfig;
use crate::constants::*;
use crate::error::ConfigError;
use crate::faults::{FaultEpisode, FaultModeId};
use crate::sub_seed;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Engine profile variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineVariant {
    Modern,
    Older,
}

impl EngineVariant {
    /// Label string used in the output schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineVariant::Modern => "modern",
            EngineVariant::Older => "older",
        }
    }

    /// Relative vibration noise floor for this variant.
    pub fn noise_fraction(&self) -> f64 {
        match self {
            EngineVariant::Modern => VIBRATION_NOISE_FRACTION.0,
            EngineVariant::Older => VIBRATION_NOISE_FRACTION.1,
        }
    }
}

/// Dataset split membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

/// Sampled thermal baseline for one sensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThermalBaseline {
    /// Temperature at idle, degrees C.
    pub idle: f64,
    /// Temperature rise from idle to full load, degrees C.
    pub delta_load: f64,
    /// Thermal time constant, seconds.
    pub tau: f64,
}

/// Rolling-element bearing geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BearingGeometry {
    pub n_balls: u32,
    pub ball_dia_mm: f64,
    pub pitch_dia_mm: f64,
    pub contact_angle_deg: f64,
}

impl BearingGeometry {
    fn ratio_cos(&self) -> f64 {
        (self.ball_dia_mm / self.pitch_dia_mm) * self.contact_angle_deg.to_radians().cos()
    }

    /// Shaft rotation frequency, Hz.
    pub fn shaft_frequency(rpm: f64) -> f64 {
        rpm / 60.0
    }

    /// Ball pass frequency, outer race, Hz.
    pub fn bpfo(&self, rpm: f64) -> f64 {
        (self.n_balls as f64 / 2.0) * Self::shaft_frequency(rpm) * (1.0 - self.ratio_cos())
    }

    /// Ball pass frequency, inner race, Hz.
    pub fn bpfi(&self, rpm: f64) -> f64 {
        (self.n_balls as f64 / 2.0) * Self::shaft_frequency(rpm) * (1.0 + self.ratio_cos())
    }

    /// Ball spin frequency, Hz.
    pub fn bsf(&self, rpm: f64) -> f64 {
        let rc = self.ratio_cos();
        (self.pitch_dia_mm / (2.0 * self.ball_dia_mm)) * Self::shaft_frequency(rpm) * (1.0 - rc * rc)
    }

    /// Fundamental train (cage) frequency, Hz.
    pub fn ftf(&self, rpm: f64) -> f64 {
        (Self::shaft_frequency(rpm) / 2.0) * (1.0 - self.ratio_cos())
    }

    /// The five characteristic frequencies at a given RPM:
    /// shaft, BPFO, BPFI, BSF, FTF.
    pub fn characteristic_frequencies(&self, rpm: f64) -> [f64; 5] {
        [
            Self::shaft_frequency(rpm),
            self.bpfo(rpm),
            self.bpfi(rpm),
            self.bsf(rpm),
            self.ftf(rpm),
        ]
    }
}

/// Immutable static description of one truck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckDescriptor {
    pub truck_id: u32,
    pub variant: EngineVariant,
    /// Deterministic seed: `master_seed + truck_id`.
    pub seed: u64,
    pub split: Split,
    /// Thermal baselines for T1..T6.
    pub baselines: [ThermalBaseline; 6],
    pub bearing: BearingGeometry,
}

impl TruckDescriptor {
    /// Build one truck from the master seed. The truck's own stream drives
    /// all sampling; the split is assigned afterwards by the factory.
    fn build(master_seed: u64, truck_id: u32) -> Self {
        let seed = master_seed + truck_id as u64;
        let mut rng = StdRng::seed_from_u64(seed);

        let variant = if rng.gen::<f64>() < MODERN_PRIOR {
            EngineVariant::Modern
        } else {
            EngineVariant::Older
        };

        let ranges = match variant {
            EngineVariant::Modern => &THERMAL_BASELINES_MODERN,
            EngineVariant::Older => &THERMAL_BASELINES_OLDER,
        };
        let mut baselines = [ThermalBaseline {
            idle: 0.0,
            delta_load: 0.0,
            tau: 1.0,
        }; 6];
        for (b, r) in baselines.iter_mut().zip(ranges.iter()) {
            b.idle = rng.gen_range(r.idle.0..r.idle.1);
            b.delta_load = rng.gen_range(r.delta_load.0..r.delta_load.1);
            b.tau = rng.gen_range(r.tau.0..r.tau.1);
        }

        let (n_balls, ball_dia, pitch_dia) = match variant {
            EngineVariant::Modern => BEARING_GEOMETRY_MODERN,
            EngineVariant::Older => BEARING_GEOMETRY_OLDER,
        };
        let j = BEARING_GEOMETRY_JITTER;
        let bearing = BearingGeometry {
            n_balls,
            ball_dia_mm: ball_dia * rng.gen_range(1.0 - j..1.0 + j),
            pitch_dia_mm: pitch_dia * rng.gen_range(1.0 - j..1.0 + j),
            contact_angle_deg: 0.0,
        };

        Self {
            truck_id,
            variant,
            seed,
            split: Split::Train,
            baselines,
            bearing,
        }
    }

    /// Sample the truck's initial fault assignment: count from the fleet
    /// prior, distinct modes without replacement, onsets in the first half
    /// of the horizon. Derived from the truck seed alone.
    pub fn initial_faults(&self, sim_hours: f64) -> Vec<FaultEpisode> {
        let mut rng = StdRng::seed_from_u64(sub_seed("initial-faults", self.seed));

        let roll = rng.gen::<f64>();
        let mut cumulative = 0.0;
        let mut count = 0;
        for (n, p) in FAULT_COUNT_PRIOR.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                count = n;
                break;
            }
        }

        let mut used: Vec<FaultModeId> = Vec::with_capacity(count);
        let mut faults = Vec::with_capacity(count);
        while faults.len() < count {
            let id = FaultModeId::ALL[rng.gen_range(0..FaultModeId::ALL.len())];
            if used.contains(&id) {
                continue;
            }
            used.push(id);
            let onset = rng.gen_range(0.0..sim_hours * ONSET_WINDOW_FRACTION);
            faults.push(FaultEpisode::sample(id, onset, self.variant, &mut rng));
        }
        faults
    }
}

/// The generated fleet.
#[derive(Debug, Clone)]
pub struct Fleet {
    pub trucks: Vec<TruckDescriptor>,
}

impl Fleet {
    /// Build the fleet for a configuration. Truck ids are 1-based.
    pub fn build(config: &GeneratorConfig) -> Result<Fleet, ConfigError> {
        let n = config.trucks;
        if n == 0 {
            return Err(ConfigError::InvalidDimension("empty fleet".into()));
        }

        let mut trucks: Vec<TruckDescriptor> = (1..=n as u32)
            .map(|id| TruckDescriptor::build(config.master_seed, id))
            .collect();

        assign_splits(&mut trucks, config.master_seed)?;
        Ok(Fleet { trucks })
    }

    /// Look up a truck by id.
    pub fn truck(&self, truck_id: u32) -> Result<&TruckDescriptor, ConfigError> {
        self.trucks
            .iter()
            .find(|t| t.truck_id == truck_id)
            .ok_or(ConfigError::UnknownTruck(truck_id))
    }

    /// Truck ids belonging to a split, ascending.
    pub fn split_ids(&self, split: Split) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .trucks
            .iter()
            .filter(|t| t.split == split)
            .map(|t| t.truck_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Count of trucks per variant: (modern, older).
    pub fn variant_counts(&self) -> (usize, usize) {
        let modern = self
            .trucks
            .iter()
            .filter(|t| t.variant == EngineVariant::Modern)
            .count();
        (modern, self.trucks.len() - modern)
    }
}

/// Assign train/val/test stratified by engine variant, scaling the
/// 120/50/30 ratios to the actual fleet size.
fn assign_splits(trucks: &mut [TruckDescriptor], master_seed: u64) -> Result<(), ConfigError> {
    let n = trucks.len();
    let (r_train, r_val, r_test) = SPLIT_RATIOS;
    let ratio_total = r_train + r_val + r_test;

    let train_n = n * r_train / ratio_total;
    let val_n = n * r_val / ratio_total;
    let test_n = n - train_n - val_n;
    if train_n + val_n + test_n != n {
        return Err(ConfigError::BadSplit {
            train: train_n,
            val: val_n,
            test: test_n,
            fleet: n,
        });
    }

    let mut rng = StdRng::seed_from_u64(sub_seed("splits", master_seed));

    // Shuffle within each variant group, then hand out proportional slices
    // so each split keeps the fleet's modern/older mix.
    let mut modern: Vec<usize> = Vec::new();
    let mut older: Vec<usize> = Vec::new();
    for (i, t) in trucks.iter().enumerate() {
        match t.variant {
            EngineVariant::Modern => modern.push(i),
            EngineVariant::Older => older.push(i),
        }
    }
    modern.shuffle(&mut rng);
    older.shuffle(&mut rng);

    let m_train = modern.len() * r_train / ratio_total;
    let m_val = modern.len() * r_val / ratio_total;
    let o_train = train_n.saturating_sub(m_train);
    let o_val = val_n.saturating_sub(m_val);

    let mut assign = |indices: &[usize], train: usize, val: usize| {
        for (pos, &idx) in indices.iter().enumerate() {
            trucks[idx].split = if pos < train {
                Split::Train
            } else if pos < train + val {
                Split::Val
            } else {
                Split::Test
            };
        }
    };
    assign(&modern, m_train, m_val);
    assign(&older, o_train.min(older.len()), o_val);

    Ok(())
}
