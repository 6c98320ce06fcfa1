// Fleetgen - Operating-state simulation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Duty-cycle simulation.
//!
//! A four-state Markov chain walks the truck through idle / city / cruise /
//! heavy at 60-second steps. RPM and load are drawn per window from the
//! mode's range (truncated normal at the midpoint, clamped) and smoothed
//! with a short first-order filter so transitions look like a vehicle, not a
//! step function. Ambient temperature follows seasonal and daily sinusoids.

use crate::constants::*;
use crate::error::ConfigError;
use crate::fleet::EngineVariant;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Engine operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    Idle,
    City,
    Cruise,
    Heavy,
}

impl OperatingMode {
    /// All modes in matrix order.
    pub const ALL: [OperatingMode; 4] = [
        OperatingMode::Idle,
        OperatingMode::City,
        OperatingMode::Cruise,
        OperatingMode::Heavy,
    ];

    /// Row/column index in the transition matrix.
    pub fn index(&self) -> usize {
        match self {
            OperatingMode::Idle => 0,
            OperatingMode::City => 1,
            OperatingMode::Cruise => 2,
            OperatingMode::Heavy => 3,
        }
    }

    /// RPM sampling range for this mode and engine variant.
    pub fn rpm_range(&self, variant: EngineVariant) -> (f64, f64) {
        let (modern, older) = RPM_RANGES[self.index()];
        match variant {
            EngineVariant::Modern => modern,
            EngineVariant::Older => older,
        }
    }

    /// Normalized load sampling range for this mode.
    pub fn load_range(&self) -> (f64, f64) {
        LOAD_RANGES[self.index()]
    }
}

/// Validated Markov transition matrix over operating modes.
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    rows: [[f64; 4]; 4],
}

impl TransitionMatrix {
    /// Load the contract matrix from `constants`.
    pub fn from_constants() -> Result<Self, ConfigError> {
        Self::new(TRANSITION_MATRIX)
    }

    /// Wrap a matrix, verifying rows are stochastic.
    pub fn new(rows: [[f64; 4]; 4]) -> Result<Self, ConfigError> {
        for (row, probs) in rows.iter().enumerate() {
            let sum: f64 = probs.iter().sum();
            if (sum - 1.0).abs() > 1e-9 || probs.iter().any(|p| *p < 0.0) {
                return Err(ConfigError::BadTransitionRow { row, sum });
            }
        }
        Ok(Self { rows })
    }

    /// Sample the successor of `mode`.
    pub fn step(&self, mode: OperatingMode, rng: &mut impl Rng) -> OperatingMode {
        let roll = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (i, p) in self.rows[mode.index()].iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                return OperatingMode::ALL[i];
            }
        }
        // Floating-point residue: fall through to the last state.
        OperatingMode::Heavy
    }

    /// Mode sequence for one day, starting in `initial`.
    pub fn simulate_day(&self, initial: OperatingMode, rng: &mut impl Rng) -> Vec<OperatingMode> {
        let mut modes = Vec::with_capacity(WINDOWS_PER_DAY);
        let mut state = initial;
        for _ in 0..WINDOWS_PER_DAY {
            modes.push(state);
            state = self.step(state, rng);
        }
        modes
    }

    /// Stationary distribution by power iteration.
    pub fn stationary_distribution(&self) -> [f64; 4] {
        let mut pi = [0.25f64; 4];
        for _ in 0..200 {
            let mut next = [0.0f64; 4];
            for (i, p_i) in pi.iter().enumerate() {
                for (j, next_j) in next.iter_mut().enumerate() {
                    *next_j += p_i * self.rows[i][j];
                }
            }
            let sum: f64 = next.iter().sum();
            for v in next.iter_mut() {
                *v /= sum;
            }
            pi = next;
        }
        pi
    }
}

/// Per-window operating state fed to the feature synthesizers.
#[derive(Debug, Clone, Copy)]
pub struct OperatingPoint {
    pub mode: OperatingMode,
    pub rpm: f64,
    pub load: f64,
    pub ambient: f64,
}

/// Sample RPM and load trajectories for a mode sequence.
///
/// Each window draws a target from a truncated normal centered on the mode
/// range midpoint with sigma = range/4, clamped to the range, then a
/// first-order filter (alpha = 0.2, about five minutes) smooths the result.
pub fn rpm_load_trajectories(
    modes: &[OperatingMode],
    variant: EngineVariant,
    rng: &mut impl Rng,
) -> (Vec<f64>, Vec<f64>) {
    let mut rpm = Vec::with_capacity(modes.len());
    let mut load = Vec::with_capacity(modes.len());

    for mode in modes {
        let (rpm_lo, rpm_hi) = mode.rpm_range(variant);
        let (load_lo, load_hi) = mode.load_range();

        let rpm_dist = Normal::new((rpm_lo + rpm_hi) / 2.0, (rpm_hi - rpm_lo) / 4.0).unwrap();
        let load_dist = Normal::new((load_lo + load_hi) / 2.0, (load_hi - load_lo) / 4.0).unwrap();

        rpm.push(rpm_dist.sample(rng).clamp(rpm_lo, rpm_hi));
        load.push(load_dist.sample(rng).clamp(load_lo, load_hi));
    }

    let alpha = RPM_LOAD_SMOOTHING;
    for i in 1..modes.len() {
        rpm[i] = rpm[i - 1] + alpha * (rpm[i] - rpm[i - 1]);
        load[i] = load[i - 1] + alpha * (load[i] - load[i - 1]);
    }

    (rpm, load)
}

/// Seasonal plus daily ambient temperature model.
///
/// Seasonal peak near day 90 (mid-simulation summer), daily peak at 14:00.
#[derive(Debug, Clone)]
pub struct AmbientModel {
    pub mean: f64,
    pub seasonal_amp: f64,
    pub daily_amp: f64,
}

impl Default for AmbientModel {
    fn default() -> Self {
        Self {
            mean: AMBIENT_MEAN,
            seasonal_amp: AMBIENT_SEASONAL_AMP,
            daily_amp: AMBIENT_DAILY_AMP,
        }
    }
}

impl AmbientModel {
    /// Ambient temperature at a day index and second of day.
    pub fn temperature(&self, day_index: u32, second_of_day: u32) -> f64 {
        let seasonal =
            self.seasonal_amp * (2.0 * PI * (day_index as f64 - 90.0) / 365.0).cos();
        let day_fraction = second_of_day as f64 / 86_400.0;
        let daily = self.daily_amp * (2.0 * PI * (day_fraction - 14.0 / 24.0)).cos();
        self.mean + seasonal + daily
    }
}
