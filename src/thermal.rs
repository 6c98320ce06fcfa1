// Fleetgen - Thermal model
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Six-sensor thermal model.
//!
//! Each sensor follows a discrete first-order lag toward a load- and
//! ambient-dependent target, stepped at one-second resolution inside every
//! window. Fault offsets shift the target; the turbo efficiency factor
//! narrows the T3-T4 delta after the fact. End-of-day temperatures persist
//! across days as a small JSON record.

use crate::constants::*;
use crate::effects::ThermalOffsets;
use crate::fleet::{ThermalBaseline, TruckDescriptor};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Number of thermal features emitted per window: 6 stats x 6 sensors
/// plus 3 differentials.
pub const THERMAL_FEATURE_COUNT: usize = 39;

/// End-of-day thermal state, persisted per `(truck_id, day_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalState {
    pub truck_id: u32,
    pub day_index: u32,
    /// Unix seconds of the end of the day.
    pub timestamp: i64,
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
    pub t4: f64,
    pub t5: f64,
    pub t6: f64,
}

impl ThermalState {
    /// Pack into the array form the model works with.
    pub fn temps(&self) -> [f64; 6] {
        [self.t1, self.t2, self.t3, self.t4, self.t5, self.t6]
    }

    /// Build from an array of temperatures.
    pub fn from_temps(truck_id: u32, day_index: u32, timestamp: i64, temps: [f64; 6]) -> Self {
        Self {
            truck_id,
            day_index,
            timestamp,
            t1: temps[0],
            t2: temps[1],
            t3: temps[2],
            t4: temps[3],
            t5: temps[4],
            t6: temps[5],
        }
    }
}

/// Fresh idle temperatures for a truck at a given ambient: the truck's own
/// sampled idle baselines plus the ambient coupling term. Used on day 0,
/// after a repair, and when a prior state record is missing.
pub fn idle_temps(truck: &TruckDescriptor, ambient: f64) -> [f64; 6] {
    let mut temps = [0.0; 6];
    for (t, b) in temps.iter_mut().zip(truck.baselines.iter()) {
        *t = b.idle + AMBIENT_COUPLING * (ambient - AMBIENT_T_REF);
    }
    temps
}

/// Statistics for the 39 thermal features of one window, in canonical
/// column order.
#[derive(Debug, Clone)]
pub struct ThermalWindow {
    /// Per sensor: mean, std, max, min, range, slope.
    pub stats: [[f64; 6]; 6],
    pub t3_t4_delta: f64,
    pub t1_t5_delta: f64,
    pub t3_exceedance_duration: f64,
}

impl ThermalWindow {
    /// Flatten into canonical column order.
    pub fn feature_values(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(THERMAL_FEATURE_COUNT);
        for sensor in &self.stats {
            out.extend_from_slice(sensor);
        }
        out.push(self.t3_t4_delta);
        out.push(self.t1_t5_delta);
        out.push(self.t3_exceedance_duration);
        out
    }

    /// Mean T3 for the window (drives the load proxy).
    pub fn t3_mean(&self) -> f64 {
        self.stats[2][0]
    }
}

fn target_temperature(baseline: &ThermalBaseline, load: f64, ambient: f64) -> f64 {
    baseline.idle + baseline.delta_load * load + AMBIENT_COUPLING * (ambient - AMBIENT_T_REF)
}

/// Advance all six sensors through one 60-second window.
///
/// `temps` is updated in place to the end-of-window state.
pub fn advance_window(
    temps: &mut [f64; 6],
    truck: &TruckDescriptor,
    load: f64,
    ambient: f64,
    offsets: &ThermalOffsets,
    rng: &mut impl Rng,
) -> ThermalWindow {
    let noise = Normal::new(0.0, THERMAL_NOISE_STD).unwrap();
    let mut traces = [[0.0f64; 60]; 6];

    for (i, baseline) in truck.baselines.iter().enumerate() {
        let target = target_temperature(baseline, load, ambient) + offsets.offsets[i];
        let (lo, hi) = TEMP_BOUNDS[i];
        let mut current = temps[i];
        for slot in traces[i].iter_mut() {
            current += (target - current) / baseline.tau;
            current += noise.sample(rng);
            current = current.clamp(lo, hi);
            *slot = current;
        }
        temps[i] = current;
    }

    // Turbo degradation: less heat extracted across the turbine, so T4
    // creeps toward T3 and the delta shrinks.
    if offsets.turbo_factor > 0.0 {
        let t3_mean: f64 = traces[2].iter().sum::<f64>() / 60.0;
        let t4_mean: f64 = traces[3].iter().sum::<f64>() / 60.0;
        let delta = t3_mean - t4_mean;
        if delta > 0.0 {
            let rise = delta * offsets.turbo_factor;
            let (lo, hi) = TEMP_BOUNDS[3];
            for v in traces[3].iter_mut() {
                *v = (*v + rise).clamp(lo, hi);
            }
            temps[3] = traces[3][59];
        }
    }

    let mut stats = [[0.0f64; 6]; 6];
    for (i, trace) in traces.iter().enumerate() {
        stats[i] = trace_stats(trace);
    }

    let exceedance = traces[2]
        .iter()
        .filter(|t| **t > T3_EXCEEDANCE_THRESHOLD)
        .count() as f64;

    ThermalWindow {
        stats,
        t3_t4_delta: stats[2][0] - stats[3][0],
        t1_t5_delta: stats[0][0] - stats[4][0],
        t3_exceedance_duration: exceedance,
    }
}

/// Mean, std, max, min, range and least-squares slope of one trace.
fn trace_stats(trace: &[f64; 60]) -> [f64; 6] {
    let n = trace.len() as f64;
    let mean = trace.iter().sum::<f64>() / n;
    let variance = trace.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let max = trace.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = trace.iter().cloned().fold(f64::INFINITY, f64::min);

    // Least-squares slope over x = 0..59; denominator is sum((x - mean_x)^2).
    let mean_x = (n - 1.0) / 2.0;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in trace.iter().enumerate() {
        let dx = x as f64 - mean_x;
        num += dx * (y - mean);
        den += dx * dx;
    }
    let slope = num / den;

    [mean, variance.sqrt(), max, min, max - min, slope]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::fleet::Fleet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_truck() -> TruckDescriptor {
        Fleet::build(&GeneratorConfig::default().with_trucks(5))
            .unwrap()
            .truck(1)
            .unwrap()
            .clone()
    }

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_idle_temps_track_baselines() {
        let truck = test_truck();
        let temps = idle_temps(&truck, AMBIENT_T_REF);
        for (t, b) in temps.iter().zip(truck.baselines.iter()) {
            assert_eq!(*t, b.idle);
        }
        // Colder ambient shifts every sensor down.
        let cold = idle_temps(&truck, AMBIENT_T_REF - 20.0);
        for (c, t) in cold.iter().zip(temps.iter()) {
            assert!((t - c - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_temps_rise_under_load() {
        let truck = test_truck();
        let mut rng = test_rng();
        let mut temps = idle_temps(&truck, 15.0);
        let start_t3 = temps[2];

        // An hour at high load pulls T3 toward its loaded target.
        for _ in 0..60 {
            advance_window(
                &mut temps,
                &truck,
                0.9,
                15.0,
                &ThermalOffsets::default(),
                &mut rng,
            );
        }
        assert!(temps[2] > start_t3 + 50.0, "T3 {} -> {}", start_t3, temps[2]);
    }

    #[test]
    fn test_temps_clamped_to_bounds() {
        let truck = test_truck();
        let mut rng = test_rng();
        let mut temps = idle_temps(&truck, 15.0);
        let mut offsets = ThermalOffsets::default();
        offsets.offsets = [500.0, 500.0, 500.0, 500.0, 500.0, 500.0];

        for _ in 0..240 {
            let window = advance_window(&mut temps, &truck, 1.2, 40.0, &offsets, &mut rng);
            for (i, stats) in window.stats.iter().enumerate() {
                assert!(stats[2] <= TEMP_BOUNDS[i].1 + 1e-9);
                assert!(stats[3] >= TEMP_BOUNDS[i].0 - 1e-9);
            }
        }
    }

    #[test]
    fn test_turbo_factor_narrows_delta() {
        let truck = test_truck();

        // Warm the engine up at cruise load first.
        let mut warm = idle_temps(&truck, 15.0);
        let mut rng = test_rng();
        for _ in 0..120 {
            advance_window(&mut warm, &truck, 0.8, 15.0, &ThermalOffsets::default(), &mut rng);
        }

        let mut healthy_temps = warm;
        let mut degraded_temps = warm;
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);

        let healthy = advance_window(
            &mut healthy_temps,
            &truck,
            0.8,
            15.0,
            &ThermalOffsets::default(),
            &mut rng_a,
        );
        let mut offsets = ThermalOffsets::default();
        offsets.turbo_factor = 0.3;
        let degraded = advance_window(&mut degraded_temps, &truck, 0.8, 15.0, &offsets, &mut rng_b);

        assert!(degraded.t3_t4_delta < healthy.t3_t4_delta);
    }

    #[test]
    fn test_window_feature_order() {
        let truck = test_truck();
        let mut rng = test_rng();
        let mut temps = idle_temps(&truck, 15.0);
        let window = advance_window(
            &mut temps,
            &truck,
            0.5,
            15.0,
            &ThermalOffsets::default(),
            &mut rng,
        );
        let values = window.feature_values();
        assert_eq!(values.len(), THERMAL_FEATURE_COUNT);
        // First six values are the T1 stats; range = max - min.
        assert!((values[4] - (values[2] - values[3])).abs() < 1e-12);
        // Differentials sit at the tail.
        assert_eq!(values[36], window.t3_t4_delta);
        assert_eq!(values[38], window.t3_exceedance_duration);
    }

    #[test]
    fn test_state_roundtrip() {
        let state = ThermalState::from_temps(17, 3, 123456, [60.0, 70.0, 180.0, 110.0, 90.0, 35.0]);
        let json = serde_json::to_string(&state).unwrap();
        let back: ThermalState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.temps()[2], 180.0);
    }
}
