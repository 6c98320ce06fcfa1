// Fleetgen - Degradation model
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fault severity progression.
//!
//! Severity follows a logistic growth curve from 0 to 1 over the fault's
//! total life, with bounded mean-reverting noise on top. The noise path is
//! precomputed at hourly resolution from the fault's own seed and then
//! prefix-maxed, so severity is monotone non-decreasing no matter where it
//! is sampled. A plain Wiener process was tried first and rejected: the
//! noise dominated the trend.

use crate::constants::{LOGISTIC_STEEPNESS, STAGE_THRESHOLDS};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Degradation stage derived from severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Stage1,
    Stage2,
    Stage3,
    Stage4,
}

impl Stage {
    /// Ordinal rank, 1..4.
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Stage1 => 1,
            Stage::Stage2 => 2,
            Stage::Stage3 => 3,
            Stage::Stage4 => 4,
        }
    }

    /// Severity label string for the output schema.
    pub fn severity_label(&self) -> &'static str {
        match self {
            Stage::Stage1 => "STAGE1",
            Stage::Stage2 => "STAGE2",
            Stage::Stage3 => "STAGE3",
            Stage::Stage4 => "STAGE4",
        }
    }
}

/// Map severity to its stage. Thresholds 0.60 / 0.75 / 0.95.
pub fn stage_for_severity(severity: f64) -> Stage {
    if severity < STAGE_THRESHOLDS[0] {
        Stage::Stage1
    } else if severity < STAGE_THRESHOLDS[1] {
        Stage::Stage2
    } else if severity < STAGE_THRESHOLDS[2] {
        Stage::Stage3
    } else {
        Stage::Stage4
    }
}

/// Precomputed severity trajectory for one fault.
///
/// The path holds one severity value per hour since onset; queries
/// interpolate linearly between hours. Rebuilding from the same
/// `(total_life, sigma, seed)` triple reproduces the path exactly, which is
/// what lets fault state cross day and process boundaries as plain data.
#[derive(Debug, Clone)]
pub struct DegradationCurve {
    total_life_hours: f64,
    path: Vec<f64>,
}

impl DegradationCurve {
    /// Build the hourly severity path.
    pub fn new(total_life_hours: f64, sigma: f64, seed: u64) -> Self {
        let n = (total_life_hours.max(1.0) as usize) + 2;
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();

        // Mean-reverting noise path, pulled back toward zero each hour.
        let mut noise = vec![0.0f64; n];
        for i in 1..n {
            noise[i] = 0.95 * noise[i - 1] + normal.sample(&mut rng);
        }
        let max_abs = noise
            .iter()
            .fold(1e-8f64, |acc, v| acc.max(v.abs()));

        let k = LOGISTIC_STEEPNESS;
        let denom = k.exp() - 1.0;
        let mut path = vec![0.0f64; n];
        let mut running_max = 0.0f64;
        for (i, slot) in path.iter_mut().enumerate() {
            let t_frac = (i as f64 / total_life_hours).min(1.0);
            let base = ((k * t_frac).exp() - 1.0) / denom;
            let noisy = base + sigma * (noise[i] / max_abs) * base * 0.5;
            running_max = running_max.max(noisy.clamp(0.0, 1.0));
            *slot = running_max;
        }

        Self {
            total_life_hours,
            path,
        }
    }

    /// Severity at `hours` since onset, in [0, 1].
    pub fn severity_at(&self, hours: f64) -> f64 {
        if hours <= 0.0 {
            return 0.0;
        }
        if hours >= self.total_life_hours {
            return 1.0;
        }
        let idx = hours as usize;
        let frac = hours - idx as f64;
        if idx + 1 >= self.path.len() {
            return *self.path.last().unwrap_or(&1.0);
        }
        self.path[idx] + frac * (self.path[idx + 1] - self.path[idx])
    }

    /// Total life span in hours.
    pub fn total_life_hours(&self) -> f64 {
        self.total_life_hours
    }
}

/// Severity under a monitor-improve trajectory: exponential decay from the
/// value at decision time.
pub fn improving_severity(severity_at_decision: f64, hours_since_decision: f64, tau_hours: f64) -> f64 {
    if hours_since_decision <= 0.0 {
        return severity_at_decision;
    }
    severity_at_decision * (-hours_since_decision / tau_hours).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_thresholds() {
        assert_eq!(stage_for_severity(0.0), Stage::Stage1);
        assert_eq!(stage_for_severity(0.59), Stage::Stage1);
        assert_eq!(stage_for_severity(0.60), Stage::Stage2);
        assert_eq!(stage_for_severity(0.75), Stage::Stage3);
        assert_eq!(stage_for_severity(0.94), Stage::Stage3);
        assert_eq!(stage_for_severity(0.95), Stage::Stage4);
        assert_eq!(stage_for_severity(1.0), Stage::Stage4);
    }

    #[test]
    fn test_stage_rank_order() {
        assert!(Stage::Stage1 < Stage::Stage2);
        assert!(Stage::Stage3 < Stage::Stage4);
        assert_eq!(Stage::Stage2.rank(), 2);
        assert_eq!(Stage::Stage4.severity_label(), "STAGE4");
    }

    #[test]
    fn test_curve_endpoints() {
        let curve = DegradationCurve::new(500.0, 0.1, 7);
        assert_eq!(curve.severity_at(-10.0), 0.0);
        assert_eq!(curve.severity_at(0.0), 0.0);
        assert_eq!(curve.severity_at(500.0), 1.0);
        assert_eq!(curve.severity_at(10_000.0), 1.0);
    }

    #[test]
    fn test_curve_monotone() {
        let curve = DegradationCurve::new(800.0, 0.2, 99);
        let mut prev = 0.0;
        for i in 0..1600 {
            let s = curve.severity_at(i as f64 * 0.5);
            assert!(s >= prev - 1e-12, "severity dipped at {}h: {} < {}", i, s, prev);
            assert!((0.0..=1.0).contains(&s));
            prev = s;
        }
    }

    #[test]
    fn test_curve_reproducible() {
        let a = DegradationCurve::new(300.0, 0.15, 12345);
        let b = DegradationCurve::new(300.0, 0.15, 12345);
        for i in 0..300 {
            assert_eq!(a.severity_at(i as f64), b.severity_at(i as f64));
        }
    }

    #[test]
    fn test_logistic_accelerates_late() {
        let curve = DegradationCurve::new(1000.0, 0.0, 1);
        // With k=5 the first half of life stays below the stage-2 threshold
        // and the last tenth climbs steeply.
        assert!(curve.severity_at(500.0) < 0.60);
        assert!(curve.severity_at(950.0) > curve.severity_at(500.0) + 0.3);
    }

    #[test]
    fn test_improving_decay() {
        let s0 = 0.7;
        // One time constant decays to ~37%.
        let s = improving_severity(s0, 300.0, 300.0);
        assert!((s - s0 * (-1.0f64).exp()).abs() < 1e-12);
        // 1500h at tau=300 is five time constants: below resolution threshold.
        assert!(improving_severity(s0, 1500.0, 300.0) < 0.01);
    }
}
