//! Feature vector assembly.
//!
//! Owns the canonical 221-column feature order: 2 conditioning + 180
//! vibration + 39 thermal. Column names and order are an external contract;
//! the assembler enforces the exact length and the column table is built
//! once and checked at first use.

use crate::constants::{
    ACC12_BANDS, ACC3_BANDS, LOAD_PROXY_T3_MODERN, LOAD_PROXY_T3_OLDER, RPM_EST_REL_NOISE,
    TEMP_SENSOR_NAMES,
};
use crate::error::SchemaError;
use crate::fleet::EngineVariant;
use crate::thermal::THERMAL_FEATURE_COUNT;
use crate::vibration::VIBRATION_FEATURE_COUNT;
use lazy_static::lazy_static;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

/// Contractual feature count.
pub const FEATURE_COUNT: usize = 221;

/// Conditioning column names.
pub const CONDITIONING_COLUMNS: [&str; 2] = ["rpm_est", "load_proxy"];

const AXES: [&str; 3] = ["x", "y", "z"];
const SENSORS: [&str; 3] = ["acc1", "acc2", "acc3"];

fn vibration_columns() -> Vec<String> {
    let mut cols = Vec::with_capacity(VIBRATION_FEATURE_COUNT);
    for (slot, sensor) in SENSORS.iter().enumerate() {
        let bands: Vec<&str> = if slot == 2 {
            ACC3_BANDS.iter().map(|(name, _)| *name).collect()
        } else {
            ACC12_BANDS.iter().map(|(name, _)| *name).collect()
        };
        for axis in AXES {
            cols.push(format!("{}_rms_{}_mean", sensor, axis));
            cols.push(format!("{}_rms_{}_std", sensor, axis));
            cols.push(format!("{}_peak_{}_mean", sensor, axis));
            cols.push(format!("{}_crest_factor_{}_mean", sensor, axis));
            cols.push(format!("{}_kurtosis_{}_mean", sensor, axis));
            cols.push(format!("{}_kurtosis_{}_max", sensor, axis));
            for band in &bands {
                cols.push(format!("{}_band_{}_energy_{}_mean", sensor, band, axis));
                cols.push(format!("{}_band_{}_energy_{}_std", sensor, band, axis));
                cols.push(format!("{}_band_{}_peak_freq_{}_mean", sensor, band, axis));
                cols.push(format!("{}_band_{}_centroid_{}_mean", sensor, band, axis));
            }
        }
        cols.push(format!("{}_sk_max_value", sensor));
        cols.push(format!("{}_sk_max_freq", sensor));
    }
    cols
}

fn thermal_columns() -> Vec<String> {
    let mut cols = Vec::with_capacity(THERMAL_FEATURE_COUNT);
    for sensor in TEMP_SENSOR_NAMES {
        for stat in ["mean", "std", "max", "min", "range", "slope"] {
            cols.push(format!("{}_{}", sensor, stat));
        }
    }
    cols.push("t3_t4_delta".to_string());
    cols.push("t1_t5_delta".to_string());
    cols.push("t3_exceedance_duration".to_string());
    cols
}

lazy_static! {
    /// Canonical feature column names: conditioning, vibration, thermal.
    pub static ref FEATURE_COLUMNS: Vec<String> = {
        let mut cols: Vec<String> = CONDITIONING_COLUMNS.iter().map(|s| s.to_string()).collect();
        cols.extend(vibration_columns());
        cols.extend(thermal_columns());
        assert_eq!(
            cols.len(),
            FEATURE_COUNT,
            "canonical column table drifted from the 221-feature contract"
        );
        cols
    };
}

/// The two conditioning features.
///
/// `rpm_est` models a vibration-derived tachometer with ~3 % relative error;
/// `load_proxy` reads load off the window's mean T3 against the variant's
/// idle/cruise anchors.
pub fn conditioning_features(
    rpm: f64,
    t3_mean: f64,
    variant: EngineVariant,
    rng: &mut impl Rng,
) -> [f64; 2] {
    let noise = Normal::new(0.0, rpm * RPM_EST_REL_NOISE).unwrap();
    let rpm_est = rpm + noise.sample(rng);

    let (t3_idle, t3_cruise) = match variant {
        EngineVariant::Modern => LOAD_PROXY_T3_MODERN,
        EngineVariant::Older => LOAD_PROXY_T3_OLDER,
    };
    let load_proxy = (t3_mean - t3_idle) / (t3_cruise - t3_idle);

    [rpm_est, load_proxy]
}

/// Assemble the full feature vector in canonical order, enforcing the
/// 221-length contract.
pub fn assemble(
    conditioning: [f64; 2],
    vibration: Vec<f64>,
    thermal: Vec<f64>,
) -> Result<Vec<f64>, SchemaError> {
    let mut features = Vec::with_capacity(FEATURE_COUNT);
    features.extend_from_slice(&conditioning);
    features.extend(vibration);
    features.extend(thermal);

    if features.len() != FEATURE_COUNT {
        return Err(SchemaError::FeatureCount {
            expected: FEATURE_COUNT,
            actual: features.len(),
        });
    }
    Ok(features)
}
