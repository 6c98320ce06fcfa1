// Fleetgen - Vibration synthesizer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Vibration feature synthesizer.
//!
//! Synthesizes the 180 vibration features of one window directly at the
//! feature level: time-domain statistics per sensor axis, band energies with
//! peak frequency and centroid, and per-sensor spectral kurtosis. Fault
//! modifiers shape the output; the white-noise floor depends on the engine
//! variant. Values are emitted in the canonical column order defined by the
//! feature assembler.

use crate::constants::*;
use crate::effects::{SensorModifier, VibrationModifier};
use crate::fleet::EngineVariant;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

/// Number of vibration features per window.
pub const VIBRATION_FEATURE_COUNT: usize = 180;

struct SensorLayout {
    rms_range: (f64, f64),
    bands: &'static [(&'static str, (f64, f64))],
    sub_windows: usize,
    is_turbo: bool,
}

fn sensor_layout(slot: usize) -> SensorLayout {
    SensorLayout {
        rms_range: HEALTHY_RMS[slot],
        bands: if slot == 2 { &ACC3_BANDS } else { &ACC12_BANDS },
        sub_windows: if slot == 2 {
            SUB_WINDOWS_ACC3
        } else {
            SUB_WINDOWS_ACC12
        },
        is_turbo: slot == 2,
    }
}

/// Synthesize all 180 vibration features for one window.
pub fn synthesize(
    variant: EngineVariant,
    modifier: &VibrationModifier,
    load: f64,
    rng: &mut impl Rng,
) -> Vec<f64> {
    let noise = variant.noise_fraction();
    let mut out = Vec::with_capacity(VIBRATION_FEATURE_COUNT);

    for slot in 0..3 {
        synthesize_sensor(
            &sensor_layout(slot),
            &modifier.sensors[slot],
            load,
            noise,
            rng,
            &mut out,
        );
    }

    out
}

fn synthesize_sensor(
    layout: &SensorLayout,
    modifier: &SensorModifier,
    load: f64,
    noise: f64,
    rng: &mut impl Rng,
    out: &mut Vec<f64>,
) {
    let jitter = Normal::new(0.0, 1.0).unwrap();
    let draw = |mean: f64, std: f64, rng: &mut dyn RngCore| mean + std * jitter.sample(rng);

    // Base RMS scales with load; fault overrides replace it outright and
    // energy scaling multiplies on top.
    let (rms_lo, rms_hi) = layout.rms_range;
    let rms_base = rng.gen_range(rms_lo..rms_hi) * (0.7 + 0.3 * load);
    let rms_faulted = modifier.rms_target.unwrap_or(rms_base) * modifier.energy_scale;

    for _axis in 0..3 {
        let rms = (rms_faulted * (1.0 + draw(0.0, 0.05, rng))).max(0.001);

        let kurt_base = HEALTHY_KURTOSIS + draw(0.0, 0.2, rng);
        let kurtosis =
            (modifier.kurtosis_target.unwrap_or(kurt_base) + modifier.kurtosis_add).max(2.0);

        let crest = modifier
            .crest_target
            .unwrap_or_else(|| rng.gen_range(HEALTHY_CREST.0..HEALTHY_CREST.1));
        let peak = rms * crest;

        out.push(rms * (1.0 + draw(0.0, noise * 0.3, rng)));
        out.push(rms * draw(0.05, 0.02, rng).abs());
        out.push(peak * (1.0 + draw(0.0, noise, rng)));
        out.push(crest * (1.0 + draw(0.0, noise * 0.5, rng)));
        out.push(kurtosis * (1.0 + draw(0.0, noise * 0.3, rng)));
        // Max over thousands of short windows runs above the mean.
        out.push(
            kurtosis * (1.0 + 0.15 * (layout.sub_windows as f64).ln() * rng.gen_range(0.5..1.5)),
        );

        let total_energy = rms * rms;
        for (band_slot, (_, (f_lo, f_hi))) in layout.bands.iter().enumerate() {
            let bandwidth = f_hi - f_lo;
            let center = (f_lo + f_hi) / 2.0;
            // Roughly 1/f distribution of healthy energy across bands.
            let base_fraction = 1.0 / (1.0 + center / 1000.0);
            let band_energy =
                (total_energy * base_fraction * modifier.band_scale[band_slot]).max(1e-8);
            let density = band_energy / bandwidth;

            out.push(density * (1.0 + draw(0.0, noise, rng)));
            out.push(density * draw(0.1, 0.03, rng).abs());

            let peak_freq = if modifier.peak_lock == Some(band_slot) {
                // Fault signature pins the band peak.
                f_lo + bandwidth * 0.4
            } else {
                rng.gen_range(f_lo + bandwidth * 0.2..f_hi - bandwidth * 0.2)
            };
            out.push(peak_freq);

            let centroid = (center + draw(0.0, bandwidth * 0.05, rng)).clamp(*f_lo, *f_hi);
            out.push(centroid);
        }
    }

    let sk_base = rng.gen_range(1.0..5.0);
    let sk = modifier.sk_target.unwrap_or(sk_base);
    out.push(sk * (1.0 + draw(0.0, noise, rng)));

    let sk_freq = match modifier.peak_lock {
        None => rng.gen_range(500.0..5000.0),
        Some(_) if layout.is_turbo => rng.gen_range(1000.0..5000.0),
        Some(_) => rng.gen_range(2000.0..10000.0),
    };
    out.push(sk_freq);
}

/// Column index of a sensor's SK max value inside the vibration block:
/// ACC-1/ACC-2 contribute 68 columns each, ACC-3 contributes 44.
pub fn sk_value_index(sensor_slot: usize) -> usize {
    match sensor_slot {
        0 => 66,
        1 => 134,
        _ => 178,
    }
}
