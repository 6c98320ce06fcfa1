// Fleetgen - Fault-effect library
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fault-effect library.
//!
//! Maps each fault mode's `(operating state, severity)` to the modifiers the
//! feature synthesizers consume. Concurrent faults compose with fixed rules:
//! energy-domain vibration effects multiply, shape-domain effects take the
//! maximum, thermal offsets add and are capped per sensor.
//!
//! FM-07 leak events never touch an RNG: occurrence is a pure hash of
//! `(truck_id, day_index, window_index, episode_id)`, so parallel workers
//! agree bit for bit.

use crate::constants::*;
use crate::degradation::{DegradationCurve, Stage};
use crate::faults::{FaultEpisode, FaultKind, VibSensor};
use xxhash_rust::xxh64::xxh64;

/// Frequency band slots. ACC-1/ACC-2 use `LOW..HIGH`; ACC-3 uses `LOW` and
/// `BROADBAND` (slot 1).
pub const BAND_LOW: usize = 0;
pub const BAND_MID_LOW: usize = 1;
pub const BAND_MID_HIGH: usize = 2;
pub const BAND_HIGH: usize = 3;
pub const BAND_BROADBAND: usize = 1;

/// Vibration modifier for one sensor.
#[derive(Debug, Clone)]
pub struct SensorModifier {
    /// Absolute RMS override (bearing stage targets); max across faults.
    pub rms_target: Option<f64>,
    /// Multiplicative RMS scale; multiplies across faults.
    pub energy_scale: f64,
    /// Multiplicative per-band energy scale; multiplies across faults.
    pub band_scale: [f64; 4],
    /// Additive kurtosis increase; max across faults.
    pub kurtosis_add: f64,
    /// Absolute kurtosis override; max across faults.
    pub kurtosis_target: Option<f64>,
    /// Absolute crest-factor override; max across faults.
    pub crest_target: Option<f64>,
    /// Absolute spectral-kurtosis override; max across faults.
    pub sk_target: Option<f64>,
    /// Band whose peak frequency locks onto the fault signature.
    pub peak_lock: Option<usize>,
}

impl Default for SensorModifier {
    fn default() -> Self {
        Self {
            rms_target: None,
            energy_scale: 1.0,
            band_scale: [1.0; 4],
            kurtosis_add: 0.0,
            kurtosis_target: None,
            crest_target: None,
            sk_target: None,
            peak_lock: None,
        }
    }
}

impl SensorModifier {
    /// True if this modifier leaves the sensor untouched.
    pub fn is_neutral(&self) -> bool {
        self.rms_target.is_none()
            && self.energy_scale == 1.0
            && self.band_scale == [1.0; 4]
            && self.kurtosis_add == 0.0
            && self.kurtosis_target.is_none()
            && self.crest_target.is_none()
            && self.sk_target.is_none()
            && self.peak_lock.is_none()
    }
}

/// Vibration modifiers for all three accelerometers.
#[derive(Debug, Clone, Default)]
pub struct VibrationModifier {
    pub sensors: [SensorModifier; 3],
}

impl VibrationModifier {
    pub fn sensor(&self, sensor: VibSensor) -> &SensorModifier {
        &self.sensors[sensor_slot(sensor)]
    }

    fn sensor_mut(&mut self, sensor: VibSensor) -> &mut SensorModifier {
        &mut self.sensors[sensor_slot(sensor)]
    }
}

fn sensor_slot(sensor: VibSensor) -> usize {
    match sensor {
        VibSensor::Acc1 => 0,
        VibSensor::Acc2 => 1,
        VibSensor::Acc3 => 2,
    }
}

/// Thermal offsets for T1..T6 plus the turbo efficiency-loss factor.
#[derive(Debug, Clone, Default)]
pub struct ThermalOffsets {
    /// Additive offsets per sensor, degrees C.
    pub offsets: [f64; 6],
    /// Turbo efficiency loss in [0, 1); shrinks the T3-T4 delta.
    pub turbo_factor: f64,
}

/// Combined per-window fault effects.
#[derive(Debug, Clone, Default)]
pub struct WindowModifiers {
    pub vibration: VibrationModifier,
    pub thermal: ThermalOffsets,
}

/// Identity of the window being synthesized; keys the leak-event hash.
#[derive(Debug, Clone, Copy)]
pub struct WindowContext {
    pub truck_id: u32,
    pub day_index: u32,
    pub window_index: u32,
    pub episode_id: u32,
    pub rpm: f64,
    pub load: f64,
}

/// Deterministic uniform draw in [0, 1) for FM-07 leak events.
pub fn leak_roll(ctx: &WindowContext) -> f64 {
    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&ctx.truck_id.to_le_bytes());
    bytes[4..8].copy_from_slice(&ctx.day_index.to_le_bytes());
    bytes[8..12].copy_from_slice(&ctx.window_index.to_le_bytes());
    bytes[12..16].copy_from_slice(&ctx.episode_id.to_le_bytes());
    let h = xxh64(&bytes, 0);
    // Top 53 bits map onto the f64 mantissa.
    (h >> 11) as f64 / (1u64 << 53) as f64
}

fn lerp(range: (f64, f64), frac: f64) -> f64 {
    range.0 + frac * (range.1 - range.0)
}

/// Compute one fault's effects at severity/stage for this window.
pub fn fault_effects(
    episode: &FaultEpisode,
    curve: &DegradationCurve,
    t_hours: f64,
    ctx: &WindowContext,
) -> WindowModifiers {
    let severity = episode.severity_at(curve, t_hours);
    let stage = episode.stage_at(curve, t_hours);
    let mut out = WindowModifiers::default();
    if severity <= 0.0 {
        return out;
    }
    let load = ctx.load;

    match &episode.kind {
        FaultKind::BearingWear { sensor } => {
            // Below stage 2 the signature sits inside the healthy envelope.
            if stage == Stage::Stage1 {
                return out;
            }
            let idx = (stage.rank() - 1) as usize;
            let frac = severity.min(1.0);
            let rms = lerp(BEARING_STAGE_RMS[idx], frac);
            let load_factor = 0.7 + 0.3 * load;

            let m = out.vibration.sensor_mut(*sensor);
            m.rms_target = Some(rms * load_factor);
            m.kurtosis_target = Some(lerp(BEARING_STAGE_KURTOSIS[idx], frac));
            m.sk_target = Some(lerp(BEARING_STAGE_SK[idx], frac));
            m.crest_target = Some(3.0);
            m.band_scale[BAND_MID_HIGH] *= 1.0 + severity * 10.0;
            m.peak_lock = Some(BAND_MID_HIGH);
        }

        FaultKind::CoolingLoss { delta_t1_max } => {
            out.thermal.offsets[0] += delta_t1_max * severity * (0.5 + 0.5 * load);
        }

        FaultKind::ValveTrainWear {
            energy_mult_max,
            kurtosis_inc_max,
        } => {
            for sensor in [VibSensor::Acc1, VibSensor::Acc2] {
                let m = out.vibration.sensor_mut(sensor);
                m.band_scale[BAND_MID_LOW] *= 1.0 + severity * energy_mult_max;
                m.kurtosis_add += severity * kurtosis_inc_max;
                m.energy_scale *= 1.0 + severity * 0.5;
            }
        }

        FaultKind::OilBreakdown { delta_t2_max } => {
            out.thermal.offsets[1] += delta_t2_max * severity * load;
        }

        FaultKind::TurboWear {
            efficiency_loss_max,
        } => {
            out.thermal.turbo_factor = severity * efficiency_loss_max;
            // Journal bearing noise shows up late.
            if stage >= Stage::Stage3 {
                let m = out.vibration.sensor_mut(VibSensor::Acc3);
                m.band_scale[BAND_BROADBAND] *= 1.0 + severity * 3.0;
                m.energy_scale *= 1.0 + severity * 1.5;
                m.peak_lock = Some(BAND_BROADBAND);
            }
        }

        FaultKind::InjectorWear { delta_t_full, .. } => {
            // Wear factor tops out around 0.22 of the full-failure penalty.
            let wear = severity * 0.22;
            out.thermal.offsets[2] += delta_t_full * wear;
            for sensor in [VibSensor::Acc1, VibSensor::Acc2] {
                let m = out.vibration.sensor_mut(sensor);
                m.band_scale[BAND_HIGH] *= 1.0 + severity * 5.0;
                m.energy_scale *= 1.0 + severity * 0.3;
                m.kurtosis_add += severity * 1.0;
            }
        }

        FaultKind::EgrCooler {
            delta_t5_max,
            leak_t1_spike,
            leak_t5_spike,
        } => {
            let fouling = severity * 0.4;
            out.thermal.offsets[4] += delta_t5_max * fouling;

            // Coolant leaks only once the cooler is badly fouled.
            if stage >= Stage::Stage3 {
                let p = (FM07_LEAK_RATE_PER_HOUR / 60.0) * severity;
                if leak_roll(ctx) < p {
                    out.thermal.offsets[0] += leak_t1_spike;
                    out.thermal.offsets[4] += leak_t5_spike;
                }
            }
        }

        FaultKind::DpfClogging {
            delta_t3_max,
            regen_interval_hours,
        } => {
            let dt = (t_hours - episode.onset_hours).max(0.0);
            let n_regens = (dt / regen_interval_hours) as i32;
            // Regens clear part of the soot but accumulation wins long-term.
            let cleared = severity * (1.0 - FM08_REGEN_CLEARANCE).powi(n_regens);
            let effective = cleared.max(severity * 0.5).min(severity);
            out.thermal.offsets[2] += delta_t3_max * effective;
        }
    }

    out
}

/// Compose concurrent fault effects under the per-family rules.
pub fn compose(mods: &[WindowModifiers]) -> WindowModifiers {
    let mut out = WindowModifiers::default();

    for m in mods {
        for (acc, sensor) in out
            .vibration
            .sensors
            .iter_mut()
            .zip(m.vibration.sensors.iter())
        {
            acc.energy_scale *= sensor.energy_scale;
            for (a, b) in acc.band_scale.iter_mut().zip(sensor.band_scale.iter()) {
                *a *= b;
            }
            acc.rms_target = max_option(acc.rms_target, sensor.rms_target);
            acc.kurtosis_add = acc.kurtosis_add.max(sensor.kurtosis_add);
            acc.kurtosis_target = max_option(acc.kurtosis_target, sensor.kurtosis_target);
            acc.crest_target = max_option(acc.crest_target, sensor.crest_target);
            acc.sk_target = max_option(acc.sk_target, sensor.sk_target);
            acc.peak_lock = acc.peak_lock.or(sensor.peak_lock);
        }

        for (a, b) in out.thermal.offsets.iter_mut().zip(m.thermal.offsets.iter()) {
            *a += b;
        }
        out.thermal.turbo_factor = out.thermal.turbo_factor.max(m.thermal.turbo_factor);
    }

    for (offset, cap) in out.thermal.offsets.iter_mut().zip(MAX_THERMAL_OFFSET.iter()) {
        *offset = offset.clamp(-cap, *cap);
    }

    out
}

fn max_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
