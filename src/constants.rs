// Fleetgen - Contract constants
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fixed numeric contract values.
//!
//! Every tuned number in the simulation lives here: the duty-cycle
//! transition matrix, per-mode RPM/load ranges, thermal baselines and
//! physical bounds, vibration bands, degradation parameter tables and the
//! maintenance probabilities. Components read these tables instead of
//! carrying per-site literals, so the contract can be audited in one place.

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Simulation dimensions
// ---------------------------------------------------------------------------

/// 60-second observation windows per simulated day.
pub const WINDOWS_PER_DAY: usize = 1440;

/// Seconds covered by one feature window.
pub const SECONDS_PER_WINDOW: i64 = 60;

/// Engine hours accrued per operating day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Default fleet size.
pub const FLEET_SIZE: usize = 200;

/// Default simulation horizon in days.
pub const SIMULATION_DAYS: u32 = 183;

/// Simulation epoch: 2025-01-01T00:00:00Z as unix seconds. All row
/// timestamps derive from this; wall clock never enters a numeric path.
pub const SIM_EPOCH_UNIX: i64 = 1_735_689_600;

/// Prior probability that a truck carries the modern engine variant.
pub const MODERN_PRIOR: f64 = 0.80;

/// Prior over the number of initial faults per truck (0, 1, 2, 3).
pub const FAULT_COUNT_PRIOR: [f64; 4] = [0.30, 0.40, 0.20, 0.10];

/// Initial fault onsets are drawn from the first half of the horizon.
pub const ONSET_WINDOW_FRACTION: f64 = 0.5;

/// Train/val/test split sizes for the default 200-truck fleet; other fleet
/// sizes split proportionally to these ratios.
pub const SPLIT_RATIOS: (usize, usize, usize) = (120, 50, 30);

// ---------------------------------------------------------------------------
// Duty cycle
// ---------------------------------------------------------------------------

/// Markov transition matrix over operating modes.
/// Rows are from-states, columns to-states, order: idle, city, cruise, heavy.
pub const TRANSITION_MATRIX: [[f64; 4]; 4] = [
    [0.70, 0.25, 0.04, 0.01], // from idle
    [0.10, 0.60, 0.25, 0.05], // from city
    [0.02, 0.15, 0.75, 0.08], // from cruise
    [0.05, 0.20, 0.70, 0.05], // from heavy
];

/// RPM ranges per mode, (modern, older). Order: idle, city, cruise, heavy.
pub const RPM_RANGES: [((f64, f64), (f64, f64)); 4] = [
    ((600.0, 800.0), (600.0, 800.0)),
    ((1000.0, 1400.0), (1000.0, 1400.0)),
    ((1400.0, 1550.0), (1500.0, 1700.0)),
    ((1600.0, 2100.0), (1600.0, 2100.0)),
];

/// Normalized load ranges per mode. Order: idle, city, cruise, heavy.
pub const LOAD_RANGES: [(f64, f64); 4] = [(0.0, 0.1), (0.2, 0.5), (0.6, 0.9), (0.9, 1.2)];

/// First-order smoothing coefficient for RPM/load between windows
/// (effective time constant of ~5 minutes).
pub const RPM_LOAD_SMOOTHING: f64 = 0.2;

// ---------------------------------------------------------------------------
// Ambient temperature model
// ---------------------------------------------------------------------------

/// Annual mean ambient temperature (temperate climate), degrees C.
pub const AMBIENT_MEAN: f64 = 15.0;

/// Seasonal sinusoid amplitude, degrees C.
pub const AMBIENT_SEASONAL_AMP: f64 = 15.0;

/// Daily sinusoid amplitude, degrees C.
pub const AMBIENT_DAILY_AMP: f64 = 5.0;

/// Reference ambient for the thermal coupling term, degrees C.
pub const AMBIENT_T_REF: f64 = 25.0;

/// Fraction of ambient deviation coupled into sensor targets.
pub const AMBIENT_COUPLING: f64 = 0.5;

// ---------------------------------------------------------------------------
// Thermal sensors
// ---------------------------------------------------------------------------

/// Number of temperature sensors (T1 coolant, T2 oil, T3 EGT pre-turbo,
/// T4 EGT post-turbo, T5 EGR cooler outlet, T6 intake manifold).
pub const TEMP_SENSOR_COUNT: usize = 6;

/// Sensor column prefixes in canonical order.
pub const TEMP_SENSOR_NAMES: [&str; 6] = ["t1", "t2", "t3", "t4", "t5", "t6"];

/// Physical measurement bounds per sensor, degrees C.
pub const TEMP_BOUNDS: [(f64, f64); 6] = [
    (0.0, 120.0),
    (0.0, 150.0),
    (0.0, 900.0),
    (0.0, 700.0),
    (0.0, 600.0),
    (0.0, 200.0),
];

/// Maximum total offset from stacked faults per sensor, degrees C. Combined
/// fault effects beyond this are non-physical and get clipped.
pub const MAX_THERMAL_OFFSET: [f64; 6] = [50.0, 50.0, 250.0, 200.0, 100.0, 30.0];

/// Sensor noise standard deviation, degrees C.
pub const THERMAL_NOISE_STD: f64 = 1.0;

/// T3 level above which exceedance seconds are counted.
pub const T3_EXCEEDANCE_THRESHOLD: f64 = 677.0;

/// Sampling ranges for one per-sensor thermal baseline.
#[derive(Debug, Clone, Copy)]
pub struct BaselineRanges {
    /// Idle temperature range, degrees C.
    pub idle: (f64, f64),
    /// Load coefficient range (idle-to-cruise rise), degrees C. Sampled
    /// directly, never derived from a cruise value.
    pub delta_load: (f64, f64),
    /// Thermal time constant range, seconds.
    pub tau: (f64, f64),
}

/// Thermal baseline sampling ranges, modern variant, T1..T6.
pub const THERMAL_BASELINES_MODERN: [BaselineRanges; 6] = [
    BaselineRanges { idle: (60.0, 70.0), delta_load: (25.0, 35.0), tau: (60.0, 120.0) },
    BaselineRanges { idle: (70.0, 80.0), delta_load: (25.0, 40.0), tau: (90.0, 180.0) },
    BaselineRanges { idle: (150.0, 200.0), delta_load: (240.0, 350.0), tau: (15.0, 30.0) },
    BaselineRanges { idle: (100.0, 130.0), delta_load: (5.0, 30.0), tau: (20.0, 40.0) },
    BaselineRanges { idle: (80.0, 100.0), delta_load: (70.0, 180.0), tau: (30.0, 60.0) },
    BaselineRanges { idle: (30.0, 40.0), delta_load: (20.0, 50.0), tau: (10.0, 20.0) },
];

/// Thermal baseline sampling ranges, older variant, T1..T6.
pub const THERMAL_BASELINES_OLDER: [BaselineRanges; 6] = [
    BaselineRanges { idle: (65.0, 75.0), delta_load: (25.0, 35.0), tau: (60.0, 120.0) },
    BaselineRanges { idle: (80.0, 90.0), delta_load: (25.0, 40.0), tau: (90.0, 180.0) },
    BaselineRanges { idle: (160.0, 210.0), delta_load: (240.0, 350.0), tau: (15.0, 30.0) },
    BaselineRanges { idle: (110.0, 140.0), delta_load: (5.0, 30.0), tau: (20.0, 40.0) },
    BaselineRanges { idle: (90.0, 110.0), delta_load: (70.0, 180.0), tau: (30.0, 60.0) },
    BaselineRanges { idle: (35.0, 45.0), delta_load: (20.0, 50.0), tau: (10.0, 20.0) },
];

// ---------------------------------------------------------------------------
// Vibration sensors and bands
// ---------------------------------------------------------------------------

/// Frequency bands for ACC-1/ACC-2 (50 kHz accelerometers), Hz.
pub const ACC12_BANDS: [(&str, (f64, f64)); 4] = [
    ("low", (0.0, 500.0)),          // shaft imbalance, misalignment
    ("mid_low", (500.0, 2000.0)),   // valve train
    ("mid_high", (2000.0, 10000.0)), // bearing faults
    ("high", (10000.0, 25000.0)),   // injector faults
];

/// Frequency bands for ACC-3 (10 kHz turbo accelerometer), Hz.
pub const ACC3_BANDS: [(&str, (f64, f64)); 2] = [
    ("low", (0.0, 1000.0)),
    ("broadband", (1000.0, 5000.0)), // turbo journal bearing
];

/// Short-window count inside one 60 s aggregation period, ACC-1/ACC-2.
pub const SUB_WINDOWS_ACC12: usize = 2929;

/// Short-window count inside one 60 s aggregation period, ACC-3.
pub const SUB_WINDOWS_ACC3: usize = 585;

/// Healthy vibration baseline ranges per sensor: (rms g, crest factor).
pub const HEALTHY_RMS: [(f64, f64); 3] = [(0.05, 0.15), (0.05, 0.15), (0.02, 0.08)];
pub const HEALTHY_CREST: (f64, f64) = (2.5, 4.0);
pub const HEALTHY_KURTOSIS: f64 = 3.0;

/// Relative feature noise floor per engine variant (modern, older).
pub const VIBRATION_NOISE_FRACTION: (f64, f64) = (0.10, 0.12);

// ---------------------------------------------------------------------------
// Bearing geometry
// ---------------------------------------------------------------------------

/// Bearing geometry defaults: (n_balls, ball dia mm, pitch dia mm), per
/// variant. Diameters are jittered per truck; ball count is fixed.
pub const BEARING_GEOMETRY_MODERN: (u32, f64, f64) = (12, 20.0, 120.0);
pub const BEARING_GEOMETRY_OLDER: (u32, f64, f64) = (10, 18.0, 110.0);

/// Relative jitter applied to ball/pitch diameters per truck.
pub const BEARING_GEOMETRY_JITTER: f64 = 0.05;

// ---------------------------------------------------------------------------
// Degradation
// ---------------------------------------------------------------------------

/// Steepness of the logistic severity curve; controls how late the
/// acceleration happens.
pub const LOGISTIC_STEEPNESS: f64 = 5.0;

/// Severity thresholds mapping to stages 2, 3 and 4.
pub const STAGE_THRESHOLDS: [f64; 3] = [0.60, 0.75, 0.95];

/// Severity below which an improving fault is considered resolved.
pub const IMPROVEMENT_RESOLVED_THRESHOLD: f64 = 0.01;

/// Severity inside stage 3 above which Path A flips IMMINENT -> CRITICAL.
pub const PATH_A_CRITICAL_SEVERITY: f64 = 0.85;

/// RUL value emitted for healthy or improving trucks.
pub const RUL_SENTINEL: f64 = 99999.0;

/// Per-mode degradation sampling parameters.
#[derive(Debug, Clone, Copy)]
pub struct DegradationRanges {
    /// Total-life sampling range, hours.
    pub life_hours: (f64, f64),
    /// Stochasticity of the severity path.
    pub sigma: f64,
}

/// FM-01 bearing life ranges per variant: time to stage 2 plus the 2->3 and
/// 3->4 spans, all in hours. Sigma range is sampled.
pub const BEARING_LIFE_MODERN: [(f64, f64); 3] = [(2000.0, 4000.0), (200.0, 500.0), (50.0, 150.0)];
pub const BEARING_LIFE_OLDER: [(f64, f64); 3] = [(1500.0, 3000.0), (150.0, 400.0), (30.0, 100.0)];
pub const BEARING_SIGMA_MODERN: (f64, f64) = (0.05, 0.15);
pub const BEARING_SIGMA_OLDER: (f64, f64) = (0.10, 0.20);

/// FM-02 cooling degradation: T1 rise and progression.
pub const FM02_DELTA_T1_MAX: (f64, f64) = (10.0, 30.0);
pub const FM02_LIFE: DegradationRanges = DegradationRanges { life_hours: (500.0, 1500.0), sigma: 0.08 };

/// FM-03 valve train wear: mid-low band energy and kurtosis growth.
pub const FM03_ENERGY_MULT_MAX: (f64, f64) = (3.0, 8.0);
pub const FM03_KURTOSIS_INC_MAX: (f64, f64) = (1.0, 3.0);
pub const FM03_LIFE: DegradationRanges = DegradationRanges { life_hours: (1000.0, 3000.0), sigma: 0.10 };

/// FM-04 oil degradation: T2 rise under load.
pub const FM04_DELTA_T2_MAX: (f64, f64) = (10.0, 30.0);
pub const FM04_LIFE: DegradationRanges = DegradationRanges { life_hours: (500.0, 1500.0), sigma: 0.08 };

/// FM-05 turbo degradation: efficiency loss shrinking the T3-T4 delta.
pub const FM05_EFFICIENCY_LOSS_MAX: (f64, f64) = (0.2, 0.4);
pub const FM05_LIFE: DegradationRanges = DegradationRanges { life_hours: (500.0, 1000.0), sigma: 0.10 };

/// FM-06 injector wear: T3 rise and 10-25 kHz energy.
pub const FM06_DELTA_T3_MAX: (f64, f64) = (30.0, 80.0);
pub const FM06_DELTA_T_FULL: (f64, f64) = (50.0, 100.0);
pub const FM06_LIFE: DegradationRanges = DegradationRanges { life_hours: (1000.0, 2000.0), sigma: 0.08 };

/// FM-07 EGR cooler: gradual fouling plus discrete coolant-leak spikes.
pub const FM07_DELTA_T5_MAX: (f64, f64) = (20.0, 60.0);
pub const FM07_LEAK_T1_SPIKE: (f64, f64) = (10.0, 30.0);
pub const FM07_LEAK_T5_SPIKE: (f64, f64) = (30.0, 80.0);
pub const FM07_LEAK_RATE_PER_HOUR: f64 = 0.002;
pub const FM07_LIFE: DegradationRanges = DegradationRanges { life_hours: (500.0, 1500.0), sigma: 0.12 };

/// FM-08 DPF blockage: sustained T3 elevation with partial regen clearing.
pub const FM08_DELTA_T3_MAX: (f64, f64) = (100.0, 200.0);
pub const FM08_REGEN_INTERVAL_HOURS: (f64, f64) = (200.0, 400.0);
pub const FM08_REGEN_CLEARANCE: f64 = 0.3;
pub const FM08_LIFE: DegradationRanges = DegradationRanges { life_hours: (100.0, 500.0), sigma: 0.15 };

/// FM-01 per-stage vibration signature targets: (rms g, kurtosis, spectral
/// kurtosis), indexed stage 1..4. Kurtosis and SK drop again in stage 4 as
/// impacts smear into broadband noise.
pub const BEARING_STAGE_RMS: [(f64, f64); 4] =
    [(0.05, 0.15), (0.15, 0.30), (0.30, 1.50), (1.50, 5.00)];
pub const BEARING_STAGE_KURTOSIS: [(f64, f64); 4] =
    [(2.5, 3.5), (4.0, 6.0), (6.0, 10.0), (3.0, 5.0)];
pub const BEARING_STAGE_SK: [(f64, f64); 4] = [(1.0, 5.0), (5.0, 8.0), (10.0, 20.0), (5.0, 8.0)];

// ---------------------------------------------------------------------------
// Maintenance lifecycle
// ---------------------------------------------------------------------------

/// Per-day detection probability sampling ranges for stages 2 and 3;
/// stage 4 detection probability is fixed.
pub const DETECT_P_STAGE2: (f64, f64) = (0.20, 0.30);
pub const DETECT_P_STAGE3: (f64, f64) = (0.60, 0.80);
pub const DETECT_P_STAGE4: f64 = 0.95;

/// Inspection scheduling delay after detection, calendar days (inclusive).
pub const INSPECTION_DELAY_STAGE2: (u32, u32) = (7, 21);
pub const INSPECTION_DELAY_STAGE3: (u32, u32) = (1, 3);
pub const INSPECTION_DELAY_STAGE4: (u32, u32) = (0, 1);

/// Inspection outcome probabilities (repair, monitor, false positive) by
/// stage at inspection time. Stage 4 always repairs.
pub const OUTCOME_STAGE2: [f64; 3] = [0.85, 0.10, 0.05];
pub const OUTCOME_STAGE3: [f64; 3] = [0.90, 0.08, 0.02];
pub const OUTCOME_STAGE4: [f64; 3] = [1.0, 0.0, 0.0];

/// Probability that a Monitor outcome starts an improvement trajectory
/// (the other half continues degrading unchanged).
pub const MONITOR_IMPROVE_P: f64 = 0.5;

/// Improvement time-constant sampling range, hours.
pub const IMPROVEMENT_TAU_HOURS: (f64, f64) = (200.0, 500.0);

/// Repair duration ranges by stage, calendar days (inclusive).
pub const REPAIR_DURATION_STAGE2: (u32, u32) = (1, 2);
pub const REPAIR_DURATION_STAGE3: (u32, u32) = (2, 5);
pub const REPAIR_DURATION_STAGE4: (u32, u32) = (5, 10);

/// Probability that a fresh fault is assigned after a repair.
pub const POST_REPAIR_NEW_FAULT_P: f64 = 0.70;

/// Guaranteed healthy span after return to service before a new fault may
/// onset, hours.
pub const HEALTHY_BUFFER_HOURS: f64 = 720.0;

// ---------------------------------------------------------------------------
// Conditioning features
// ---------------------------------------------------------------------------

/// Relative error of the vibration-derived RPM estimate.
pub const RPM_EST_REL_NOISE: f64 = 0.03;

/// T3 anchors for the load proxy: (idle baseline, cruise), per variant.
pub const LOAD_PROXY_T3_MODERN: (f64, f64) = (175.0, 400.0);
pub const LOAD_PROXY_T3_OLDER: (f64, f64) = (185.0, 400.0);

// ---------------------------------------------------------------------------
// Output validation bands
// ---------------------------------------------------------------------------

/// Allowed Path A class shares over a full fleet run.
pub const NORMAL_SHARE: (f64, f64) = (0.93, 0.96);
pub const IMMINENT_SHARE: (f64, f64) = (0.03, 0.05);
pub const CRITICAL_SHARE: (f64, f64) = (0.005, 0.02);

/// Repair duration sanity bounds: mean in days, hard maximum in days.
pub const REPAIR_MEAN_DAYS: (f64, f64) = (2.0, 4.0);
pub const REPAIR_MAX_DAYS: u32 = 14;

// ---------------------------------------------------------------------------
// Consistency checks
// ---------------------------------------------------------------------------

fn check_range(name: &str, lo: f64, hi: f64) -> Result<(), ConfigError> {
    if lo > hi || !lo.is_finite() || !hi.is_finite() {
        return Err(ConfigError::InconsistentRange {
            name: name.to_string(),
            lo,
            hi,
        });
    }
    Ok(())
}

/// Verify internal consistency of every sampling range and the transition
/// matrix. Run once before generation; failure is a `ConfigError`.
pub fn validate() -> Result<(), ConfigError> {
    for (row, probs) in TRANSITION_MATRIX.iter().enumerate() {
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > 1e-9 || probs.iter().any(|p| *p < 0.0) {
            return Err(ConfigError::BadTransitionRow { row, sum });
        }
    }

    for (i, ((m_lo, m_hi), (o_lo, o_hi))) in RPM_RANGES.iter().enumerate() {
        check_range(&format!("rpm[{}].modern", i), *m_lo, *m_hi)?;
        check_range(&format!("rpm[{}].older", i), *o_lo, *o_hi)?;
    }
    for (i, (lo, hi)) in LOAD_RANGES.iter().enumerate() {
        check_range(&format!("load[{}]", i), *lo, *hi)?;
    }

    for (variant, table) in [
        ("modern", &THERMAL_BASELINES_MODERN),
        ("older", &THERMAL_BASELINES_OLDER),
    ] {
        for (i, b) in table.iter().enumerate() {
            check_range(&format!("{}.t{}.idle", variant, i + 1), b.idle.0, b.idle.1)?;
            check_range(
                &format!("{}.t{}.delta_load", variant, i + 1),
                b.delta_load.0,
                b.delta_load.1,
            )?;
            check_range(&format!("{}.t{}.tau", variant, i + 1), b.tau.0, b.tau.1)?;
        }
    }

    let fm_ranges: [(&str, (f64, f64)); 12] = [
        ("fm02.delta_t1", FM02_DELTA_T1_MAX),
        ("fm02.life", FM02_LIFE.life_hours),
        ("fm03.energy_mult", FM03_ENERGY_MULT_MAX),
        ("fm03.life", FM03_LIFE.life_hours),
        ("fm04.delta_t2", FM04_DELTA_T2_MAX),
        ("fm04.life", FM04_LIFE.life_hours),
        ("fm05.efficiency_loss", FM05_EFFICIENCY_LOSS_MAX),
        ("fm05.life", FM05_LIFE.life_hours),
        ("fm06.delta_t3", FM06_DELTA_T3_MAX),
        ("fm06.life", FM06_LIFE.life_hours),
        ("fm07.life", FM07_LIFE.life_hours),
        ("fm08.life", FM08_LIFE.life_hours),
    ];
    for (name, (lo, hi)) in fm_ranges {
        check_range(name, lo, hi)?;
    }
    for (i, (lo, hi)) in BEARING_LIFE_MODERN.iter().enumerate() {
        check_range(&format!("fm01.modern.span{}", i), *lo, *hi)?;
    }
    for (i, (lo, hi)) in BEARING_LIFE_OLDER.iter().enumerate() {
        check_range(&format!("fm01.older.span{}", i), *lo, *hi)?;
    }

    check_range("detect.stage2", DETECT_P_STAGE2.0, DETECT_P_STAGE2.1)?;
    check_range("detect.stage3", DETECT_P_STAGE3.0, DETECT_P_STAGE3.1)?;
    check_range(
        "improvement.tau",
        IMPROVEMENT_TAU_HOURS.0,
        IMPROVEMENT_TAU_HOURS.1,
    )?;
    for (name, table) in [
        ("outcome.stage2", OUTCOME_STAGE2),
        ("outcome.stage3", OUTCOME_STAGE3),
        ("outcome.stage4", OUTCOME_STAGE4),
    ] {
        let sum: f64 = table.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::InconsistentRange {
                name: name.to_string(),
                lo: sum,
                hi: 1.0,
            });
        }
    }

    Ok(())
}
