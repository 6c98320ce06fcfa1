//! Truck-day orchestrator.
//!
//! Generates the 1440 windows of one `(truck, day)` work unit. The unit is
//! a pure function of the truck descriptor, the serialized maintenance
//! state, the previous day's thermal state and the day seed
//! (`truck_seed * 1000 + day_index`); every component draws from its own
//! freshly forked sub-stream, so no RNG state survives the unit.

use crate::constants::{HOURS_PER_DAY, SECONDS_PER_WINDOW, SIM_EPOCH_UNIX, WINDOWS_PER_DAY};
use crate::effects::{compose, fault_effects, WindowContext};
use crate::error::{LogicError, Result};
use crate::features::{assemble, conditioning_features};
use crate::fleet::TruckDescriptor;
use crate::frame::{TruckDayFrame, TruckDayRow};
use crate::labels::compute_labels;
use crate::maintenance::MaintenanceState;
use crate::operating::{rpm_load_trajectories, AmbientModel, OperatingMode, TransitionMatrix};
use crate::sub_seed;
use crate::thermal::{advance_window, ThermalState};
use crate::vibration::synthesize;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Result of one generated truck-day.
#[derive(Debug, Clone)]
pub struct TruckDayOutput {
    pub frame: TruckDayFrame,
    /// End-of-day thermal state for the next day.
    pub final_thermal: ThermalState,
    /// Final operating mode; carries over into the next operating day.
    pub final_mode: OperatingMode,
}

/// Seed of one `(truck, day)` work unit.
pub fn day_seed(truck_seed: u64, day_index: u32) -> u64 {
    truck_seed.wrapping_mul(1000).wrapping_add(day_index as u64)
}

/// Generate one truck-day. Must only be called for operating days; repair
/// days emit nothing.
pub fn generate_truck_day(
    truck: &TruckDescriptor,
    state: &MaintenanceState,
    initial_temps: [f64; 6],
    day_index: u32,
) -> Result<TruckDayOutput> {
    let seed = day_seed(truck.seed, day_index);
    let mut duty_rng = StdRng::seed_from_u64(sub_seed("duty", seed));
    let mut vibration_rng = StdRng::seed_from_u64(sub_seed("vibration", seed));
    let mut thermal_rng = StdRng::seed_from_u64(sub_seed("thermal", seed));
    let mut conditioning_rng = StdRng::seed_from_u64(sub_seed("conditioning", seed));

    let matrix = TransitionMatrix::from_constants()?;
    let ambient_model = AmbientModel::default();

    // Day 0 starts cold; later days resume the previous operating day's
    // final mode (reset to idle after a repair).
    let initial_mode = if day_index == 0 {
        OperatingMode::Idle
    } else {
        state.last_mode
    };
    let modes = matrix.simulate_day(initial_mode, &mut duty_rng);
    let (rpm, load) = rpm_load_trajectories(&modes, truck.variant, &mut duty_rng);

    let curves: Vec<_> = state.faults.iter().map(|f| f.curve()).collect();

    let mut temps = initial_temps;
    let mut frame = TruckDayFrame::new(truck.truck_id, day_index);
    let day_start_unix = SIM_EPOCH_UNIX + day_index as i64 * 86_400;

    for window in 0..WINDOWS_PER_DAY {
        let t_hours = state.engine_hours + window as f64 / 60.0;
        let second_of_day = (window as i64 * SECONDS_PER_WINDOW) as u32;
        let ambient = ambient_model.temperature(day_index, second_of_day);

        let ctx = WindowContext {
            truck_id: truck.truck_id,
            day_index,
            window_index: window as u32,
            episode_id: state.episode_id,
            rpm: rpm[window],
            load: load[window],
        };

        let per_fault: Vec<_> = state
            .faults
            .iter()
            .zip(curves.iter())
            .map(|(fault, curve)| fault_effects(fault, curve, t_hours, &ctx))
            .collect();
        let modifiers = compose(&per_fault);

        let thermal_window = advance_window(
            &mut temps,
            truck,
            ctx.load,
            ambient,
            &modifiers.thermal,
            &mut thermal_rng,
        );

        let vibration = synthesize(
            truck.variant,
            &modifiers.vibration,
            ctx.load,
            &mut vibration_rng,
        );

        let conditioning = conditioning_features(
            ctx.rpm,
            thermal_window.t3_mean(),
            truck.variant,
            &mut conditioning_rng,
        );

        let features = assemble(conditioning, vibration, thermal_window.feature_values())?;

        // Labels read only the internal fault state, never the features.
        let labels = compute_labels(t_hours, &state.faults, &curves);

        frame.push_row(TruckDayRow {
            timestamp: day_start_unix + window as i64 * SECONDS_PER_WINDOW,
            truck_id: truck.truck_id as i32,
            engine_type: truck.variant.as_str(),
            day_index: day_index as i32,
            episode_id: state.episode_id as i32,
            features,
            labels,
        })?;
    }

    if frame.len() != WINDOWS_PER_DAY {
        return Err(LogicError::invariant(
            "window-count",
            format!("operating day produced {} rows", frame.len()),
        )
        .into());
    }

    let final_thermal = ThermalState::from_temps(
        truck.truck_id,
        day_index,
        day_start_unix + HOURS_PER_DAY as i64 * 3600,
        temps,
    );

    Ok(TruckDayOutput {
        frame,
        final_thermal,
        final_mode: *modes.last().expect("day has windows"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::fleet::Fleet;
    use crate::thermal::idle_temps;

    fn setup() -> (TruckDescriptor, MaintenanceState) {
        let fleet = Fleet::build(&GeneratorConfig::default().with_trucks(20)).unwrap();
        let truck = fleet.truck(17).unwrap().clone();
        let state = MaintenanceState::new(17, Vec::new());
        (truck, state)
    }

    #[test]
    fn test_day_seed_formula() {
        assert_eq!(day_seed(59, 3), 59_003);
        assert_eq!(day_seed(1042, 0), 1_042_000);
    }

    #[test]
    fn test_healthy_day_shape() {
        let (truck, state) = setup();
        let temps = idle_temps(&truck, 15.0);
        let out = generate_truck_day(&truck, &state, temps, 0).unwrap();

        assert_eq!(out.frame.len(), WINDOWS_PER_DAY);
        for row in out.frame.rows() {
            assert_eq!(row.features.len(), 221);
            assert_eq!(row.labels.fault_mode, "HEALTHY");
            assert_eq!(row.labels.rul_hours, 99999.0);
            assert_eq!(row.episode_id, 0);
        }
        // Timestamps step by 60 seconds from the epoch.
        let rows = out.frame.rows();
        assert_eq!(rows[0].timestamp, SIM_EPOCH_UNIX);
        assert_eq!(rows[1].timestamp - rows[0].timestamp, 60);
        assert_eq!(
            rows[WINDOWS_PER_DAY - 1].timestamp - rows[0].timestamp,
            60 * (WINDOWS_PER_DAY as i64 - 1)
        );
    }

    #[test]
    fn test_deterministic_regeneration() {
        let (truck, state) = setup();
        let temps = idle_temps(&truck, 15.0);
        let a = generate_truck_day(&truck, &state, temps, 3).unwrap();
        let b = generate_truck_day(&truck, &state, temps, 3).unwrap();

        for (ra, rb) in a.frame.rows().iter().zip(b.frame.rows().iter()) {
            assert_eq!(ra.features, rb.features);
            assert_eq!(ra.labels, rb.labels);
        }
        assert_eq!(a.final_thermal, b.final_thermal);
        assert_eq!(a.final_mode, b.final_mode);
    }

    #[test]
    fn test_different_days_differ() {
        let (truck, state) = setup();
        let temps = idle_temps(&truck, 15.0);
        let a = generate_truck_day(&truck, &state, temps, 1).unwrap();
        let b = generate_truck_day(&truck, &state, temps, 2).unwrap();
        assert_ne!(a.frame.rows()[0].features, b.frame.rows()[0].features);
    }

    #[test]
    fn test_thermal_state_chains() {
        let (truck, state) = setup();
        let temps = idle_temps(&truck, 15.0);
        let day0 = generate_truck_day(&truck, &state, temps, 0).unwrap();

        // Next day picks up where the last one ended.
        let day1 =
            generate_truck_day(&truck, &state, day0.final_thermal.temps(), 1).unwrap();
        assert_eq!(day0.final_thermal.day_index, 0);
        assert_eq!(day1.final_thermal.day_index, 1);
        // Warmed-over engine: day 1 starts warmer than a cold start would.
        let cold = idle_temps(&truck, 15.0);
        assert!(day0.final_thermal.temps()[2] != cold[2]);
    }

    #[test]
    fn test_faulty_day_labels() {
        let (truck, mut state) = setup();
        // Pre-aged bearing fault pinned at full severity.
        let mut rng = StdRng::seed_from_u64(5);
        state.faults.push(crate::faults::FaultEpisode::sample(
            crate::faults::FaultModeId::Fm01Bearing,
            -10_000.0,
            truck.variant,
            &mut rng,
        ));
        let temps = idle_temps(&truck, 15.0);
        let out = generate_truck_day(&truck, &state, temps, 0).unwrap();

        for row in out.frame.rows() {
            assert_eq!(row.labels.fault_mode, "FM-01");
            assert_eq!(row.labels.fault_severity, "STAGE4");
            assert_eq!(row.labels.rul_hours, 0.0);
        }
    }
}
