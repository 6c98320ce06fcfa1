//! Fleet batch runner.
//!
//! Schedules `(truck, day)` work units: trucks fan out across a rayon pool,
//! days run strictly in ascending order within a truck because thermal and
//! maintenance state flow across day boundaries. Each unit re-derives every
//! random stream from its seed, so worker count and scheduling order cannot
//! change the output. Resumability is file-based: a unit whose frame and
//! end-of-day sidecars already exist is fast-forwarded from the persisted
//! state instead of regenerated.

use crate::config::GeneratorConfig;
use crate::constants::HOURS_PER_DAY;
use crate::error::{ConfigError, FleetError, Result};
use crate::fleet::{Fleet, TruckDescriptor};
use crate::frame::FrameSink;
use crate::maintenance::MaintenanceState;
use crate::manifest::GenerationManifest;
use crate::operating::{AmbientModel, OperatingMode, TransitionMatrix};
use crate::storage::StateStore;
use crate::sub_seed;
use crate::thermal::idle_temps;
use crate::truck_day::{day_seed, generate_truck_day};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

/// Outcome of a full batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub trucks_completed: usize,
    pub units_generated: usize,
    pub units_skipped: usize,
    /// First fatal error per failed truck.
    pub errors: Vec<(u32, String)>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-truck progress counts.
#[derive(Debug, Clone, Copy, Default)]
struct TruckStats {
    generated: usize,
    skipped: usize,
}

/// Runs a configured generation across the fleet.
pub struct BatchRunner<'a, S: FrameSink> {
    config: &'a GeneratorConfig,
    fleet: &'a Fleet,
    sink: &'a S,
    store: StateStore,
}

impl<'a, S: FrameSink> BatchRunner<'a, S> {
    pub fn new(config: &'a GeneratorConfig, fleet: &'a Fleet, sink: &'a S) -> Self {
        let store = StateStore::new(config.output_dir.clone());
        Self {
            config,
            fleet,
            sink,
            store,
        }
    }

    /// Generate everything the configuration asks for.
    pub fn run(&self) -> Result<BatchSummary> {
        self.config.validate()?;
        self.store.write_split_files(self.fleet)?;

        let trucks: Vec<&TruckDescriptor> = match self.config.single_truck {
            Some(id) => vec![self.fleet.truck(id)?],
            None => self.fleet.trucks.iter().collect(),
        };

        info!(
            trucks = trucks.len(),
            days = self.config.days,
            workers = self.config.workers,
            seed = self.config.master_seed,
            "starting generation"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| {
                FleetError::Config(ConfigError::InvalidDimension(format!(
                    "worker pool: {}",
                    e
                )))
            })?;

        let results: Vec<(u32, std::result::Result<TruckStats, FleetError>)> = pool.install(|| {
            use rayon::prelude::*;
            trucks
                .par_iter()
                .map(|truck| (truck.truck_id, self.run_truck(truck)))
                .collect()
        });

        let mut summary = BatchSummary::default();
        for (truck_id, result) in results {
            match result {
                Ok(stats) => {
                    summary.trucks_completed += 1;
                    summary.units_generated += stats.generated;
                    summary.units_skipped += stats.skipped;
                }
                Err(err) => {
                    // One truck failing does not stop the rest of the fleet.
                    warn!(truck_id, %err, "truck failed");
                    summary.errors.push((truck_id, err.to_string()));
                }
            }
        }

        GenerationManifest::build(self.config, self.fleet).write(&self.config.output_dir)?;
        info!(
            generated = summary.units_generated,
            skipped = summary.units_skipped,
            failed = summary.errors.len(),
            "generation finished"
        );
        Ok(summary)
    }

    /// Run all requested days of one truck, in ascending order.
    fn run_truck(&self, truck: &TruckDescriptor) -> std::result::Result<TruckStats, FleetError> {
        let sim_end_hours = self.config.sim_hours();
        let mut state =
            MaintenanceState::new(truck.truck_id, truck.initial_faults(sim_end_hours));
        let mut stats = TruckStats::default();
        let ambient = AmbientModel::default();
        let matrix = TransitionMatrix::from_constants()?;

        let only_day = match (self.config.single_truck, self.config.single_day) {
            (Some(_), Some(day)) => Some(day),
            _ => None,
        };

        for day in 0..self.config.days {
            let emit = only_day.map_or(true, |d| d == day);

            if state.is_in_repair(day) {
                self.advance_boundary(truck, &mut state, day, sim_end_hours)?;
                continue;
            }

            if emit && self.config.skip_existing && self.resumable(truck.truck_id, day) {
                // Fast-forward: adopt the persisted end-of-boundary state.
                state = self
                    .store
                    .load_maintenance(truck.truck_id, day)
                    .expect("checked by resumable()");
                stats.skipped += 1;
                continue;
            }

            if emit {
                let temps = self.initial_temps(truck, &mut state, day, &ambient);
                let output = generate_truck_day(truck, &state, temps, day)?;
                self.sink.write(&output.frame)?;
                self.store.save_thermal(&output.final_thermal)?;
                state.last_mode = output.final_mode;
                stats.generated += 1;
            } else {
                // Single-unit mode, off-target day: keep the duty-cycle
                // chain aligned without synthesizing features.
                let mut duty_rng =
                    StdRng::seed_from_u64(sub_seed("duty", day_seed(truck.seed, day)));
                let initial = if day == 0 {
                    OperatingMode::Idle
                } else {
                    state.last_mode
                };
                let modes = matrix.simulate_day(initial, &mut duty_rng);
                state.last_mode = *modes.last().expect("day has windows");
                state.thermal_reset_pending = false;
            }

            self.advance_boundary(truck, &mut state, day, sim_end_hours)?;
        }

        state.finalize();
        self.store.write_maintenance_log(truck.truck_id, &state.log)?;
        Ok(stats)
    }

    /// Whether a unit's frame and both end-of-day sidecars are on disk.
    fn resumable(&self, truck_id: u32, day: u32) -> bool {
        self.sink.exists(truck_id, day)
            && self.store.load_maintenance(truck_id, day).is_some()
            && self.store.load_thermal(truck_id, day).is_some()
    }

    /// Starting temperatures for an operating day.
    fn initial_temps(
        &self,
        truck: &TruckDescriptor,
        state: &mut MaintenanceState,
        day: u32,
        ambient: &AmbientModel,
    ) -> [f64; 6] {
        let ambient_at_start = ambient.temperature(day, 0);
        if state.thermal_reset_pending {
            // Fresh out of the workshop: cold engine at current ambient.
            state.thermal_reset_pending = false;
            return idle_temps(truck, ambient_at_start);
        }
        if day == 0 {
            return idle_temps(truck, ambient_at_start);
        }
        match self.store.load_thermal(truck.truck_id, day - 1) {
            Some(prev) => prev.temps(),
            None => {
                warn!(
                    truck_id = truck.truck_id,
                    day, "missing prior thermal state, using idle baselines"
                );
                idle_temps(truck, ambient_at_start)
            }
        }
    }

    /// Run the day-boundary maintenance step and persist the state.
    fn advance_boundary(
        &self,
        truck: &TruckDescriptor,
        state: &mut MaintenanceState,
        day: u32,
        sim_end_hours: f64,
    ) -> Result<()> {
        if self.config.maintenance_enabled {
            let mut rng =
                StdRng::seed_from_u64(sub_seed("maintenance", day_seed(truck.seed, day)));
            state.end_of_day(day, truck.variant, sim_end_hours, &mut rng);
        } else {
            // Maintenance disabled: the engine clock still runs.
            state.engine_hours += HOURS_PER_DAY;
        }
        self.store.save_maintenance(state, day)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CsvSink;
    use tempfile::TempDir;

    fn run_config(dir: &TempDir, trucks: usize, days: u32) -> (GeneratorConfig, Fleet) {
        let config = GeneratorConfig::default()
            .with_trucks(trucks)
            .with_days(days)
            .with_workers(2)
            .with_output_dir(dir.path());
        let fleet = Fleet::build(&config).unwrap();
        (config, fleet)
    }

    #[test]
    fn test_small_batch_produces_files() {
        let dir = TempDir::new().unwrap();
        let (config, fleet) = run_config(&dir, 3, 2);
        let sink = CsvSink::new(dir.path());
        let summary = BatchRunner::new(&config, &fleet, &sink).run().unwrap();

        assert!(summary.is_clean());
        assert_eq!(summary.trucks_completed, 3);
        for truck in 1..=3 {
            for day in 0..2 {
                // Either a frame exists or the truck was in repair that day;
                // with a 2-day horizon nobody reaches a repair.
                assert!(sink.exists(truck, day), "truck {} day {}", truck, day);
            }
        }
        assert!(dir.path().join("metadata/generation_manifest.json").exists());
        assert!(dir.path().join("metadata/train_trucks.txt").exists());
    }

    #[test]
    fn test_skip_existing_resumes() {
        let dir = TempDir::new().unwrap();
        let (config, fleet) = run_config(&dir, 2, 2);
        let sink = CsvSink::new(dir.path());

        let first = BatchRunner::new(&config, &fleet, &sink).run().unwrap();
        assert_eq!(first.units_skipped, 0);

        let second = BatchRunner::new(&config, &fleet, &sink).run().unwrap();
        assert_eq!(second.units_skipped, 4);
        assert_eq!(second.units_generated, 0);
    }

    #[test]
    fn test_single_unit_mode() {
        let dir = TempDir::new().unwrap();
        let (mut config, fleet) = run_config(&dir, 3, 3);
        config = config.with_single(2, Some(1));
        let sink = CsvSink::new(dir.path());
        BatchRunner::new(&config, &fleet, &sink).run().unwrap();

        // Only the requested unit exists.
        assert!(!sink.exists(1, 0));
        assert!(!sink.exists(2, 0));
        assert!(sink.exists(2, 1));
        assert!(!sink.exists(2, 2));
        assert!(!sink.exists(3, 1));
    }

    #[test]
    fn test_unknown_single_truck_fails() {
        let dir = TempDir::new().unwrap();
        let (mut config, fleet) = run_config(&dir, 2, 1);
        config = config.with_single(99, None);
        let sink = CsvSink::new(dir.path());
        let err = BatchRunner::new(&config, &fleet, &sink).run().unwrap_err();
        assert!(matches!(
            err,
            FleetError::Config(ConfigError::UnknownTruck(99))
        ));
    }
}
