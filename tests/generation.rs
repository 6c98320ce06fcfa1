//! End-to-end generation tests: determinism, schema contract, fault
//! progression and the maintenance lifecycle scenarios.

use fleetgen::constants::{
    HEALTHY_BUFFER_HOURS, HOURS_PER_DAY, RUL_SENTINEL, SIM_EPOCH_UNIX, WINDOWS_PER_DAY,
};
use fleetgen::faults::{FaultEpisode, FaultKind, FaultModeId, Improvement, VibSensor};
use fleetgen::frame::COLUMN_COUNT;
use fleetgen::storage::StateStore;
use fleetgen::thermal::idle_temps;
use fleetgen::{
    generate_truck_day, BatchRunner, CsvSink, Fleet, FrameSink, GeneratorConfig,
    MaintenanceState, TruckDescriptor, TruckStatus,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pinned_fault(
    kind: FaultKind,
    onset: f64,
    life: f64,
    noise_seed: u64,
    detection_p: [f64; 3],
) -> FaultEpisode {
    FaultEpisode {
        kind,
        onset_hours: onset,
        total_life_hours: life,
        sigma: 0.05,
        noise_seed,
        detection_p,
        detected: false,
        detection_day: None,
        detection_stage: None,
        inspection_day: None,
        monitor_continue: false,
        improving: None,
    }
}

fn test_truck(dir_seed: u64, truck_id: u32) -> TruckDescriptor {
    let config = GeneratorConfig::default()
        .with_trucks(20)
        .with_seed(dir_seed);
    Fleet::build(&config).unwrap().truck(truck_id).unwrap().clone()
}

/// Drive one truck through `days` the way the batch runner does, with a
/// custom fault set. Returns nothing; frames and sidecars land in `root`.
fn run_days(
    truck: &TruckDescriptor,
    state: &mut MaintenanceState,
    root: &Path,
    days: u32,
    sim_end_hours: f64,
    maintenance: bool,
) {
    let sink = CsvSink::new(root);
    let store = StateStore::new(root);

    for day in 0..days {
        if state.is_in_repair(day) {
            let mut rng = StdRng::seed_from_u64(9_000_000 + day as u64);
            state.end_of_day(day, truck.variant, sim_end_hours, &mut rng);
            continue;
        }

        let temps = if day == 0 || state.thermal_reset_pending {
            state.thermal_reset_pending = false;
            idle_temps(truck, 15.0)
        } else {
            store
                .load_thermal(truck.truck_id, day - 1)
                .map(|s| s.temps())
                .unwrap_or_else(|| idle_temps(truck, 15.0))
        };

        let out = generate_truck_day(truck, state, temps, day).unwrap();
        sink.write(&out.frame).unwrap();
        store.save_thermal(&out.final_thermal).unwrap();
        state.last_mode = out.final_mode;

        if maintenance {
            let mut rng = StdRng::seed_from_u64(9_000_000 + day as u64);
            state.end_of_day(day, truck.variant, sim_end_hours, &mut rng);
        } else {
            state.engine_hours += HOURS_PER_DAY;
        }
    }
}

/// Parse a written frame: (day_index, episode_id, fault_mode,
/// fault_severity, rul_hours, path_a_label) per row.
fn read_rows(path: &Path) -> Vec<(i32, i32, String, String, f64, String)> {
    let text = fs::read_to_string(path).unwrap();
    let mut rows = Vec::new();
    for line in text.lines().skip(1) {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), COLUMN_COUNT);
        rows.push((
            fields[3].parse().unwrap(),
            fields[4].parse().unwrap(),
            fields[226].to_string(),
            fields[227].to_string(),
            fields[228].parse().unwrap(),
            fields[229].to_string(),
        ));
    }
    rows
}

fn day_file(root: &Path, truck_id: u32, day: u32) -> std::path::PathBuf {
    root.join(format!("truck_{:03}", truck_id))
        .join(format!("day_{:03}.csv", day))
}

// ---------------------------------------------------------------------------
// Scenario A: healthy truck, one day
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_healthy_truck_day() {
    let dir = TempDir::new().unwrap();
    let truck = test_truck(42, 17);
    let mut state = MaintenanceState::new(truck.truck_id, Vec::new());
    run_days(&truck, &mut state, dir.path(), 1, 183.0 * 24.0, true);

    let rows = read_rows(&day_file(dir.path(), 17, 0));
    assert_eq!(rows.len(), WINDOWS_PER_DAY);
    for (day, episode, mode, severity, rul, path_a) in &rows {
        assert_eq!(*day, 0);
        assert_eq!(*episode, 0);
        assert_eq!(mode, "HEALTHY");
        assert_eq!(severity, "HEALTHY");
        assert_eq!(*rul, RUL_SENTINEL);
        assert_eq!(path_a, "NORMAL");
    }

    // First timestamp sits on the simulation epoch.
    let text = fs::read_to_string(day_file(dir.path(), 17, 0)).unwrap();
    let first_row = text.lines().nth(1).unwrap();
    assert!(first_row.starts_with(&format!("{},17,", SIM_EPOCH_UNIX)));
}

// ---------------------------------------------------------------------------
// Scenario B: FM-01 stage progression with maintenance disabled
// ---------------------------------------------------------------------------

#[test]
fn scenario_b_bearing_progression() {
    let dir = TempDir::new().unwrap();
    let truck = test_truck(42, 3);
    let fault = pinned_fault(
        FaultKind::BearingWear {
            sensor: VibSensor::Acc1,
        },
        0.0,
        100.0,
        7,
        [0.25, 0.7, 0.95],
    );
    let mut state = MaintenanceState::new(truck.truck_id, vec![fault]);
    run_days(&truck, &mut state, dir.path(), 5, 183.0 * 24.0, false);

    let mut severities = Vec::new();
    let mut ruls = Vec::new();
    let mut healthy_rows = 0;
    for day in 0..5 {
        for (_, _, mode, severity, rul, _) in read_rows(&day_file(dir.path(), 3, day)) {
            if mode == "HEALTHY" {
                // Only the very first window, where severity is still zero.
                healthy_rows += 1;
                continue;
            }
            assert_eq!(mode, "FM-01");
            severities.push(severity);
            ruls.push(rul);
        }
    }
    assert!(healthy_rows <= 1);

    // Day 0 starts in stage 1; the 100 h life ends inside the 5-day span,
    // so every stage appears.
    assert_eq!(severities[0], "STAGE1");
    for stage in ["STAGE1", "STAGE2", "STAGE3", "STAGE4"] {
        assert!(severities.iter().any(|s| s == stage), "missing {}", stage);
    }
    // Severity never steps backwards.
    let rank = |s: &str| s.trim_start_matches("STAGE").parse::<u8>().unwrap();
    for pair in severities.windows(2) {
        assert!(rank(&pair[1]) >= rank(&pair[0]));
    }
    // RUL runs down to zero and stays there.
    assert!(ruls[0] > ruls[WINDOWS_PER_DAY]);
    assert_eq!(*ruls.last().unwrap(), 0.0);
}

// ---------------------------------------------------------------------------
// Scenario C: detect-repair cycle
// ---------------------------------------------------------------------------

#[test]
fn scenario_c_detect_repair_cycle() {
    let dir = TempDir::new().unwrap();
    let truck = test_truck(42, 5);
    // A short-life fault with certain detection: reaches stage 4 around
    // day 4, gets caught within a day and always repairs at stage 4.
    let fault = pinned_fault(
        FaultKind::ValveTrainWear {
            energy_mult_max: 5.0,
            kurtosis_inc_max: 2.0,
        },
        0.0,
        96.0,
        11,
        [1.0, 1.0, 1.0],
    );
    let sim_end = 183.0 * 24.0;
    let mut state = MaintenanceState::new(truck.truck_id, vec![fault]);
    run_days(&truck, &mut state, dir.path(), 30, sim_end, true);

    let repair: Vec<_> = state
        .log
        .iter()
        .filter(|e| e.outcome == "repair")
        .collect();
    assert_eq!(repair.len(), 1, "expected exactly one repair");
    let ev = repair[0];
    let start = ev.repair_start_day.unwrap();
    let end = ev.repair_end_day.unwrap();
    let back = ev.return_to_service_day.unwrap();
    assert_eq!(back, end + 1);
    assert_eq!(ev.episode_id_before, 0);
    assert_eq!(ev.episode_id_after, 1);

    // No frames exist for the workshop span; the day before and the return
    // day both exist.
    assert!(day_file(dir.path(), 5, start - 1).exists());
    for day in start..=end {
        assert!(!day_file(dir.path(), 5, day).exists(), "day {} exists", day);
    }
    assert!(day_file(dir.path(), 5, back).exists());

    // The return day runs healthy under the incremented episode.
    for (_, episode, mode, _, rul, _) in read_rows(&day_file(dir.path(), 5, back)) {
        assert_eq!(episode, 1);
        assert_eq!(mode, "HEALTHY");
        assert_eq!(rul, RUL_SENTINEL);
    }

    // Episode ids never decrease across the remaining days.
    let mut last_episode = -1;
    for day in 0..30 {
        let path = day_file(dir.path(), 5, day);
        if !path.exists() {
            continue;
        }
        for (_, episode, ..) in read_rows(&path) {
            assert!(episode >= last_episode);
            last_episode = episode;
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario D: monitor-improve decay
// ---------------------------------------------------------------------------

#[test]
fn scenario_d_monitor_improve() {
    let dir = TempDir::new().unwrap();
    let truck = test_truck(42, 7);
    let mut fault = pinned_fault(
        FaultKind::CoolingLoss { delta_t1_max: 20.0 },
        -3000.0,
        3300.0,
        13,
        [0.0, 0.0, 0.0],
    );
    // Stage-2 detection already resolved to monitor-improve with tau=300 h.
    fault.detected = true;
    fault.improving = Some(Improvement {
        decided_at_hours: 0.0,
        severity_at_decision: 0.65,
        tau_hours: 300.0,
    });
    let mut state = MaintenanceState::new(truck.truck_id, vec![fault]);

    // Severity decays below 0.01 after tau*ln(65) ~ 1252 h ~ day 53.
    run_days(&truck, &mut state, dir.path(), 65, 400.0 * 24.0, true);

    assert!(state.faults.is_empty(), "improving fault must self-resolve");
    assert_eq!(state.episode_id, 0);
    assert!(state.log.iter().all(|e| e.outcome != "repair"));

    // While improving, the mode stays labeled with the RUL sentinel.
    let early = read_rows(&day_file(dir.path(), 7, 0));
    assert_eq!(early[0].2, "FM-02");
    assert_eq!(early[0].4, RUL_SENTINEL);

    // After resolution the truck reads healthy, same episode.
    let late = read_rows(&day_file(dir.path(), 7, 60));
    assert_eq!(late[0].2, "HEALTHY");
    assert_eq!(late[0].1, 0);
}

// ---------------------------------------------------------------------------
// Scenario E: false positive, then re-detection
// ---------------------------------------------------------------------------

#[test]
fn scenario_e_false_positive_then_repair() {
    // Boundary-only sweep (no frames): certain detection meets the 5%/2%
    // false-positive odds often enough over 150 trucks to observe the
    // cycle; afterwards degradation continues and a re-detection follows.
    let sim_end = 400.0 * 24.0;
    let mut observed_fp_then_repair = false;

    for truck_seed in 0..150u64 {
        // Pre-aged to the cusp of stage 2 with a slow 8000 h life, so the
        // 7-21 day inspection delay still lands inside stages 2-3 where
        // false positives are possible.
        let fault = pinned_fault(
            FaultKind::OilBreakdown { delta_t2_max: 20.0 },
            -7160.0,
            8000.0,
            truck_seed,
            [1.0, 1.0, 1.0],
        );
        let mut state = MaintenanceState::new(truck_seed as u32, vec![fault]);
        for day in 0..120 {
            let mut rng = StdRng::seed_from_u64(truck_seed * 100_000 + day as u64);
            state.end_of_day(day, fleetgen::EngineVariant::Modern, sim_end, &mut rng);
        }
        state.finalize();

        let fp_day = state
            .log
            .iter()
            .find(|e| e.outcome == "false_positive")
            .and_then(|e| e.inspection_day);
        if let Some(fp_day) = fp_day {
            // The cleared fault kept degrading and was detected again.
            let later = state.log.iter().any(|e| {
                e.outcome == "repair" && e.detection_day.is_some_and(|d| d > fp_day)
            });
            if later {
                observed_fp_then_repair = true;
                break;
            }
        }
    }

    assert!(
        observed_fp_then_repair,
        "no false-positive-then-repair cycle in 150 trucks"
    );
}

// ---------------------------------------------------------------------------
// Scenario F: multi-fault repair clears everything
// ---------------------------------------------------------------------------

#[test]
fn scenario_f_multi_fault_repair() {
    let dir = TempDir::new().unwrap();
    let truck = test_truck(42, 9);
    let bearing = pinned_fault(
        FaultKind::BearingWear {
            sensor: VibSensor::Acc1,
        },
        0.0,
        96.0,
        21,
        [1.0, 1.0, 1.0],
    );
    let turbo = pinned_fault(
        FaultKind::TurboWear {
            efficiency_loss_max: 0.3,
        },
        0.0,
        2000.0,
        22,
        [0.0, 0.0, 0.0],
    );
    let sim_end = 183.0 * 24.0;
    let mut state = MaintenanceState::new(truck.truck_id, vec![bearing, turbo]);
    run_days(&truck, &mut state, dir.path(), 30, sim_end, true);

    assert_eq!(state.episode_id, 1, "bearing fault must trigger one repair");
    // Both concurrent faults were cleared; anything now active is a fresh
    // post-repair assignment of a different mode beyond the buffer.
    for fault in &state.faults {
        assert_ne!(fault.kind.id(), FaultModeId::Fm01Bearing);
        assert_ne!(fault.kind.id(), FaultModeId::Fm05Turbo);
        assert!(fault.onset_hours >= state.engine_hours + HEALTHY_BUFFER_HOURS - 1e-9);
        assert_eq!(fault.severity_at(&fault.curve(), state.engine_hours), 0.0);
    }
    assert_eq!(state.status, TruckStatus::Operating);
}

// ---------------------------------------------------------------------------
// Determinism properties
// ---------------------------------------------------------------------------

fn collect_data_files(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    for sub in ["truck_001", "truck_002"] {
        let dir = root.join(sub);
        if !dir.exists() {
            continue;
        }
        let mut entries: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        for path in entries {
            files.push((
                format!("{}/{}", sub, path.file_name().unwrap().to_string_lossy()),
                fs::read(&path).unwrap(),
            ));
        }
    }
    files
}

#[test]
fn property_reruns_are_byte_identical() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    for dir in [&dir_a, &dir_b] {
        let config = GeneratorConfig::default()
            .with_trucks(2)
            .with_days(3)
            .with_workers(2)
            .with_output_dir(dir.path());
        let fleet = Fleet::build(&config).unwrap();
        let sink = CsvSink::new(dir.path());
        BatchRunner::new(&config, &fleet, &sink).run().unwrap();
    }

    let a = collect_data_files(dir_a.path());
    let b = collect_data_files(dir_b.path());
    assert!(!a.is_empty());
    assert_eq!(a.len(), b.len());
    for ((name_a, bytes_a), (name_b, bytes_b)) in a.iter().zip(b.iter()) {
        assert_eq!(name_a, name_b);
        assert_eq!(bytes_a, bytes_b, "file {} differs between runs", name_a);
    }
}

#[test]
fn property_truck_order_does_not_matter() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    let config_a = GeneratorConfig::default()
        .with_trucks(2)
        .with_days(2)
        .with_workers(1)
        .with_output_dir(dir_a.path());
    let fleet_a = Fleet::build(&config_a).unwrap();
    let sink_a = CsvSink::new(dir_a.path());
    BatchRunner::new(&config_a, &fleet_a, &sink_a).run().unwrap();

    let config_b = GeneratorConfig::default()
        .with_trucks(2)
        .with_days(2)
        .with_workers(1)
        .with_output_dir(dir_b.path());
    let mut fleet_b = Fleet::build(&config_b).unwrap();
    fleet_b.trucks.reverse();
    let sink_b = CsvSink::new(dir_b.path());
    BatchRunner::new(&config_b, &fleet_b, &sink_b).run().unwrap();

    let a = collect_data_files(dir_a.path());
    let b = collect_data_files(dir_b.path());
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Schema properties
// ---------------------------------------------------------------------------

#[test]
fn property_rows_carry_full_schema() {
    let dir = TempDir::new().unwrap();
    let config = GeneratorConfig::default()
        .with_trucks(1)
        .with_days(1)
        .with_workers(1)
        .with_output_dir(dir.path());
    let fleet = Fleet::build(&config).unwrap();
    let sink = CsvSink::new(dir.path());
    BatchRunner::new(&config, &fleet, &sink).run().unwrap();

    let text = fs::read_to_string(day_file(dir.path(), 1, 0)).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(header.len(), COLUMN_COUNT);
    assert_eq!(header[0], "timestamp");
    assert_eq!(header[5], "rpm_est");
    assert_eq!(header[226], "fault_mode");
    assert_eq!(header[229], "path_a_label");

    let mut count = 0;
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), COLUMN_COUNT);
        // All feature columns parse as finite floats.
        for field in &fields[5..226] {
            let value: f64 = field.parse().unwrap();
            assert!(value.is_finite());
        }
        // Labels are well-formed.
        assert!(fields[226] == "HEALTHY" || fields[226].starts_with("FM-0"));
        assert!(fields[227] == "HEALTHY" || fields[227].starts_with("STAGE"));
        let rul: f64 = fields[228].parse().unwrap();
        assert!(rul >= 0.0);
        assert!(["NORMAL", "IMMINENT", "CRITICAL"].contains(&fields[229]));
        // RUL sentinel exactly when the row is healthy (no improving faults
        // exist in this run).
        assert_eq!(rul == RUL_SENTINEL, fields[226] == "HEALTHY");
        count += 1;
    }
    assert_eq!(count, WINDOWS_PER_DAY);
}
