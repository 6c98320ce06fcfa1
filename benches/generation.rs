//! Benchmarks for truck-day generation throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fleetgen::faults::{FaultEpisode, FaultModeId};
use fleetgen::thermal::idle_temps;
use fleetgen::{generate_truck_day, Fleet, GeneratorConfig, MaintenanceState};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_truck_day(c: &mut Criterion) {
    let config = GeneratorConfig::default().with_trucks(5);
    let fleet = Fleet::build(&config).unwrap();
    let truck = fleet.truck(1).unwrap().clone();
    let temps = idle_temps(&truck, 15.0);

    let healthy = MaintenanceState::new(1, Vec::new());
    c.bench_function("truck_day_healthy", |b| {
        b.iter(|| generate_truck_day(black_box(&truck), &healthy, temps, 0).unwrap())
    });

    let mut rng = StdRng::seed_from_u64(7);
    let faults = vec![
        FaultEpisode::sample(FaultModeId::Fm01Bearing, -2000.0, truck.variant, &mut rng),
        FaultEpisode::sample(FaultModeId::Fm06Injector, -500.0, truck.variant, &mut rng),
        FaultEpisode::sample(FaultModeId::Fm07EgrCooler, -300.0, truck.variant, &mut rng),
    ];
    let faulty = MaintenanceState::new(1, faults);
    c.bench_function("truck_day_three_faults", |b| {
        b.iter(|| generate_truck_day(black_box(&truck), &faulty, temps, 0).unwrap())
    });
}

criterion_group!(benches, bench_truck_day);
criterion_main!(benches);
