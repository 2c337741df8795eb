use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use damage_core::{
    ApplyMode, DamageEvent, DamageSnapshot, DamageZoneService, OverlayRenderer, ServiceOptions,
    VehicleId, ZoneCatalog,
};

fn bench_render(c: &mut Criterion) {
    let catalog = ZoneCatalog::reference();
    let renderer = OverlayRenderer::default();
    let mut group = c.benchmark_group("render");

    for damaged in [0usize, 2, 4, 8] {
        let mut snapshot = DamageSnapshot::default();
        for (index, zone) in catalog.ids().take(damaged).enumerate() {
            snapshot
                .severities
                .insert(zone.clone(), (index + 1) as f32 / damaged.max(1) as f32);
        }
        group.bench_with_input(
            BenchmarkId::new("damaged_zones", damaged),
            &snapshot,
            |b, snapshot| b.iter(|| renderer.render(&catalog, snapshot)),
        );
    }

    group.finish();
}

fn bench_fleet(c: &mut Criterion) {
    let mut group = c.benchmark_group("fleet");

    for size in [8usize, 64, 256] {
        let service = DamageZoneService::new(
            Arc::new(ZoneCatalog::reference()),
            ServiceOptions::default(),
        );
        let vehicles: Vec<VehicleId> = (0..size).map(|i| VehicleId::new(format!("car-{i}"))).collect();
        for vehicle in &vehicles {
            let _ = service.record_event(&DamageEvent::tagged(
                vehicle.as_str(),
                "tyres",
                0.4,
                ApplyMode::Delta,
            ));
        }
        group.bench_with_input(BenchmarkId::new("overlays", size), &vehicles, |b, vehicles| {
            b.iter(|| service.overlays(vehicles))
        });
    }

    group.finish();
}

criterion_group!(render_benches, bench_render, bench_fleet);
criterion_main!(render_benches);
