use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use inos_bridge::Bridge;
use inos_fabric::Fabric;
use inos_physics::PhysicsUnit;

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_step");
    for entity_count in [1usize, 16, 128, 1024] {
        group.throughput(Throughput::Elements(entity_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entity_count),
            &entity_count,
            |b, &entity_count| {
                let fabric = Fabric::create_anon().unwrap();
                let mut bridge = Bridge::new(fabric);
                let unit = PhysicsUnit::new(&mut bridge, entity_count, 250.0);
                b.iter(|| unit.step(&bridge, 1.0 / 250.0));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
