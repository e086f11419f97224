use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use inos_fabric::layout::slot;
use inos_fabric::{Fabric, PingPong, RegionId};

fn bench_publish(c: &mut Criterion) {
    let mut fabric = Fabric::create_anon().unwrap();
    let index = fabric.atomic_index();
    let a = fabric.region_ptr(RegionId::StateBufferA);
    let b = fabric.region_ptr(RegionId::StateBufferB);
    let (_, len) = RegionId::StateBufferA.window();
    let pp = unsafe { PingPong::new(index, slot::PINGPONG_ACTIVE, slot::PHYSICS_EPOCH, a, b, len) };

    let mut group = c.benchmark_group("pingpong");
    group.throughput(Throughput::Elements(1));
    group.bench_function("publish", |b| {
        b.iter(|| pp.publish(|buf| buf[0] = black_box(buf[0].wrapping_add(1))));
    });
    drop(group);
}

fn bench_read(c: &mut Criterion) {
    let mut fabric = Fabric::create_anon().unwrap();
    let index = fabric.atomic_index();
    let a = fabric.region_ptr(RegionId::StateBufferA);
    let b = fabric.region_ptr(RegionId::StateBufferB);
    let (_, len) = RegionId::StateBufferA.window();
    let pp = unsafe { PingPong::new(index, slot::PINGPONG_ACTIVE, slot::PHYSICS_EPOCH, a, b, len) };
    pp.publish(|buf| buf[0] = 7);

    let mut group = c.benchmark_group("pingpong");
    group.throughput(Throughput::Elements(1));
    group.bench_function("read", |b| {
        b.iter(|| pp.read(|buf| black_box(buf[0])));
    });
    drop(group);
}

criterion_group!(benches, bench_publish, bench_read);
criterion_main!(benches);
