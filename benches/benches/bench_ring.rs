use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use inos_fabric::layout::{self, slot};
use inos_fabric::{Fabric, RegionId};

fn bench_produce(c: &mut Criterion) {
    let mut fabric = Fabric::create_anon().unwrap();
    let ring = fabric.ring(
        RegionId::Inbox,
        RegionId::InboxReady,
        slot::INBOX_HEAD,
        slot::INBOX_TAIL,
        layout::INBOX_SLOT_BYTES,
    );
    let item = vec![0x42u8; 64];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));
    group.bench_function("produce_then_drain", |b| {
        b.iter(|| {
            let _ = ring.produce(black_box(&item));
            let mut out = vec![0u8; layout::INBOX_SLOT_BYTES];
            let _ = ring.consume(&mut out);
        });
    });
    drop(group);
}

fn bench_consume_empty(c: &mut Criterion) {
    let mut fabric = Fabric::create_anon().unwrap();
    let ring = fabric.ring(
        RegionId::HostOutbox,
        RegionId::HostOutboxReady,
        slot::HOST_OUTBOX_HEAD,
        slot::HOST_OUTBOX_TAIL,
        layout::HOST_OUTBOX_SLOT_BYTES,
    );
    let mut out = vec![0u8; layout::HOST_OUTBOX_SLOT_BYTES];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));
    group.bench_function("consume_empty", |b| {
        b.iter(|| black_box(ring.consume(&mut out)));
    });
    drop(group);
}

criterion_group!(benches, bench_produce, bench_consume_empty);
criterion_main!(benches);
