//! Benchmarks for gateway dispatch and pool assignment.
//!
//! Run with: cargo bench --bench dispatch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use smsgw::config::GatewayConfig;
use smsgw::gateway::Gateway;
use smsgw::pool::NumberPool;
use smsgw::provider::{Message, MockProvider};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn gateway(failing_ahead: usize) -> Gateway {
    let mut gw = Gateway::new(GatewayConfig::default());
    for i in 0..failing_ahead {
        gw.register_provider(
            &format!("failing-{i}"),
            Arc::new(MockProvider::error("rejected")),
            false,
        )
        .unwrap();
    }
    gw.register_provider("ok", Arc::new(MockProvider::success()), false)
        .unwrap();
    gw
}

fn bench_send_failover_depth(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch/send_failover_depth");

    for depth in [0usize, 1, 4].iter() {
        let gw = gateway(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(gw.send("+12025551234", "hello", None).await.unwrap())
                })
            })
        });
    }

    group.finish();
}

fn bench_send_bulk(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch/send_bulk");

    for size in [10usize, 100, 1000].iter() {
        let gw = gateway(1);
        let messages: Vec<Message> = (0..*size)
            .map(|i| Message::new(format!("+2588{:08}", i), "hello"))
            .collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| rt.block_on(async { black_box(gw.send_bulk(&messages, 10).await) }))
        });
    }

    group.finish();
}

fn bench_pool_assign_release(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pool = NumberPool::new(u32::MAX);
    rt.block_on(pool.add_numbers_bulk(
        (0..500).map(|i| (format!("+1437784{:04}", i), "telnyx".to_string())),
    ));

    c.bench_function("dispatch/pool_assign_release", |b| {
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            let target = format!("+2588{:08}", id);
            rt.block_on(async {
                let number = pool.assign_number(&target, None).await.unwrap();
                black_box(pool.release_number(&number, false).await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_send_failover_depth,
    bench_send_bulk,
    bench_pool_assign_release
);
criterion_main!(benches);
