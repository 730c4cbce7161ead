//! Criterion benchmarks for the UCR device engine.
//!
//! A device ticks every millisecond or so, often on a small CPU, so the cost
//! of one tick (decode, dispatch, push) and of one MessagePack encode is what
//! matters here.
//!
//! Run with:
//! ```bash
//! cargo bench --package ucr-core --bench engine_bench
//! ```

use std::net::SocketAddr;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use ucr_core::domain::store::IoStore;
use ucr_core::transport::loopback::LoopbackTransport;
use ucr_core::{
    Category, Direction, DescriptorRegistry, DocumentCodec, Engine, EngineConfig, ManualClock,
    MsgPackCodec, OutboundDocument,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn controller() -> SocketAddr {
    SocketAddr::from(([192, 168, 0, 10], 9000))
}

/// A registry with every slot of every input category named.
fn full_registry() -> DescriptorRegistry {
    let mut registry = DescriptorRegistry::default();
    for category in Category::ALL {
        while registry
            .register(Direction::Input, category, &format!("{category}"))
            .is_ok()
        {}
    }
    registry
}

fn subscribed_engine() -> (Engine<LoopbackTransport, MsgPackCodec, ManualClock>, LoopbackTransport, ManualClock) {
    let transport = LoopbackTransport::new();
    let clock = ManualClock::new();
    let mut engine = Engine::with_parts(
        transport.clone(),
        MsgPackCodec,
        clock.clone(),
        EngineConfig {
            hostname: Some("bench".to_string()),
            ..Default::default()
        },
    );
    for i in 0..8 {
        let _ = engine.register(Direction::Input, Category::Axis, &format!("axis{i}"));
    }
    engine.set_subscriber(controller());
    (engine, transport, clock)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let registry = full_registry();
    let store = IoStore::default();
    let snapshot = store.snapshot_inputs(&registry);

    let documents = [
        ("ack", OutboundDocument::ack("bench")),
        ("subscriber_update_full", OutboundDocument::subscriber_update("bench", &snapshot)),
        (
            "bind_response",
            OutboundDocument::bind_response("bench", Category::Axis, 3, ucr_core::Value::Int(-120)),
        ),
    ];
    for (name, doc) in &documents {
        group.bench_with_input(BenchmarkId::new("msgpack", name), doc, |b, doc| {
            b.iter(|| MsgPackCodec.encode(black_box(doc)))
        });
    }
    group.finish();
}

fn bench_decode_set_outputs(c: &mut Criterion) {
    let entries: Vec<_> = (0..32).map(|i| json!({ "Index": i, "Value": i * 100 })).collect();
    let bytes = rmp_serde::to_vec_named(&json!({ "MsgType": 4, "a": entries }))
        .expect("encode fixture");

    c.bench_function("decode/set_outputs_32_axes", |b| {
        b.iter(|| MsgPackCodec.decode(black_box(&bytes)))
    });
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group.bench_function("idle", |b| {
        let (mut engine, _transport, _clock) = subscribed_engine();
        engine.tick();
        b.iter(|| black_box(engine.tick()))
    });

    group.bench_function("dirty_push", |b| {
        let (mut engine, transport, clock) = subscribed_engine();
        let mut value = 0i16;
        b.iter(|| {
            value = value.wrapping_add(1);
            engine.write_axis(0, value);
            clock.advance_ms(5);
            let report = engine.tick();
            transport.take_sent();
            black_box(report)
        })
    });

    group.bench_function("set_outputs_request", |b| {
        let (mut engine, transport, _clock) = subscribed_engine();
        let request = rmp_serde::to_vec_named(&json!({
            "MsgType": 4,
            "b": [{ "Index": 0, "Value": true }],
            "a": [{ "Index": 1, "Value": 512 }],
        }))
        .expect("encode fixture");
        b.iter(|| {
            transport.inject(request.clone(), controller());
            let report = engine.tick();
            transport.take_sent();
            black_box(report)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_set_outputs, bench_tick);
criterion_main!(benches);
