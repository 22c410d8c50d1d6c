//! Criterion benchmarks for the devlink JSON codec.
//!
//! Measures the encode path for telemetry (the hot path on a device that
//! samples frequently) and the decode path for inbound commands and
//! firmware chunk frames.
//!
//! Run with:
//! ```bash
//! cargo bench --package devlink-core --bench codec_bench
//! ```

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use devlink_core::protocol::codec::infer_scalar;
use devlink_core::{
    ActuatorState, ActuatorStatus, Codec, Scalar, SensorReading, Value, WireMessage,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_readings() -> Vec<(&'static str, SensorReading)> {
    vec![
        ("int", SensorReading::new("P", 1013).with_timestamp(1_700_000_000_000)),
        ("float", SensorReading::new("T", 21.5).with_timestamp(1_700_000_000_000)),
        ("string", SensorReading::new("MSG", "He said \"hi\"\n")),
        (
            "tuple",
            SensorReading::new(
                "ACL",
                Value::Tuple(vec![Scalar::Float(0.1), Scalar::Float(-9.8), Scalar::Float(0.0)]),
            ),
        ),
    ]
}

fn make_configuration() -> BTreeMap<String, Value> {
    (0..16)
        .map(|n| (format!("C{n}"), Value::Int(n)))
        .collect()
}

fn make_chunk_frame(data_len: usize) -> WireMessage {
    let mut frame = vec![0u8; 32];
    frame.extend(std::iter::repeat(0x5A).take(data_len));
    frame.extend_from_slice(&[0xFF; 32]);
    WireMessage::binary("service/binary/dev1", frame)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let codec = Codec::new("dev1");
    let mut group = c.benchmark_group("encode_sensor_reading");
    for (name, reading) in make_readings() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &reading, |b, reading| {
            b.iter(|| codec.encode_sensor_reading(black_box(reading)))
        });
    }
    group.finish();

    let status = ActuatorStatus::new("SW", ActuatorState::Ready, true);
    c.bench_function("encode_actuator_status", |b| {
        b.iter(|| codec.encode_actuator_status(black_box(&status)))
    });

    let configuration = make_configuration();
    c.bench_function("encode_configuration_16", |b| {
        b.iter(|| codec.encode_configuration(black_box(&configuration)))
    });
}

fn bench_decode(c: &mut Criterion) {
    let codec = Codec::new("dev1");

    let command = WireMessage::text(
        "p2d/actuator_set/d/dev1/r/SW",
        r#"{"command":"SET","value":"true"}"#,
    );
    c.bench_function("decode_actuator_command", |b| {
        b.iter(|| codec.decode_actuator_command(black_box(&command)))
    });

    let mut group = c.benchmark_group("decode_firmware_chunk");
    for size in [256usize, 4096, 65_536] {
        let frame = make_chunk_frame(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| codec.decode_firmware_chunk(black_box(frame)))
        });
    }
    group.finish();

    c.bench_function("infer_scalar", |b| {
        b.iter(|| {
            infer_scalar(black_box("42"));
            infer_scalar(black_box("0.5"));
            infer_scalar(black_box("true"));
            infer_scalar(black_box("DEBUG"));
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
