// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Listener call benchmarks.
//
// Run with:
//   cargo bench --bench codec
//
// Groups:
//   encode_call   — event -> full call parcel (token + args)
//   stub_dispatch — full call parcel -> token check, decode, handler
//
// Each group runs three payload shapes:
//   bool    — ConnectionChanged, one word of arguments
//   strings — StateChanged, three UTF-16 strings
//   record  — VolumeStateChanged with a nested VolumeInfo

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use storage_listener::{
    EventPayload, ListenerStub, StorageEventListener, VolumeInfo, VolumeState, DEFAULT_DESCRIPTOR,
};

struct Sink;
impl StorageEventListener for Sink {}

fn workloads() -> Vec<(&'static str, EventPayload)> {
    vec![
        ("bool", EventPayload::ConnectionChanged { connected: true }),
        (
            "strings",
            EventPayload::StateChanged {
                path: "/storage/emulated/0".into(),
                old_state: VolumeState::Checking.environment_state().into(),
                new_state: VolumeState::Mounted.environment_state().into(),
            },
        ),
        (
            "record",
            EventPayload::VolumeStateChanged {
                volume: Some(VolumeInfo {
                    id: "public:179,65".into(),
                    disk_id: "disk:179,64".into(),
                    fs_type: "exfat".into(),
                    fs_uuid: "1234-5678".into(),
                    path: "/storage/1234-5678".into(),
                    internal_path: "/mnt/media_rw/1234-5678".into(),
                    state: VolumeState::Mounted.as_i32(),
                    ..Default::default()
                }),
                old_state: VolumeState::Checking.as_i32(),
                new_state: VolumeState::Mounted.as_i32(),
            },
        ),
    ]
}

fn bench_encode_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_call");

    for (label, ev) in workloads() {
        let size = ev.encode_call(DEFAULT_DESCRIPTOR).len();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &ev, |b, ev| {
            b.iter(|| black_box(ev.encode_call(DEFAULT_DESCRIPTOR)));
        });
    }

    group.finish();
}

fn bench_stub_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("stub_dispatch");
    let stub = ListenerStub::new(Sink);

    for (label, ev) in workloads() {
        let code = ev.code();
        let parcel = ev.encode_call(DEFAULT_DESCRIPTOR);
        group.throughput(Throughput::Bytes(parcel.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &parcel, |b, p| {
            b.iter(|| black_box(stub.on_transact(code, p.data())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode_call, bench_stub_dispatch);
criterion_main!(benches);
