// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use gdbridge::callframe::{CallFrame, WireArgs};
use gdbridge::class::{ClassSpec, ExtensionClass, Node};
use gdbridge::property::Field;
use gdbridge::types::{ObjectPtr, ToVariant, Vector3};
use gdbridge::{registrar, testing};

// ============================================================================
// Frame construction
// ============================================================================

/// Benchmark: pack three scalars and read an int return.
fn bench_frame_scalars(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(7);
    c.bench_function("frame_scalars", |b| {
        b.iter_batched(
            || (rng.i64(..), rng.f64(), rng.bool()),
            |args| {
                let mut frame = CallFrame::for_signature::<(i64, f64, bool), i64>();
                args.push_all(&mut frame);
                black_box(frame.arg_ptrs());
                frame.prepare_return::<i64>();
                black_box(frame.ret_ptr());
                black_box(frame.take_return::<i64>())
            },
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark: multi-word plain values.
fn bench_frame_vectors(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(11);
    let mut vector = move || Vector3::new(rng.f32(), rng.f32(), rng.f32());
    c.bench_function("frame_vector3_pair", |b| {
        b.iter_batched(
            || (vector(), vector()),
            |args| {
                let mut frame = CallFrame::for_signature::<(Vector3, Vector3), Vector3>();
                args.push_all(&mut frame);
                black_box(frame.arg_ptrs());
                frame.prepare_return::<Vector3>();
                black_box(frame.take_return::<Vector3>())
            },
            BatchSize::SmallInput,
        )
    });
}

// ============================================================================
// Engine round trips (in-process engine)
// ============================================================================

struct Accumulator {
    total: i64,
}

impl ExtensionClass for Accumulator {
    type Base = Node;

    fn create() -> Self {
        Accumulator { total: 0 }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::property("total", |a: &Accumulator| &a.total, |a: &mut Accumulator| &mut a.total))
            .method("add", |a: &mut Accumulator, amount: i64| {
                a.total = a.total.wrapping_add(amount);
                a.total
            });
    }
}

fn accumulator() -> ObjectPtr {
    testing::install();
    if !registrar::is_registered("Accumulator") {
        registrar::register::<Accumulator>().expect("Accumulator registers");
    }
    testing::instantiate("Accumulator").expect("constructs")
}

/// Benchmark: typed call into an extension method.
fn bench_ptrcall_method(c: &mut Criterion) {
    let object = accumulator();
    let mut rng = fastrand::Rng::with_seed(3);
    c.bench_function("ptrcall_extension_method", |b| {
        b.iter(|| {
            let total: Option<i64> = testing::ptrcall(object, "add", (black_box(rng.i64(-8..8)),));
            black_box(total)
        })
    });
    testing::free(object);
}

/// Benchmark: the same call through variants.
fn bench_variant_call(c: &mut Criterion) {
    let object = accumulator();
    let amount = 5i64.to_variant();
    c.bench_function("variant_call_extension_method", |b| {
        b.iter(|| black_box(testing::call(object, "add", &[&amount])))
    });
    testing::free(object);
}

/// Benchmark: property write then read through the property protocol.
fn bench_property_round_trip(c: &mut Criterion) {
    let object = accumulator();
    let mut rng = fastrand::Rng::with_seed(5);
    c.bench_function("property_set_get", |b| {
        b.iter(|| {
            black_box(object.set("total", &rng.i64(..).to_variant()));
            black_box(object.get("total"))
        })
    });
    testing::free(object);
}

criterion_group!(frames, bench_frame_scalars, bench_frame_vectors);
criterion_group!(round_trips, bench_ptrcall_method, bench_variant_call, bench_property_round_trip);
criterion_main!(frames, round_trips);
