// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Exact round trips
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Typed calls through call frames, one footprint at a time.
//!
//! Each value is passed to an extension method that hands it straight back,
//! so the argument slot, the return slot and the method thunk all see it.

use std::sync::Once;

use gdbridge::callframe::{CallFrame, Wire};
use gdbridge::class::{ClassSpec, ExtensionClass, RefCounted};
use gdbridge::types::{GString, ObjectPtr, PackedByteArray, ToVariant, Variant, Vector3};
use gdbridge::{registrar, testing};

const ROUNDS: usize = 32;

struct Mirror;

impl ExtensionClass for Mirror {
    type Base = RefCounted;

    fn create() -> Self {
        Mirror
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.method("echo_int", |_: &mut Mirror, v: i64| v)
            .method("echo_float", |_: &mut Mirror, v: f64| v)
            .method("echo_text", |_: &mut Mirror, v: GString| v)
            .method("echo_vector", |_: &mut Mirror, v: Vector3| v)
            .method("echo_bytes", |_: &mut Mirror, v: PackedByteArray| v)
            .method("echo_variant", |_: &mut Mirror, v: Variant| v)
            .method("sum", |_: &mut Mirror, a: i32, b: f32, c: Vector3| {
                f64::from(a) + f64::from(b) + f64::from(c.x + c.y + c.z)
            });
    }
}

fn mirror() -> ObjectPtr {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        testing::install();
        registrar::register::<Mirror>().expect("Mirror registers");
    });
    testing::instantiate("Mirror").expect("constructs")
}

#[test]
fn one_word_values_round_trip() {
    let object = mirror();
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..ROUNDS {
        let int = rng.i64(..);
        assert_eq!(testing::ptrcall::<_, i64>(object, "echo_int", (int,)), Some(int));

        let float = rng.f64() * 1e6 - 5e5;
        assert_eq!(testing::ptrcall::<_, f64>(object, "echo_float", (float,)), Some(float));

        let text: String = (0..rng.usize(0..24)).map(|_| rng.alphanumeric()).collect();
        let echoed = testing::ptrcall::<_, GString>(object, "echo_text", (GString::new(&text),));
        assert_eq!(echoed.map(|s| s.to_string()), Some(text));
    }
    testing::free(object);
}

#[test]
fn two_word_values_round_trip() {
    let object = mirror();
    let mut rng = fastrand::Rng::with_seed(0xface);
    assert_eq!(<Vector3 as Wire>::WORDS, 2);
    assert_eq!(<PackedByteArray as Wire>::WORDS, 2);
    for _ in 0..ROUNDS {
        let vector = Vector3::new(rng.f32(), -rng.f32(), rng.f32() * 100.0);
        assert_eq!(testing::ptrcall::<_, Vector3>(object, "echo_vector", (vector,)), Some(vector));

        let len = rng.usize(1..16);
        let mut bytes = testing::packed_zeroed::<u8>(len);
        let expected: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
        for (i, byte) in expected.iter().enumerate() {
            assert!(bytes.set(i, *byte));
        }
        let echoed = testing::ptrcall::<_, PackedByteArray>(object, "echo_bytes", (&bytes,)).expect("returned");
        let read: Vec<u8> = (0..len).filter_map(|i| echoed.get(i)).collect();
        assert_eq!(read, expected);
        assert!(echoed.get(len).is_none());
    }
    testing::free(object);
}

#[test]
fn three_word_values_round_trip() {
    let object = mirror();
    let mut rng = fastrand::Rng::with_seed(0xbeef);
    assert_eq!(<Variant as Wire>::WORDS, 3);
    for _ in 0..ROUNDS {
        let value = rng.i64(..).to_variant();
        let echoed = testing::ptrcall::<_, Variant>(object, "echo_variant", (&value,)).expect("returned");
        assert_eq!(echoed.to::<i64>(), value.to::<i64>());
    }
    let text = "mirror".to_variant();
    let echoed = testing::ptrcall::<_, Variant>(object, "echo_variant", (&text,)).expect("returned");
    assert_eq!(echoed.to::<String>().as_deref(), Some("mirror"));
    testing::free(object);
}

#[test]
fn mixed_footprints_keep_declaration_order() {
    let object = mirror();
    let total = testing::ptrcall::<_, f64>(object, "sum", (2i32, 0.5f32, Vector3::new(1.0, 2.0, 3.0)));
    assert_eq!(total, Some(8.5));

    let mut frame = CallFrame::new(&[1, 2, 3], 3);
    assert_eq!(frame.len_words(), 9);
    frame.push(&7i64);
    frame.push(&Vector3::new(0.0, 1.0, 0.0));
    let value = 11i64.to_variant();
    frame.push(&value);
    frame.arg_ptrs();
    unsafe {
        assert_eq!(frame.read_arg::<i64>(0), 7);
        assert_eq!(frame.read_arg::<Vector3>(1).y, 1.0);
        // Handle arguments are borrowed by the frame; the copy read back
        // aliases `value` and must not be dropped.
        let aliased = std::mem::ManuallyDrop::new(frame.read_arg::<Variant>(2));
        assert_eq!(aliased.to::<i64>(), Some(11));
    }
    testing::free(object);
}

#[test]
fn void_returns_use_an_empty_slot() {
    let mut frame = CallFrame::for_signature::<(i64,), ()>();
    assert_eq!(frame.len_words(), 1);
    frame.push(&1i64);
    frame.prepare_return::<()>();
    assert!(frame.ret_ptr().is_null());
    frame.take_return::<()>();
}
