// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Frame-driven reference reconciliation.
//!
//! The pass runs from the next bridge callback after the engine's frame
//! counter moves. Tests in this binary share the counter, so each one keeps
//! advancing frames until the state it waits for is reached.

use gdbridge::ownership::{reconcile_if_due, reconciler};
use gdbridge::testing;
use gdbridge::ObjectRef;

/// Advance frames until `done` holds, running the callback hook each time.
fn settle(done: impl Fn() -> bool) -> bool {
    for _ in 0..4 {
        if done() {
            return true;
        }
        testing::advance_frame();
        reconcile_if_due();
    }
    done()
}

#[test]
fn freed_objects_invalidate_their_references() {
    let node = testing::instantiate("Node").expect("native class");
    let first = ObjectRef::new(node);
    let second = ObjectRef::new(node);
    assert_eq!(first, second);
    assert_eq!(first.get(), Some(node));
    let id = node.instance_id();

    testing::free(node);
    assert!(settle(|| !first.is_valid()));
    assert!(!second.is_valid());
    assert_eq!(second.as_ptr(), Default::default());
    // The id survives invalidation.
    assert_eq!(first.instance_id(), Some(id));
}

#[test]
fn live_objects_stay_valid_across_frames() {
    let node = testing::instantiate("Node2D").expect("native class");
    let held = ObjectRef::new(node);
    for _ in 0..3 {
        testing::advance_frame();
        reconcile_if_due();
    }
    assert!(held.is_valid());
    assert!(testing::is_alive(node));
    testing::free(node);
}

#[test]
fn dropped_retained_reference_is_released_by_the_pass() {
    let counted = testing::instantiate("RefCounted").expect("native class");
    let held = ObjectRef::retained(counted);
    assert!(held.holds_reference());
    assert_eq!(testing::refcount(counted), Some(1));

    drop(held);
    // Nothing is released until a pass notices the entry is unheld.
    assert!(settle(|| !testing::is_alive(counted)));
}

#[test]
fn shared_holders_keep_the_reference() {
    let counted = testing::instantiate("RefCounted").expect("native class");
    let first = ObjectRef::retained(counted);
    let second = first.clone();
    // Retaining again shares the existing native reference.
    let third = ObjectRef::retained(counted);
    assert_eq!(testing::refcount(counted), Some(1));

    first.release_reference();
    assert!(testing::is_alive(counted));
    drop(first);
    drop(second);
    assert!(testing::is_alive(counted));

    third.release_reference();
    assert!(!testing::is_alive(counted));
    assert!(!third.is_valid());
}

#[test]
fn plain_references_never_take_a_native_reference() {
    let counted = testing::instantiate("RefCounted").expect("native class");
    let plain = ObjectRef::new(counted);
    assert!(!plain.holds_reference());
    assert_eq!(testing::refcount(counted), Some(0));
    assert!(reconciler().tracked_count() >= 1);
    testing::free(counted);
}
