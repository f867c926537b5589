// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::items_after_statements)] // Test helpers

//! Instance bridge integration tests.
//!
//! Drives a registered class the way the engine does: construct it, read and
//! write properties through the property protocol, call methods through both
//! entries, dispatch virtuals, hot-reload and free.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use gdbridge::abi::CallErrorKind;
use gdbridge::class::{ClassSpec, ExtensionClass, Node, Node2D, OnCreate, OnFree};
use gdbridge::property::Field;
use gdbridge::types::{GString, ObjectPtr, ToVariant, Variant};
use gdbridge::{registrar, registry, testing, ObjectRef};

struct Rover {
    base: ObjectPtr,
    battery: i64,
    label: String,
    odometer: f64,
    tether: ObjectRef,
}

static ROVERS_FREED: AtomicUsize = AtomicUsize::new(0);

impl OnCreate for Rover {
    fn on_create(&mut self, base: ObjectPtr) {
        self.base = base;
    }
}

impl OnFree for Rover {
    fn on_free(&mut self) {
        ROVERS_FREED.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Display for Rover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rover({}, {}%)", self.label, self.battery)
    }
}

impl ExtensionClass for Rover {
    type Base = Node2D;

    fn create() -> Self {
        Rover {
            base: ObjectPtr::default(),
            battery: 80,
            label: "scout".into(),
            odometer: 0.0,
            tether: ObjectRef::null(),
        }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::property("battery", |r: &Rover| &r.battery, |r: &mut Rover| &mut r.battery).default("80"))
            .field(Field::property("label", |r: &Rover| &r.label, |r: &mut Rover| &mut r.label))
            .field(Field::property("odometer", |r: &Rover| &r.odometer, |r: &mut Rover| &mut r.odometer))
            .field(
                Field::property("tether", |r: &Rover| &r.tether, |r: &mut Rover| &mut r.tether)
                    .class_hint("RefCounted"),
            )
            .method("drive", |r: &mut Rover, distance: f64, cost: i32| {
                r.odometer += distance;
                r.battery -= i64::from(cost);
                r.battery
            })
            .method("name_tag", |r: &mut Rover| r.label.clone())
            // Reads its own property back through the engine while borrowed.
            .method("self_read", |r: &mut Rover| r.base.get("battery").is_none())
            .virtual_method("_process", |r: &mut Rover, delta: f64| r.odometer += delta)
            .on_create()
            .on_free()
            .display();
    }
}

struct Gauge {
    needle: u8,
    count: i32,
}

impl ExtensionClass for Gauge {
    type Base = Node;

    fn create() -> Self {
        Gauge { needle: 10, count: 0 }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::property("needle", |g: &Gauge| &g.needle, |g: &mut Gauge| &mut g.needle))
            .method("set_count", |g: &mut Gauge, count: i32| {
                g.count = count;
                g.count
            })
            .static_method("full_scale", || 255i64)
            .static_method("scale", |value: f64, factor: i32| value * f64::from(factor));
    }
}

fn setup() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        testing::install();
        registrar::register::<Rover>().expect("Rover registers");
        registrar::register::<Gauge>().expect("Gauge registers");
    });
}

fn spawn_rover() -> ObjectPtr {
    setup();
    testing::instantiate("Rover").expect("extension class constructs")
}

fn battery(rover: ObjectPtr) -> Option<i64> {
    rover.get("battery").and_then(|v| v.to::<i64>())
}

#[test]
fn construction_attaches_a_managed_instance() {
    let rover = spawn_rover();
    assert_eq!(rover.class_name().as_deref(), Some("Rover"));
    assert!(rover.is_class("Node2D"));
    assert!(rover.is_class("Node"));

    let instance = registry::lookup::<Rover>(rover).expect("bridged");
    assert_eq!(instance.object(), rover);
    assert_eq!(instance.instance_id(), rover.instance_id());
    assert_eq!(instance.with(|r| r.base), Some(rover));
    testing::free(rover);
}

#[test]
fn properties_round_trip_through_the_engine() {
    let rover = spawn_rover();
    assert_eq!(battery(rover), Some(80));

    assert!(rover.set("battery", &42i64.to_variant()));
    assert_eq!(battery(rover), Some(42));

    assert!(rover.set("label", &"relay".to_variant()));
    assert_eq!(rover.get("label").and_then(|v| v.to::<String>()).as_deref(), Some("relay"));

    // Wrong type and unknown names are refused without touching the value.
    assert!(!rover.set("battery", &"full".to_variant()));
    assert_eq!(battery(rover), Some(42));
    assert!(!rover.set("payload", &1i64.to_variant()));
    assert!(rover.get("payload").is_none());
    testing::free(rover);
}

#[test]
fn revert_uses_declared_defaults() {
    let rover = spawn_rover();
    assert!(testing::can_revert(rover, "battery"));
    assert_eq!(
        testing::get_revert(rover, "battery").and_then(|v| v.to::<i64>()),
        Some(80)
    );
    assert!(!testing::can_revert(rover, "label"));
    assert!(testing::get_revert(rover, "label").is_none());
    testing::free(rover);
}

#[test]
fn property_list_matches_registration() {
    let rover = spawn_rover();
    let listed = testing::property_list(rover);
    let record = testing::class_record("Rover").expect("registered");
    assert_eq!(listed, record.properties);
    let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["battery", "label", "odometer", "tether"]);
    assert_eq!(listed[3].class_name, "RefCounted");
    testing::free(rover);
}

#[test]
fn to_string_uses_display() {
    let rover = spawn_rover();
    assert_eq!(testing::to_string(rover), "Rover(scout, 80%)");
    testing::free(rover);
}

#[test]
fn variant_calls_check_arguments() {
    let rover = spawn_rover();
    let left = testing::call(rover, "drive", &[&2.5f64.to_variant(), &30i64.to_variant()])
        .expect("valid call");
    assert_eq!(left.to::<i64>(), Some(50));

    assert_eq!(
        testing::call(rover, "drive", &[&2.5f64.to_variant()]).err(),
        Some(CallErrorKind::TooFewArguments)
    );
    assert_eq!(
        testing::call(rover, "drive", &[&"far".to_variant(), &1i64.to_variant()]).err(),
        Some(CallErrorKind::InvalidArgument)
    );
    assert_eq!(
        testing::call(rover, "fly", &[]).err(),
        Some(CallErrorKind::InvalidMethod)
    );
    assert_eq!(
        testing::call(ObjectPtr::default(), "drive", &[]).err(),
        Some(CallErrorKind::InstanceIsNull)
    );

    let tag = testing::call(rover, "name_tag", &[]).expect("no arguments");
    assert_eq!(tag.to::<String>().as_deref(), Some("scout"));
    testing::free(rover);
}

#[test]
fn typed_calls_use_call_frames() {
    let rover = spawn_rover();
    let left: Option<i64> = testing::ptrcall(rover, "drive", (4.0f64, 10i32));
    assert_eq!(left, Some(70));
    let instance = registry::lookup::<Rover>(rover).expect("bridged");
    assert_eq!(instance.with(|r| r.odometer), Some(4.0));

    let tag: Option<GString> = testing::ptrcall(rover, "name_tag", ());
    assert_eq!(tag.map(|t| t.to_string()).as_deref(), Some("scout"));
    testing::free(rover);
}

#[test]
fn virtual_dispatch_reaches_the_override() {
    let rover = spawn_rover();
    assert_eq!(testing::call_virtual::<(f64,), ()>(rover, "_process", (0.5,)), Some(()));
    assert_eq!(testing::call_virtual::<(f64,), ()>(rover, "_process", (0.25,)), Some(()));
    let instance = registry::lookup::<Rover>(rover).expect("bridged");
    assert_eq!(instance.with(|r| r.odometer), Some(0.75));

    assert!(testing::call_virtual::<(), ()>(rover, "_enter_tree", ()).is_none());
    testing::free(rover);
}

#[test]
fn reentrant_access_is_refused_not_deadlocked() {
    let rover = spawn_rover();
    let refused = testing::call(rover, "self_read", &[]).expect("call completes");
    assert_eq!(refused.to::<bool>(), Some(true));
    // Outside the call the property reads normally again.
    assert_eq!(battery(rover), Some(80));
    testing::free(rover);
}

#[test]
fn object_properties_hold_a_reference() {
    let rover = spawn_rover();
    let cable = testing::instantiate("RefCounted").expect("native class");
    assert!(rover.set("tether", &cable.to_variant()));
    assert_eq!(testing::refcount(cable), Some(1));
    assert_eq!(
        rover.get("tether").and_then(|v| v.to::<ObjectPtr>()),
        Some(cable)
    );

    // Clearing the last holder releases and destroys the object.
    assert!(rover.set("tether", &Variant::nil()));
    assert!(!testing::is_alive(cable));
    testing::free(rover);
}

#[test]
fn free_tears_down_the_instance() {
    let rover = spawn_rover();
    let spare = testing::instantiate("RefCounted").expect("native class");
    assert!(rover.set("tether", &spare.to_variant()));
    let before = ROVERS_FREED.load(Ordering::SeqCst);

    testing::free(rover);
    assert!(!testing::is_alive(rover));
    assert!(registry::lookup::<Rover>(rover).is_none());
    assert!(ROVERS_FREED.load(Ordering::SeqCst) > before);
    // The reference the property held went with it.
    assert!(!testing::is_alive(spare));
}

#[test]
fn reload_rebuilds_managed_state() {
    let rover = spawn_rover();
    assert!(rover.set("battery", &7i64.to_variant()));
    let stale = registry::lookup::<Rover>(rover).expect("bridged");

    assert!(testing::reload(rover));
    let fresh = registry::lookup::<Rover>(rover).expect("still bridged");
    assert!(!std::sync::Arc::ptr_eq(&stale, &fresh));
    assert_eq!(battery(rover), Some(80));
    assert_eq!(fresh.with(|r| r.base), Some(rover));
    testing::free(rover);
}

#[test]
fn sibling_instances_are_independent() {
    let first = spawn_rover();
    let second = spawn_rover();
    assert_ne!(first, second);
    assert!(registry::get(first).is_some());
    assert!(registry::get(second).is_some());

    assert!(second.set("battery", &12i64.to_variant()));
    assert_eq!(battery(first), Some(80));

    testing::free(first);
    assert!(registry::get(first).is_none());
    let survivor = registry::lookup::<Rover>(second).expect("still bridged");
    assert_eq!(survivor.object(), second);
    assert_eq!(battery(second), Some(12));
    let tag = testing::call(second, "name_tag", &[]).expect("still callable");
    assert_eq!(tag.to::<String>().as_deref(), Some("scout"));
    testing::free(second);
}

fn needle(gauge: ObjectPtr) -> Option<u8> {
    gauge.get("needle").and_then(|v| v.to::<u8>())
}

#[test]
fn narrow_properties_refuse_out_of_range_values() {
    setup();
    let gauge = testing::instantiate("Gauge").expect("extension class constructs");
    assert!(gauge.set("needle", &200i64.to_variant()));
    assert_eq!(needle(gauge), Some(200));

    assert!(!gauge.set("needle", &300i64.to_variant()));
    assert!(!gauge.set("needle", &(-1i64).to_variant()));
    assert_eq!(needle(gauge), Some(200));
    testing::free(gauge);
}

#[test]
fn narrow_arguments_refuse_out_of_range_values() {
    setup();
    let gauge = testing::instantiate("Gauge").expect("extension class constructs");
    let echoed = testing::call(gauge, "set_count", &[&(-7i64).to_variant()]).expect("fits i32");
    assert_eq!(echoed.to::<i64>(), Some(-7));

    assert_eq!(
        testing::call(gauge, "set_count", &[&((1i64 << 40) | 5).to_variant()]).err(),
        Some(CallErrorKind::InvalidArgument)
    );
    let instance = registry::lookup::<Gauge>(gauge).expect("bridged");
    assert_eq!(instance.with(|g| g.count), Some(-7));
    testing::free(gauge);
}

#[test]
fn static_methods_need_no_instance() {
    setup();
    let full = testing::call_static("Gauge", "full_scale", &[]).expect("static call");
    assert_eq!(full.to::<i64>(), Some(255));

    let scaled = testing::call_static("Gauge", "scale", &[&1.5f64.to_variant(), &4i64.to_variant()])
        .expect("static call");
    assert_eq!(scaled.to::<f64>(), Some(6.0));
    assert_eq!(
        testing::call_static("Gauge", "scale", &[&1.5f64.to_variant()]).err(),
        Some(CallErrorKind::TooFewArguments)
    );

    let typed: Option<f64> = testing::ptrcall_static("Gauge", "scale", (2.0f64, 3i32));
    assert_eq!(typed, Some(6.0));

    // Calling through an object reaches the same function.
    let gauge = testing::instantiate("Gauge").expect("extension class constructs");
    let through = testing::call(gauge, "full_scale", &[]).expect("static via object");
    assert_eq!(through.to::<i64>(), Some(255));
    let typed: Option<i64> = testing::ptrcall(gauge, "full_scale", ());
    assert_eq!(typed, Some(255));
    testing::free(gauge);
}
