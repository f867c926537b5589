// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::too_many_lines)] // Test code

//! Class registration against the in-process engine.
//!
//! Checks what the class database receives for a declared class: properties
//! in layout order with their groups, signals with parameter names, methods
//! with their signatures, integer constants, and the registration errors an
//! authoring mistake produces.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use gdbridge::abi::{hint, method_flags, usage};
use gdbridge::class::{ClassSpec, ExtensionClass, Node, Node2D, OnRegister, RefCounted};
use gdbridge::property::Field;
use gdbridge::registrar;
use gdbridge::signal::Signal;
use gdbridge::testing::{self, LayoutRecord, PropertyRecord};
use gdbridge::{RegistrationError, VariantType};

#[derive(Default)]
struct Damping {
    linear: f32,
    angular: f32,
}

#[derive(Default)]
struct Movement {
    max_speed: f64,
    damping: Damping,
}

struct Ship {
    hull: i64,
    callsign: String,
    movement: Movement,
    docked: Signal<(String, i64)>,
    destroyed: Signal<()>,
}

static SHIP_REGISTERED: AtomicUsize = AtomicUsize::new(0);

impl OnRegister for Ship {
    fn on_register(class_name: &str) {
        assert_eq!(class_name, "Ship");
        SHIP_REGISTERED.fetch_add(1, Ordering::SeqCst);
    }
}

impl ExtensionClass for Ship {
    type Base = Node2D;

    fn create() -> Self {
        Ship {
            hull: 100,
            callsign: "Nomad".into(),
            movement: Movement::default(),
            docked: Signal::new(),
            destroyed: Signal::new(),
        }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(
            Field::property("Hull", |s: &Ship| &s.hull, |s: &mut Ship| &mut s.hull)
                .default("100")
                .hint(hint::RANGE, "0,200"),
        )
        .field(Field::property("callsign", |s: &Ship| &s.callsign, |s: &mut Ship| &mut s.callsign))
        .field(Field::group(
            "Movement",
            |s: &Ship| &s.movement,
            |s: &mut Ship| &mut s.movement,
            vec![
                Field::property("MaxSpeed", |m: &Movement| &m.max_speed, |m: &mut Movement| &mut m.max_speed),
                Field::group(
                    "Damping",
                    |m: &Movement| &m.damping,
                    |m: &mut Movement| &mut m.damping,
                    vec![
                        Field::property("linear", |d: &Damping| &d.linear, |d: &mut Damping| &mut d.linear),
                        Field::property("angular", |d: &Damping| &d.angular, |d: &mut Damping| &mut d.angular),
                    ],
                ),
            ],
        ))
        .field(Field::signal("docked(port, bay)", |s: &mut Ship| &mut s.docked))
        .field(Field::signal("destroyed", |s: &mut Ship| &mut s.destroyed))
        .method("repair", |s: &mut Ship, amount: i32| {
            s.hull += i64::from(amount);
            s.hull
        })
        .method("scrap", |s: &mut Ship| s.hull = 0)
        .static_method("clamp_hull", |value: i64| value.clamp(0, 200))
        .virtual_method("_process", |s: &mut Ship, delta: f64| s.movement.max_speed += delta)
        .constant("HullClass", "FRIGATE", 1)
        .constant("HullClass", "CRUISER", 2)
        .constant("", "MAX_CREW", 40)
        .on_register();
    }
}

fn setup() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        testing::install();
        registrar::register::<Ship>().expect("Ship registers");
    });
}

#[test]
fn class_is_known_with_its_parent() {
    setup();
    let record = testing::class_record("Ship").expect("registered");
    assert_eq!(record.parent, "Node2D");
    assert!(registrar::is_registered("Ship"));
    assert!(registrar::registered_classes().contains(&"Ship".to_string()));
    assert_eq!(SHIP_REGISTERED.load(Ordering::SeqCst), 1);

    let descriptor = registrar::descriptor::<Ship>().expect("descriptor");
    assert_eq!(descriptor.base(), "Node2D");
    assert!(!descriptor.is_tool());
}

#[test]
fn properties_follow_layout_with_nested_groups() {
    setup();
    let record = testing::class_record("Ship").expect("registered");
    let group = |name: &str, prefix: &str| LayoutRecord::Group {
        name: name.into(),
        prefix: prefix.into(),
    };
    let subgroup = |name: &str, prefix: &str| LayoutRecord::Subgroup {
        name: name.into(),
        prefix: prefix.into(),
    };
    let property = |name: &str| LayoutRecord::Property(name.into());

    assert_eq!(
        record.layout,
        vec![
            property("hull"),
            property("callsign"),
            group("Movement", "movement_"),
            property("movement_max_speed"),
            subgroup("Damping", "movement_damping_"),
            property("movement_damping_linear"),
            property("movement_damping_angular"),
            subgroup("", ""),
            group("", ""),
        ]
    );

    let types: Vec<(&str, VariantType)> = record
        .properties
        .iter()
        .map(|p| (p.name.as_str(), p.variant_type))
        .collect();
    assert_eq!(
        types,
        [
            ("hull", VariantType::Int),
            ("callsign", VariantType::String),
            ("movement_max_speed", VariantType::Float),
            ("movement_damping_linear", VariantType::Float),
            ("movement_damping_angular", VariantType::Float),
        ]
    );
}

#[test]
fn property_hints_and_usage_reach_the_engine() {
    setup();
    let record = testing::class_record("Ship").expect("registered");
    assert_eq!(
        record.property("hull"),
        Some(&PropertyRecord {
            name: "hull".into(),
            variant_type: VariantType::Int,
            class_name: String::new(),
            hint: hint::RANGE,
            hint_string: "0,200".into(),
            usage: usage::DEFAULT,
        })
    );
    assert_eq!(record.property("callsign").map(|p| p.hint), Some(hint::NONE));
}

#[test]
fn signals_carry_parameter_names_and_types() {
    setup();
    let record = testing::class_record("Ship").expect("registered");
    let docked = record.signal("docked").expect("docked");
    let params: Vec<(&str, VariantType)> = docked
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.variant_type))
        .collect();
    assert_eq!(params, [("port", VariantType::String), ("bay", VariantType::Int)]);
    assert!(record.signal("destroyed").is_some_and(|s| s.params.is_empty()));
}

#[test]
fn methods_are_registered_with_signatures() {
    setup();
    let record = testing::class_record("Ship").expect("registered");

    let repair = record.method("repair").expect("repair");
    assert_eq!(repair.args, vec![VariantType::Int]);
    assert_eq!(repair.ret, Some(VariantType::Int));
    assert_eq!(repair.flags, method_flags::DEFAULT);

    let scrap = record.method("scrap").expect("scrap");
    assert!(scrap.args.is_empty());
    assert_eq!(scrap.ret, None);

    let clamp = record.method("clamp_hull").expect("clamp_hull");
    assert_eq!(clamp.args, vec![VariantType::Int]);
    assert_eq!(clamp.ret, Some(VariantType::Int));
    assert_ne!(clamp.flags & method_flags::STATIC, 0);
    assert_eq!(repair.flags & method_flags::STATIC, 0);

    // Virtual overrides are dispatched, not registered as methods.
    assert!(record.method("_process").is_none());
    assert!(testing::has_virtual("Ship", "_process"));
    assert!(!testing::has_virtual("Ship", "_physics_process"));
}

#[test]
fn constants_keep_enum_grouping() {
    setup();
    let record = testing::class_record("Ship").expect("registered");
    assert_eq!(
        record.constants,
        vec![
            ("HullClass".to_string(), "FRIGATE".to_string(), 1),
            ("HullClass".to_string(), "CRUISER".to_string(), 2),
            (String::new(), "MAX_CREW".to_string(), 40),
        ]
    );
}

#[test]
fn second_registration_is_rejected() {
    setup();
    let err = registrar::register::<Ship>().err().expect("already registered");
    assert!(matches!(err, RegistrationError::DuplicateClass(ref name) if name == "Ship"));
}

struct Ledger {
    serial: u64,
}

impl ExtensionClass for Ledger {
    type Base = RefCounted;

    fn create() -> Self {
        Ledger { serial: 0 }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::property("serial", |l: &Ledger| &l.serial, |l: &mut Ledger| &mut l.serial));
    }
}

#[test]
fn unsupported_field_type_fails_registration() {
    setup();
    let err = registrar::register::<Ledger>().err().expect("u64 has no wire type");
    assert!(matches!(err, RegistrationError::UnsupportedFieldType { ref field, .. } if field == "serial"));
    assert!(!registrar::is_registered("Ledger"));
    assert!(testing::class_record("Ledger").is_none());
}

struct Drifter {
    heading: f64,
}

impl ExtensionClass for Drifter {
    type Base = Node;

    fn create() -> Self {
        Drifter { heading: 0.0 }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.virtual_method("PhysicsProcess", |d: &mut Drifter, delta: f32, _extra: i64| {
            d.heading += f64::from(delta);
        });
    }
}

#[test]
fn mismatched_virtual_fails_registration() {
    setup();
    let err = registrar::register::<Drifter>().err().expect("extra argument");
    let message = err.to_string();
    assert!(message.contains("Drifter.PhysicsProcess does not match Node._physics_process"), "{message}");
    assert!(message.contains("want func(Float)"), "{message}");
    assert!(!registrar::is_registered("Drifter"));
}

struct Badge {
    label: String,
}

impl ExtensionClass for Badge {
    type Base = Node;

    fn create() -> Self {
        Badge { label: String::new() }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(
            Field::property("label", |b: &Badge| &b.label, |b: &mut Badge| &mut b.label).default("12"),
        );
    }
}

#[test]
fn string_defaults_accept_any_literal() {
    setup();
    registrar::register::<Badge>().expect("string defaults always parse");
    let record = testing::class_record("Badge").expect("registered");
    assert_eq!(record.properties.len(), 1);
}
