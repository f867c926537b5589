// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Scene assembly on the ready notification.
//!
//! Declared child nodes are bound to existing children of the same name, or
//! created and added when missing. Assembly completes before the user's
//! `_ready` runs.

use std::sync::Once;

use gdbridge::class::{ClassSpec, Control, ExtensionClass, Label, Node, Node2D, Sprite2D};
use gdbridge::property::Field;
use gdbridge::types::ObjectPtr;
use gdbridge::{registrar, registry, testing, Child};

struct Gauge {
    level: i64,
}

impl ExtensionClass for Gauge {
    type Base = Node;

    fn create() -> Self {
        Gauge { level: 3 }
    }
}

#[derive(Default)]
struct Hud {
    score: Child,
    badge: Child,
    gauge: Child,
    children_ready: bool,
    readies: u32,
}

impl ExtensionClass for Hud {
    type Base = Control;

    fn create() -> Self {
        Hud::default()
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::node::<Label, _>("Score", |h: &mut Hud| &mut h.score))
            .field(Field::node::<Sprite2D, _>("Badge", |h: &mut Hud| &mut h.badge).internal())
            .field(Field::extension_node::<Gauge, _>("Gauge", |h: &mut Hud| &mut h.gauge))
            .virtual_method("_ready", |h: &mut Hud| {
                h.children_ready = h.score.is_bound() && h.badge.is_bound() && h.gauge.is_bound();
                h.readies += 1;
            });
    }
}

#[derive(Default)]
struct Crane {
    arm: Child,
    wrist: Child,
    claw: Child,
    lamp: Child,
}

impl ExtensionClass for Crane {
    type Base = Node;

    fn create() -> Self {
        Crane::default()
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(
            Field::node::<Node2D, _>("Arm", |c: &mut Crane| &mut c.arm).children(vec![
                Field::node::<Node2D, _>("Wrist", |c: &mut Crane| &mut c.wrist)
                    .children(vec![Field::node::<Sprite2D, _>("Claw", |c: &mut Crane| &mut c.claw)]),
                Field::node::<Label, _>("Lamp", |c: &mut Crane| &mut c.lamp).internal(),
            ]),
        );
    }
}

fn setup() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        testing::install();
        registrar::register::<Gauge>().expect("Gauge registers");
        registrar::register::<Hud>().expect("Hud registers");
        registrar::register::<Crane>().expect("Crane registers");
    });
}

fn spawn_hud() -> ObjectPtr {
    setup();
    testing::instantiate("Hud").expect("extension class constructs")
}

#[test]
fn missing_children_are_created_before_ready() {
    let hud = spawn_hud();
    testing::ready(hud);

    let children = testing::children(hud);
    let summary: Vec<(&str, &str, bool)> = children
        .iter()
        .map(|c| (c.name.as_str(), c.class_name.as_str(), c.internal))
        .collect();
    assert_eq!(
        summary,
        [("Score", "Label", false), ("Badge", "Sprite2D", true), ("Gauge", "Gauge", false)]
    );

    let instance = registry::lookup::<Hud>(hud).expect("bridged");
    assert_eq!(instance.with(|h| h.children_ready), Some(true));
    assert_eq!(instance.with(|h| h.readies), Some(1));
    assert_eq!(instance.with(|h| h.score.object()), Some(children[0].object()));
    testing::free(hud);
}

#[test]
fn existing_children_are_bound_not_replaced() {
    let hud = spawn_hud();
    let score = testing::add_named_child(hud, "Label", "Score").expect("child");
    testing::ready(hud);

    let children = testing::children(hud);
    assert_eq!(children.len(), 3);
    assert_eq!(children.iter().filter(|c| c.name == "Score").count(), 1);

    let instance = registry::lookup::<Hud>(hud).expect("bridged");
    assert_eq!(instance.with(|h| h.score.object()), Some(Some(score)));
    testing::free(hud);
    assert!(!testing::is_alive(score));
}

#[test]
fn extension_children_expose_their_instance() {
    let hud = spawn_hud();
    testing::ready(hud);

    let instance = registry::lookup::<Hud>(hud).expect("bridged");
    let gauge = instance
        .with(|h| h.gauge.instance::<Gauge>())
        .flatten()
        .expect("Gauge child is bridged");
    assert_eq!(gauge.with(|g| g.level), Some(3));
    assert!(instance.with(|h| h.score.instance::<Gauge>().is_none()).unwrap_or(false));
    testing::free(hud);
}

#[test]
fn freed_children_read_as_unbound_after_reconciliation() {
    let hud = spawn_hud();
    testing::ready(hud);
    let instance = registry::lookup::<Hud>(hud).expect("bridged");
    let badge = instance
        .with(|h| h.badge.object())
        .flatten()
        .expect("bound");

    testing::free(badge);
    for _ in 0..3 {
        testing::advance_frame();
        gdbridge::ownership::reconcile_if_due();
        if instance.with(|h| h.badge.is_bound()) == Some(false) {
            break;
        }
    }
    assert_eq!(instance.with(|h| h.badge.is_bound()), Some(false));
    assert_eq!(instance.with(|h| h.score.is_bound()), Some(true));
    testing::free(hud);
}

#[test]
#[should_panic(expected = "existing child is a Label, not a Sprite2D")]
fn existing_child_of_wrong_class_is_fatal() {
    let hud = spawn_hud();
    testing::add_named_child(hud, "Label", "Badge").expect("child");
    let instance = registry::lookup::<Hud>(hud).expect("bridged");
    instance.assemble_scene();
}

fn names(parent: ObjectPtr) -> Vec<(String, String)> {
    testing::children(parent)
        .into_iter()
        .map(|c| (c.name, c.class_name))
        .collect()
}

fn pair(name: &str, class_name: &str) -> (String, String) {
    (name.to_string(), class_name.to_string())
}

#[test]
fn nested_children_are_created_under_their_parent() {
    setup();
    let crane = testing::instantiate("Crane").expect("extension class constructs");
    testing::ready(crane);

    assert_eq!(names(crane), [pair("Arm", "Node2D")]);
    let instance = registry::lookup::<Crane>(crane).expect("bridged");
    let arm = instance.with(|c| c.arm.object()).flatten().expect("arm bound");
    assert_eq!(names(arm), [pair("Wrist", "Node2D"), pair("Lamp", "Label")]);
    assert!(testing::children(arm)[1].internal);

    let wrist = instance.with(|c| c.wrist.object()).flatten().expect("wrist bound");
    let claw = instance.with(|c| c.claw.object()).flatten().expect("claw bound");
    let under_wrist = testing::children(wrist);
    assert_eq!(under_wrist.len(), 1);
    assert_eq!(under_wrist[0].object(), Some(claw));
    assert_eq!(under_wrist[0].class_name, "Sprite2D");
    // Outside the editor nothing claims scene ownership.
    assert_eq!(under_wrist[0].owner, None);
    testing::free(crane);
}

#[test]
fn nested_children_reuse_an_existing_branch() {
    setup();
    let crane = testing::instantiate("Crane").expect("extension class constructs");
    let arm = testing::add_named_child(crane, "Node2D", "Arm").expect("child");
    let wrist = testing::add_named_child(arm, "Node2D", "Wrist").expect("child");
    testing::ready(crane);

    let instance = registry::lookup::<Crane>(crane).expect("bridged");
    assert_eq!(instance.with(|c| c.arm.object()), Some(Some(arm)));
    assert_eq!(instance.with(|c| c.wrist.object()), Some(Some(wrist)));
    assert_eq!(names(crane).len(), 1);
    assert_eq!(names(arm), [pair("Wrist", "Node2D"), pair("Lamp", "Label")]);
    assert_eq!(names(wrist), [pair("Claw", "Sprite2D")]);
    testing::free(crane);
    assert!(!testing::is_alive(wrist));
}
