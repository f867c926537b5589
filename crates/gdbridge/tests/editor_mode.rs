// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Behaviour while the engine runs as the editor.
//!
//! Kept in its own binary: the editor hint is engine-wide and is switched on
//! before anything registers.

use std::sync::Once;

use gdbridge::class::{ClassSpec, EditorPlugin, ExtensionClass, Label, Node};
use gdbridge::entry::InitLevel;
use gdbridge::property::Field;
use gdbridge::{registrar, registry, testing, Child};

#[derive(Default)]
struct Inspector {
    title: Child,
    ready_ran: bool,
    processed: f64,
}

impl ExtensionClass for Inspector {
    type Base = Node;

    fn create() -> Self {
        Inspector::default()
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::node::<Label, _>("Title", |i: &mut Inspector| &mut i.title))
            .virtual_method("_ready", |i: &mut Inspector| i.ready_ran = true)
            .virtual_method("_process", |i: &mut Inspector, delta: f64| i.processed += delta);
    }
}

#[derive(Default)]
struct Gizmo {
    ready_ran: bool,
    processed: f64,
}

impl ExtensionClass for Gizmo {
    type Base = Node;

    fn create() -> Self {
        Gizmo::default()
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.tool()
            .virtual_method("_ready", |g: &mut Gizmo| g.ready_ran = true)
            .virtual_method("_process", |g: &mut Gizmo, delta: f64| g.processed += delta);
    }
}

struct Toolbox;

impl ExtensionClass for Toolbox {
    type Base = EditorPlugin;

    fn create() -> Self {
        Toolbox
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.virtual_method("_get_plugin_name", |_: &mut Toolbox| "Toolbox".to_string());
    }
}

fn setup() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        testing::install();
        testing::set_editor_hint(true);
        registrar::register::<Inspector>().expect("Inspector registers");
        registrar::register::<Gizmo>().expect("Gizmo registers");
        registrar::register::<Toolbox>().expect("Toolbox registers");
    });
}

#[test]
fn non_tool_classes_stay_inert_in_the_editor() {
    setup();
    assert!(!testing::has_virtual("Inspector", "_process"));

    let inspector = testing::instantiate("Inspector").expect("constructs");
    testing::ready(inspector);
    let instance = registry::lookup::<Inspector>(inspector).expect("bridged");
    assert_eq!(instance.with(|i| i.ready_ran), Some(false));
    // Children are still assembled so the edited scene is complete.
    assert_eq!(instance.with(|i| i.title.is_bound()), Some(true));
    assert_eq!(testing::children(inspector).len(), 1);
    testing::free(inspector);
}

#[test]
fn created_children_belong_to_the_edited_scene() {
    setup();
    let root = testing::instantiate("Node").expect("native class");
    testing::set_edited_scene_root(Some(root));
    let inspector = testing::add_named_child(root, "Inspector", "Panel").expect("child");
    let other = testing::add_named_child(root, "Inspector", "Second").expect("child");
    testing::ready(inspector);
    testing::ready(other);

    let created = testing::children(inspector);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "Title");
    assert_eq!(created[0].owner, Some(root.instance_id()));
    assert_eq!(testing::children(other)[0].owner, Some(root.instance_id()));
    // The instance itself is left to whoever placed it in the scene.
    assert_eq!(testing::children(root)[0].owner, None);

    testing::set_edited_scene_root(None);
    testing::free(root);
}

#[test]
fn tool_classes_run_in_the_editor() {
    setup();
    assert!(testing::has_virtual("Gizmo", "_process"));

    let gizmo = testing::instantiate("Gizmo").expect("constructs");
    testing::ready(gizmo);
    assert_eq!(testing::call_virtual::<(f64,), ()>(gizmo, "_process", (0.5,)), Some(()));
    let instance = registry::lookup::<Gizmo>(gizmo).expect("bridged");
    assert_eq!(instance.with(|g| (g.ready_ran, g.processed)), Some((true, 0.5)));
    testing::free(gizmo);
}

#[test]
fn editor_plugins_follow_the_editor_level() {
    setup();
    assert_eq!(registrar::level_of::<Toolbox>(), InitLevel::Editor);
    assert_eq!(registrar::level_of::<Gizmo>(), InitLevel::Scene);
    let descriptor = registrar::descriptor::<Toolbox>().expect("registered");
    assert!(descriptor.is_tool());
    assert!(testing::has_virtual("Toolbox", "_get_plugin_name"));
    assert!(testing::plugins().contains(&"Toolbox".to_string()));

    registrar::unregister_level(InitLevel::Editor);
    assert!(!registrar::is_registered("Toolbox"));
    assert!(!testing::plugins().contains(&"Toolbox".to_string()));
    // Scene-level classes are untouched.
    assert!(registrar::is_registered("Gizmo"));

    registrar::register::<Toolbox>().expect("Toolbox registers again");
    assert!(testing::plugins().contains(&"Toolbox".to_string()));
}
