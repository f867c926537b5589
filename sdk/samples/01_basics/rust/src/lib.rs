// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # gdbridge Sample: Basics
//!
//! A minimal extension library with two classes, showing the pieces every
//! gdbridge library uses.
//!
//! ## What You'll Learn
//!
//! - Declaring a class over an engine base (`Sprite2D`, `Control`)
//! - Exporting properties with defaults and editor hints
//! - Overriding engine virtuals (`_process`, `_ready`)
//! - Declaring and emitting a signal
//! - Child nodes the bridge creates before `_ready`
//! - Exporting the entry symbol with `gdbridge_entry!`
//!
//! ## Scene Layout
//!
//! ```text
//! Scoreboard (Control)
//! ├── Score    (Label)    created on ready, text follows the lap count
//! └── Spinner  (Spinner)  rotates, emits `lapped(count)` every full turn
//! ```
//!
//! ## Running the Sample
//!
//! ```bash
//! cargo build --release -p gdbridge-samples-basics
//! ```
//!
//! Then copy the library next to `godot/basics.gdextension` in a Godot
//! project and add a `Scoreboard` node to a scene.

use std::f64::consts::TAU;

use gdbridge::abi::hint;
use gdbridge::class::{ClassSpec, Control, ExtensionClass, Label, OnCreate, Sprite2D};
use gdbridge::entry::{ClassList, Extension};
use gdbridge::property::Field;
use gdbridge::types::{ObjectPtr, ToVariant};
use gdbridge::{gdbridge_entry, Child, Signal};

// =============================================================================
// Spinner
// =============================================================================

/// A sprite turning at `speed` radians per second.
pub struct Spinner {
    base: ObjectPtr,
    speed: f64,
    angle: f64,
    laps: i64,
    lapped: Signal<(i64,)>,
}

impl OnCreate for Spinner {
    fn on_create(&mut self, base: ObjectPtr) {
        self.base = base;
    }
}

impl Spinner {
    fn advance(&mut self, delta: f64) {
        self.angle += self.speed * delta;
        while self.angle >= TAU {
            self.angle -= TAU;
            self.laps += 1;
            if !self.lapped.emit((self.laps,)) {
                log::warn!("[spinner] lap {} not delivered", self.laps);
            }
        }
        // Pushed back to the engine node; the value lives here.
        self.base.set("rotation", &self.angle.to_variant());
    }

    #[must_use]
    pub fn laps(&self) -> i64 {
        self.laps
    }
}

impl ExtensionClass for Spinner {
    type Base = Sprite2D;

    fn create() -> Self {
        Spinner {
            base: ObjectPtr::default(),
            speed: 1.5,
            angle: 0.0,
            laps: 0,
            lapped: Signal::new(),
        }
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(
            Field::property("speed", |s: &Spinner| &s.speed, |s: &mut Spinner| &mut s.speed)
                .default("1.5")
                .hint(hint::RANGE, "0,10,0.1"),
        )
        .field(Field::property("laps", |s: &Spinner| &s.laps, |s: &mut Spinner| &mut s.laps))
        .field(Field::signal("lapped(count)", |s: &mut Spinner| &mut s.lapped))
        .method("reset", |s: &mut Spinner| {
            s.angle = 0.0;
            s.laps = 0;
        })
        .virtual_method("_process", Spinner::advance)
        .on_create();
    }
}

// =============================================================================
// Scoreboard
// =============================================================================

/// Shows the lap count of its spinner.
#[derive(Default)]
pub struct Scoreboard {
    score: Child,
    spinner: Child,
    shown: i64,
}

impl Scoreboard {
    fn refresh(&mut self) {
        let Some(laps) = self
            .spinner
            .instance::<Spinner>()
            .and_then(|spinner| spinner.with(Spinner::laps))
        else {
            return;
        };
        if laps == self.shown {
            return;
        }
        self.shown = laps;
        if let Some(label) = self.score.object() {
            label.set("text", &format!("Laps: {laps}").to_variant());
        }
    }

    #[must_use]
    pub fn shown(&self) -> i64 {
        self.shown
    }
}

impl ExtensionClass for Scoreboard {
    type Base = Control;

    fn create() -> Self {
        Scoreboard::default()
    }

    fn register(spec: &mut ClassSpec<Self>) {
        spec.field(Field::node::<Label, _>("Score", |s: &mut Scoreboard| &mut s.score))
            .field(Field::extension_node::<Spinner, _>("Spinner", |s: &mut Scoreboard| &mut s.spinner))
            .method("shown", |s: &mut Scoreboard| s.shown)
            .virtual_method("_ready", Scoreboard::refresh)
            .virtual_method("_process", |s: &mut Scoreboard, _delta: f64| s.refresh());
    }
}

// =============================================================================
// Entry point
// =============================================================================

pub struct Basics;

impl Extension for Basics {
    fn register(classes: &mut ClassList) {
        classes.add::<Spinner>().add::<Scoreboard>();
    }
}

gdbridge_entry!(basics_library_init, Basics);

#[cfg(test)]
mod tests {
    use super::*;
    use gdbridge::{registrar, registry, testing};
    use std::sync::Once;
    use std::time::Duration;

    fn setup() {
        static ONCE: Once = Once::new();
        ONCE.call_once(|| {
            testing::install();
            registrar::register::<Spinner>().expect("Spinner registers");
            registrar::register::<Scoreboard>().expect("Scoreboard registers");
        });
    }

    #[test]
    fn spinner_counts_laps_and_signals_them() {
        setup();
        let spinner = testing::instantiate("Spinner").expect("constructs");
        assert!(spinner.set("speed", &TAU.to_variant()));
        for _ in 0..5 {
            testing::call_virtual::<(f64,), ()>(spinner, "_process", (0.5,)).expect("dispatched");
        }
        let instance = registry::lookup::<Spinner>(spinner).expect("bridged");
        assert_eq!(instance.with(Spinner::laps), Some(2));

        let lapped = testing::wait_for_emissions(spinner, 2, Duration::from_secs(5));
        let counts: Vec<&str> = lapped.iter().map(|e| e.args[0].as_str()).collect();
        assert_eq!(counts, ["1", "2"]);
        testing::free(spinner);
    }

    #[test]
    fn scoreboard_builds_its_children_and_follows_the_spinner() {
        setup();
        let board = testing::instantiate("Scoreboard").expect("constructs");
        testing::ready(board);
        let names: Vec<String> = testing::children(board).into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Score", "Spinner"]);

        let instance = registry::lookup::<Scoreboard>(board).expect("bridged");
        let spinner = instance
            .with(|s| s.spinner.instance::<Spinner>())
            .flatten()
            .expect("spinner child is bridged");
        spinner.with_mut(|s| s.advance(TAU)).expect("not borrowed");

        testing::call_virtual::<(f64,), ()>(board, "_process", (0.016,)).expect("dispatched");
        assert_eq!(instance.with(Scoreboard::shown), Some(1));
        testing::free(board);
    }
}
