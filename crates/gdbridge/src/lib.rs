// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # gdbridge - Rust classes for the Godot engine over GDExtension
//!
//! Exposes Rust types as native engine classes through the engine's C ABI.
//! A type declares its fields, methods, signals and virtual overrides once;
//! the bridge registers it with the class database, keeps one managed value
//! per native object, and answers every engine callback for it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gdbridge::class::{ClassSpec, ExtensionClass, Node2D};
//! use gdbridge::entry::{ClassList, Extension};
//! use gdbridge::property::Field;
//! use gdbridge::signal::Signal;
//!
//! struct Player {
//!     speed: f64,
//!     hit: Signal<(i64,)>,
//! }
//!
//! impl ExtensionClass for Player {
//!     type Base = Node2D;
//!
//!     fn create() -> Self {
//!         Player { speed: 100.0, hit: Signal::new() }
//!     }
//!
//!     fn register(spec: &mut ClassSpec<Self>) {
//!         spec.field(Field::property("speed", |p: &Player| &p.speed, |p| &mut p.speed))
//!             .field(Field::signal("hit(amount)", |p: &mut Player| &mut p.hit))
//!             .virtual_method("_process", |p: &mut Player, delta: f64| p.speed += delta);
//!     }
//! }
//!
//! struct Game;
//!
//! impl Extension for Game {
//!     fn register(classes: &mut ClassList) {
//!         classes.add::<Player>();
//!     }
//! }
//!
//! gdbridge::gdbridge_entry!(game_library_init, Game);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        Extension library                            |
//! |   ExtensionClass impls -> ClassSpec -> gdbridge_entry!              |
//! +---------------------------------------------------------------------+
//! |                      Registration layer                             |
//! |   registrar (ClassDB) | property/signal introspection | methods     |
//! +---------------------------------------------------------------------+
//! |                         Runtime layer                               |
//! |   instance callbacks | registry | signal workers | reconciliation   |
//! +---------------------------------------------------------------------+
//! |                          ABI layer                                  |
//! |   resolved symbol table | call frames | handle types               |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`class`] - declaring extension classes (start here)
//! - [`entry`] - library entry point and initialization levels
//! - [`types`] - values crossing the boundary
//! - [`callframe`] - typed native calls
//! - [`testing`] - in-process fake engine (feature `mock-host`)

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Raw native ABI: function table and fixed-layout structures.
pub mod abi;
/// Word-slot call frames and method binds.
pub mod callframe;
/// Extension class declarations and native base classes.
pub mod class;
/// Environment configuration.
pub mod config;
/// Engine methods the bridge calls itself.
pub mod engine;
/// Library entry point.
pub mod entry;
/// Error types.
pub mod error;
/// Process-wide loaded engine interface.
pub mod host;
/// Managed instances and their engine callbacks.
pub mod instance;
/// Logger setup and engine console forwarding.
pub mod logging;
/// Exported methods and virtual overrides.
pub mod method;
/// Ownership regimes and reference reconciliation.
pub mod ownership;
/// Property, group, signal and child-node fields.
pub mod property;
/// Class database registration.
pub mod registrar;
/// Native object to managed instance map.
pub mod registry;
/// Signals and per-instance signal workers.
pub mod signal;
/// Cross-boundary value types.
pub mod types;

/// In-process fake engine for tests.
#[cfg(any(test, feature = "mock-host"))]
pub mod testing;

pub use class::{Capabilities, ClassSpec, ExtensionClass, NativeClass};
pub use entry::{ClassList, Extension};
pub use error::{AbiError, RegistrationError, Result};
pub use instance::{Child, Instance};
pub use ownership::ObjectRef;
pub use property::{Field, PropertyDescriptor, SignalDescriptor};
pub use registrar::ClassDescriptor;
pub use signal::Signal;
pub use types::{
    Array, Callable, Dictionary, GString, InstanceId, NodePath, ObjectPtr, StringName, Variant,
    VariantType,
};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
