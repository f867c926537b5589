// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extension class declarations.
//!
//! A Rust type becomes a native class by implementing [`ExtensionClass`]:
//!
//! ```ignore
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
//!         spec.field(Field::property("speed", |p: &Player| &p.speed, |p| &mut p.speed).default("100"))
//!             .field(Field::signal("hit(amount)", |p: &mut Player| &mut p.hit))
//!             .method("jump", |p: &mut Player, height: f64| p.speed * height)
//!             .virtual_method("_process", |p: &mut Player, delta: f64| p.speed += delta);
//!     }
//! }
//! ```
//!
//! Optional behavior is opted into on the [`ClassSpec`] through the capability
//! traits ([`OnCreate`], [`OnSet`], [`OnFree`], ...); anything not opted into
//! falls back to the reflected field table.

use std::fmt;

use crate::method::{MethodDescriptor, MethodHandler, Signature, StaticHandler, VirtualDescriptor};
use crate::property::{Field, PropertyDescriptor};
use crate::types::{ObjectPtr, Variant, VariantType};

mod native;

pub use native::{
    CanvasItem, Control, EditorPlugin, Engine, Label, Node, Node2D, Node3D, Object, RefCounted,
    Resource, Script, ScriptExtension, ScriptLanguageExtension, Sprite2D,
};

/// Structural capabilities of a native base class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    /// Lives in the scene tree; can be a child node.
    pub const NODE: Self = Self(1);
    pub const REF_COUNTED: Self = Self(1 << 1);
    pub const SCRIPT: Self = Self(1 << 2);
    pub const EDITOR_PLUGIN: Self = Self(1 << 3);
    pub const SCRIPT_LANGUAGE: Self = Self(1 << 4);

    const TOOL: Self = Self(Self::SCRIPT.0 | Self::EDITOR_PLUGIN.0 | Self::SCRIPT_LANGUAGE.0);

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bases that only make sense inside the editor make their subclasses
    /// tools.
    #[must_use]
    pub const fn is_tool(self) -> bool {
        self.0 & Self::TOOL.0 != 0
    }

    /// Classes with these capabilities register at the editor level.
    #[must_use]
    pub const fn needs_editor_level(self) -> bool {
        self.is_tool()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::NODE, "NODE"),
            (Self::REF_COUNTED, "REF_COUNTED"),
            (Self::SCRIPT, "SCRIPT"),
            (Self::EDITOR_PLUGIN, "EDITOR_PLUGIN"),
            (Self::SCRIPT_LANGUAGE, "SCRIPT_LANGUAGE"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(cap, _)| self.contains(*cap))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Capabilities({})", set.join(" | "))
    }
}

/// A virtual method declared by a native class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualSig {
    pub name: &'static str,
    pub args: &'static [VariantType],
    pub ret: Option<VariantType>,
}

impl VirtualSig {
    #[must_use]
    pub fn signature(&self) -> Signature {
        Signature {
            args: self.args.to_vec(),
            ret: self.ret,
        }
    }
}

/// A native engine class.
pub trait NativeClass: 'static {
    const CLASS_NAME: &'static str;
    const CAPABILITIES: Capabilities;
    /// Virtuals declared by this class itself.
    const VIRTUALS: &'static [VirtualSig];

    /// Look up a virtual by engine name, parents included.
    fn find_virtual(name: &str) -> Option<&'static VirtualSig>;

    /// `class_name` is this class or one of its ancestors.
    fn is_a(class_name: &str) -> bool;
}

/// A Rust type exposed as a native class.
pub trait ExtensionClass: Sized + Send + 'static {
    /// Native parent class.
    type Base: NativeClass;

    /// Registered class name; the type's own name unless overridden.
    fn class_name() -> String {
        short_type_name::<Self>().to_string()
    }

    /// Initial managed value for a new instance.
    fn create() -> Self;

    /// Declare fields, methods, virtuals and capabilities.
    fn register(_spec: &mut ClassSpec<Self>) {}
}

pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Runs after the instance is attached to its native object.
pub trait OnCreate {
    fn on_create(&mut self, base: ObjectPtr);
}

/// Runs when the native object is freed.
pub trait OnFree {
    fn on_free(&mut self);
}

/// Custom property assignment; return `false` to fall back to the field table.
pub trait OnSet {
    fn on_set(&mut self, name: &str, value: &Variant) -> bool;
}

/// Custom property read; `None` falls back to the field table.
pub trait OnGet {
    fn on_get(&self, name: &str) -> Option<Variant>;
}

/// Receives every notification after the bridge's own handling.
pub trait OnNotification {
    fn on_notification(&mut self, what: i32);
}

/// Replaces the reflected property list.
pub trait OnPropertyList {
    fn property_list(&self) -> Vec<PropertyDescriptor>;
}

/// Replaces the default-literal revert behavior.
pub trait OnRevert {
    fn can_revert(&self, name: &str) -> bool;
    fn get_revert(&self, name: &str) -> Option<Variant>;
}

/// Runs once after the class is registered.
pub trait OnRegister {
    fn on_register(class_name: &str);
}

/// Capability hooks collected from a [`ClassSpec`].
pub(crate) struct Hooks<T> {
    pub on_create: Option<fn(&mut T, ObjectPtr)>,
    pub on_free: Option<fn(&mut T)>,
    pub on_set: Option<fn(&mut T, &str, &Variant) -> bool>,
    pub on_get: Option<fn(&T, &str) -> Option<Variant>>,
    pub on_notification: Option<fn(&mut T, i32)>,
    pub property_list: Option<fn(&T) -> Vec<PropertyDescriptor>>,
    pub can_revert: Option<fn(&T, &str) -> bool>,
    pub get_revert: Option<fn(&T, &str) -> Option<Variant>>,
    pub to_string: Option<fn(&T) -> String>,
    pub on_register: Option<fn(&str)>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            on_create: None,
            on_free: None,
            on_set: None,
            on_get: None,
            on_notification: None,
            property_list: None,
            can_revert: None,
            get_revert: None,
            to_string: None,
            on_register: None,
        }
    }
}

fn display_to_string<T: fmt::Display>(value: &T) -> String {
    value.to_string()
}

/// Registration-time description of an extension class.
pub struct ClassSpec<T> {
    pub(crate) fields: Vec<Field<T>>,
    pub(crate) methods: Vec<MethodDescriptor<T>>,
    pub(crate) virtuals: Vec<VirtualDescriptor<T>>,
    pub(crate) constants: Vec<(String, String, i64)>,
    pub(crate) tool: bool,
    pub(crate) hooks: Hooks<T>,
}

impl<T: ExtensionClass> ClassSpec<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            methods: Vec::new(),
            virtuals: Vec::new(),
            constants: Vec::new(),
            tool: false,
            hooks: Hooks::default(),
        }
    }

    /// Collect the spec `T` declares.
    pub(crate) fn collect() -> Self {
        let mut spec = Self::new();
        T::register(&mut spec);
        spec
    }

    /// Export a field (property, group, signal or child node).
    pub fn field(&mut self, field: Field<T>) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Export a method callable from the engine.
    pub fn method<Args, H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: MethodHandler<T, Args>,
        Args: 'static,
    {
        self.methods.push(MethodDescriptor::new(name, handler));
        self
    }

    /// Export a function callable on the class itself, without an instance.
    pub fn static_method<Args, H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: StaticHandler<Args>,
        Args: 'static,
    {
        self.methods.push(MethodDescriptor::new_static(name, handler));
        self
    }

    /// Override a virtual of the base class. `name` may be the engine name
    /// (`_process`) or its converted form (`Process`).
    pub fn virtual_method<Args, H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: MethodHandler<T, Args>,
        Args: 'static,
    {
        self.virtuals.push(VirtualDescriptor::new(name, handler));
        self
    }

    /// Integer constant, optionally grouped under an enum name (empty for
    /// none).
    pub fn constant(&mut self, enum_name: &str, name: &str, value: i64) -> &mut Self {
        self.constants
            .push((enum_name.to_string(), name.to_string(), value));
        self
    }

    /// Run in the editor as well.
    pub fn tool(&mut self) -> &mut Self {
        self.tool = true;
        self
    }

    pub fn on_create(&mut self) -> &mut Self
    where
        T: OnCreate,
    {
        self.hooks.on_create = Some(T::on_create);
        self
    }

    pub fn on_free(&mut self) -> &mut Self
    where
        T: OnFree,
    {
        self.hooks.on_free = Some(T::on_free);
        self
    }

    pub fn on_set(&mut self) -> &mut Self
    where
        T: OnSet,
    {
        self.hooks.on_set = Some(T::on_set);
        self
    }

    pub fn on_get(&mut self) -> &mut Self
    where
        T: OnGet,
    {
        self.hooks.on_get = Some(T::on_get);
        self
    }

    pub fn on_notification(&mut self) -> &mut Self
    where
        T: OnNotification,
    {
        self.hooks.on_notification = Some(T::on_notification);
        self
    }

    pub fn property_list(&mut self) -> &mut Self
    where
        T: OnPropertyList,
    {
        self.hooks.property_list = Some(T::property_list);
        self
    }

    pub fn revert(&mut self) -> &mut Self
    where
        T: OnRevert,
    {
        self.hooks.can_revert = Some(T::can_revert);
        self.hooks.get_revert = Some(T::get_revert);
        self
    }

    /// Use `Display` for the engine's `to_string`.
    pub fn display(&mut self) -> &mut Self
    where
        T: fmt::Display,
    {
        self.hooks.to_string = Some(display_to_string::<T>);
        self
    }

    pub fn on_register(&mut self) -> &mut Self
    where
        T: OnRegister,
    {
        self.hooks.on_register = Some(T::on_register);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl ExtensionClass for Plain {
        type Base = Node;

        fn create() -> Self {
            Plain
        }
    }

    struct Renamed;

    impl ExtensionClass for Renamed {
        type Base = RefCounted;

        fn class_name() -> String {
            "Inventory".into()
        }

        fn create() -> Self {
            Renamed
        }
    }

    #[test]
    fn class_name_defaults_to_type_name() {
        assert_eq!(Plain::class_name(), "Plain");
        assert_eq!(Renamed::class_name(), "Inventory");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
    }

    #[test]
    fn capability_set_operations() {
        let caps = Capabilities::NODE.union(Capabilities::EDITOR_PLUGIN);
        assert!(caps.contains(Capabilities::NODE));
        assert!(!caps.contains(Capabilities::REF_COUNTED));
        assert!(caps.is_tool());
        assert_eq!(format!("{caps:?}"), "Capabilities(NODE | EDITOR_PLUGIN)");
    }

    #[test]
    fn spec_collects_declarations() {
        let mut spec = ClassSpec::<Plain>::new();
        spec.tool().constant("", "LIMIT", 3);
        assert!(spec.tool);
        assert_eq!(spec.constants, vec![(String::new(), "LIMIT".to_string(), 3)]);
    }
}
