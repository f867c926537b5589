// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native engine classes usable as extension bases.
//!
//! Each marker carries the class name, its structural capabilities (inherited
//! from the parent) and the virtual methods it declares.

use super::{Capabilities, NativeClass, VirtualSig};
use crate::types::VariantType;

macro_rules! native_class {
    (
        $(#[$meta:meta])*
        $name:ident: $parent:ty, $caps:expr, [$($vname:literal($($arg:ident),*) -> $ret:expr),* $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl NativeClass for $name {
            const CLASS_NAME: &'static str = stringify!($name);
            const CAPABILITIES: Capabilities = <$parent as NativeClass>::CAPABILITIES.union($caps);
            const VIRTUALS: &'static [VirtualSig] = &[
                $(VirtualSig {
                    name: $vname,
                    args: &[$(VariantType::$arg),*],
                    ret: $ret,
                }),*
            ];

            fn find_virtual(name: &str) -> Option<&'static VirtualSig> {
                Self::VIRTUALS
                    .iter()
                    .find(|sig| sig.name == name)
                    .or_else(|| <$parent as NativeClass>::find_virtual(name))
            }

            fn is_a(class_name: &str) -> bool {
                class_name == Self::CLASS_NAME || <$parent as NativeClass>::is_a(class_name)
            }
        }
    };
}

/// Root of the class hierarchy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Object;

impl NativeClass for Object {
    const CLASS_NAME: &'static str = "Object";
    const CAPABILITIES: Capabilities = Capabilities::NONE;
    const VIRTUALS: &'static [VirtualSig] = &[];

    fn find_virtual(_name: &str) -> Option<&'static VirtualSig> {
        None
    }

    fn is_a(class_name: &str) -> bool {
        class_name == Self::CLASS_NAME
    }
}

native_class!(
    /// Reference-counted object; freed when the last reference goes away.
    RefCounted: Object, Capabilities::REF_COUNTED, []
);

native_class!(Resource: RefCounted, Capabilities::NONE, [
    "_setup_local_to_scene"() -> None,
]);

native_class!(
    /// Scene tree node.
    Node: Object, Capabilities::NODE, [
        "_ready"() -> None,
        "_process"(Float) -> None,
        "_physics_process"(Float) -> None,
        "_enter_tree"() -> None,
        "_exit_tree"() -> None,
        "_input"(Object) -> None,
        "_unhandled_input"(Object) -> None,
        "_get_configuration_warnings"() -> Some(VariantType::PackedStringArray),
    ]
);

native_class!(CanvasItem: Node, Capabilities::NONE, [
    "_draw"() -> None,
]);

native_class!(Node2D: CanvasItem, Capabilities::NONE, []);

native_class!(Sprite2D: Node2D, Capabilities::NONE, []);

native_class!(Node3D: Node, Capabilities::NONE, []);

native_class!(Control: CanvasItem, Capabilities::NONE, [
    "_gui_input"(Object) -> None,
    "_has_point"(Vector2) -> Some(VariantType::Bool),
    "_get_minimum_size"() -> Some(VariantType::Vector2),
]);

native_class!(Label: Control, Capabilities::NONE, []);

native_class!(
    /// Editor plugin base; registered extensions are added to the editor.
    EditorPlugin: Node, Capabilities::EDITOR_PLUGIN, [
        "_has_main_screen"() -> Some(VariantType::Bool),
        "_get_plugin_name"() -> Some(VariantType::String),
        "_enable_plugin"() -> None,
        "_disable_plugin"() -> None,
    ]
);

native_class!(Script: Resource, Capabilities::NONE, []);

native_class!(ScriptExtension: Script, Capabilities::SCRIPT, [
    "_get_source_code"() -> Some(VariantType::String),
    "_set_source_code"(String) -> None,
    "_can_instantiate"() -> Some(VariantType::Bool),
    "_is_tool"() -> Some(VariantType::Bool),
]);

native_class!(ScriptLanguageExtension: Object, Capabilities::SCRIPT_LANGUAGE, [
    "_get_name"() -> Some(VariantType::String),
    "_init"() -> None,
    "_get_type"() -> Some(VariantType::String),
    "_get_extension"() -> Some(VariantType::String),
    "_finish"() -> None,
]);

native_class!(
    /// Engine singleton.
    Engine: Object, Capabilities::NONE, []
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_are_inherited() {
        assert!(Sprite2D::CAPABILITIES.contains(Capabilities::NODE));
        assert!(Resource::CAPABILITIES.contains(Capabilities::REF_COUNTED));
        assert!(!Resource::CAPABILITIES.contains(Capabilities::NODE));
        assert!(ScriptExtension::CAPABILITIES.contains(Capabilities::REF_COUNTED));
        assert!(EditorPlugin::CAPABILITIES.is_tool());
        assert!(!Node2D::CAPABILITIES.is_tool());
    }

    #[test]
    fn virtuals_resolve_through_parents() {
        let process = Label::find_virtual("_process").expect("inherited from Node");
        assert_eq!(process.args, &[VariantType::Float]);
        assert!(Label::find_virtual("_gui_input").is_some());
        assert!(Node2D::find_virtual("_gui_input").is_none());
        assert!(Object::find_virtual("_ready").is_none());
    }

    #[test]
    fn class_ancestry() {
        assert!(Sprite2D::is_a("Node"));
        assert!(Sprite2D::is_a("Sprite2D"));
        assert!(!Node::is_a("Node2D"));
    }
}
