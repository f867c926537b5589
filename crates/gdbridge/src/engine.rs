// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine methods the bridge itself calls.
//!
//! Each bind is declared with its frame shape and resolved lazily on first
//! use; the resolution is cached for the life of the process.

use std::sync::OnceLock;

use crate::callframe::{BindSpec, MethodBind};
use crate::types::{NodePath, ObjectPtr, StringName, ToVariant, Variant};

pub const NOTIFICATION_POSTINITIALIZE: i32 = 0;
pub const NOTIFICATION_PREDELETE: i32 = 1;
pub const NOTIFICATION_ENTER_TREE: i32 = 10;
pub const NOTIFICATION_EXIT_TREE: i32 = 11;
pub const NOTIFICATION_READY: i32 = 13;

/// `Node.InternalMode`.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalMode {
    Disabled = 0,
    Front = 1,
    Back = 2,
}

macro_rules! binds {
    ($($(#[$meta:meta])* $name:ident = $class:literal . $method:literal, $hash:literal, [$($arg:expr),*] -> $ret:expr;)*) => {
        $(
            $(#[$meta])*
            pub static $name: BindSpec = BindSpec {
                class: $class,
                method: $method,
                hash: $hash,
                args: &[$($arg),*],
                ret: $ret,
            };
        )*
    };
}

binds! {
    GET_FRAMES_DRAWN = "Engine"."get_frames_drawn", 3905245786, [] -> 1;
    IS_EDITOR_HINT = "Engine"."is_editor_hint", 36873697, [] -> 1;
    HAS_NODE = "Node"."has_node", 861721659, [1] -> 1;
    GET_NODE = "Node"."get_node", 2734337346, [1] -> 1;
    /// `add_child(node, force_readable_name, internal)`.
    ADD_CHILD = "Node"."add_child", 3863233950, [1, 1, 1] -> 0;
    SET_NAME = "Node"."set_name", 3304788590, [1] -> 0;
    SET_OWNER = "Node"."set_owner", 1078189570, [1] -> 0;
    GET_EDITED_SCENE_ROOT = "EditorInterface"."get_edited_scene_root", 3160264692, [] -> 1;
    NOTIFICATION = "Object"."notification", 4023243586, [1, 1] -> 0;
    /// Vararg; only reachable through `MethodBind::call`.
    EMIT_SIGNAL = "Object"."emit_signal", 4047867050, [] -> 1;
    REFERENCE = "RefCounted"."reference", 2240911060, [] -> 1;
    UNREFERENCE = "RefCounted"."unreference", 2240911060, [] -> 1;
}

fn resolve(cache: &'static OnceLock<Option<MethodBind>>, spec: &'static BindSpec) -> Option<MethodBind> {
    *cache.get_or_init(|| MethodBind::from_spec(spec))
}

macro_rules! cached {
    ($spec:ident) => {{
        static CACHE: OnceLock<Option<MethodBind>> = OnceLock::new();
        resolve(&CACHE, &$spec)
    }};
}

/// The `Engine` singleton.
#[must_use]
pub fn engine_singleton() -> Option<ObjectPtr> {
    ObjectPtr::singleton("Engine")
}

/// Frames drawn since startup; `None` when the engine cannot answer.
#[must_use]
pub fn frames_drawn() -> Option<i64> {
    let engine = engine_singleton()?;
    let bind = cached!(GET_FRAMES_DRAWN)?;
    Some(bind.ptrcall::<(), i64>(engine, ()))
}

/// Running inside the editor.
#[must_use]
pub fn is_editor_hint() -> bool {
    let Some(engine) = engine_singleton() else {
        return false;
    };
    cached!(IS_EDITOR_HINT).is_some_and(|bind| bind.ptrcall::<(), bool>(engine, ()))
}

#[must_use]
pub fn has_node(node: ObjectPtr, path: &NodePath) -> bool {
    cached!(HAS_NODE).is_some_and(|bind| bind.ptrcall::<(&NodePath,), bool>(node, (path,)))
}

#[must_use]
pub fn get_node(node: ObjectPtr, path: &NodePath) -> Option<ObjectPtr> {
    let bind = cached!(GET_NODE)?;
    bind.ptrcall::<(&NodePath,), ObjectPtr>(node, (path,)).non_null()
}

pub fn add_child(parent: ObjectPtr, child: ObjectPtr, force_readable_name: bool, internal: InternalMode) {
    if let Some(bind) = cached!(ADD_CHILD) {
        bind.ptrcall::<(ObjectPtr, bool, i64), ()>(parent, (child, force_readable_name, internal as i64));
    }
}

pub fn set_name(node: ObjectPtr, name: &StringName) {
    if let Some(bind) = cached!(SET_NAME) {
        bind.ptrcall::<(&StringName,), ()>(node, (name,));
    }
}

/// Make `owner` save `node` with its scene. `owner` must be an ancestor.
pub fn set_owner(node: ObjectPtr, owner: ObjectPtr) {
    if let Some(bind) = cached!(SET_OWNER) {
        bind.ptrcall::<(ObjectPtr,), ()>(node, (owner,));
    }
}

/// Root of the scene open in the editor; `None` outside the editor.
#[must_use]
pub fn edited_scene_root() -> Option<ObjectPtr> {
    let editor = ObjectPtr::singleton("EditorInterface")?;
    let bind = cached!(GET_EDITED_SCENE_ROOT)?;
    bind.ptrcall::<(), ObjectPtr>(editor, ()).non_null()
}

pub fn notification(object: ObjectPtr, what: i32, reversed: bool) {
    if let Some(bind) = cached!(NOTIFICATION) {
        bind.ptrcall::<(i32, bool), ()>(object, (what, reversed));
    }
}

/// Emit `signal` on `object`; `false` when the engine rejected the call.
pub fn emit_signal(object: ObjectPtr, signal: &StringName, args: &[Variant]) -> bool {
    let Some(bind) = cached!(EMIT_SIGNAL) else {
        return false;
    };
    let name = signal.to_variant();
    let mut call_args: Vec<&Variant> = Vec::with_capacity(args.len() + 1);
    call_args.push(&name);
    call_args.extend(args.iter());
    match bind.call(object, &call_args) {
        Ok(_) => true,
        Err(kind) => {
            log::warn!("[engine] emit_signal({signal}) failed: {kind:?}");
            false
        }
    }
}

pub fn reference(object: ObjectPtr) -> bool {
    cached!(REFERENCE).is_some_and(|bind| bind.ptrcall::<(), bool>(object, ()))
}

/// Drop one reference; `true` when that was the last one and the caller must
/// destroy the object.
pub fn unreference(object: ObjectPtr) -> bool {
    cached!(UNREFERENCE).is_some_and(|bind| bind.ptrcall::<(), bool>(object, ()))
}
