// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process stand-in for the engine, for tests and benches.
//!
//! [`install`] loads the host from a resolver backed by plain Rust state
//! instead of a running engine. Every symbol of the ABI table is served; the
//! helpers below drive the engine side of the protocol (constructing and
//! freeing objects, dispatching notifications and virtuals) and expose what
//! the bridge registered.
//!
//! Process-global knobs such as [`set_editor_hint`] affect every test in the
//! binary; tests flipping them belong in their own test target.

use std::ffi::{c_char, c_void, CStr};
use std::thread;
use std::time::{Duration, Instant};

use crate::abi::{
    CallError, CallErrorKind, ClassLibraryPtr, ConstVariantPtr, GdInt, GetProcAddress, InterfaceFunctionPtr,
    PropertyInfo,
};
use crate::callframe::{CallFrame, FromWire, WireArgs};
use crate::engine::{self, NOTIFICATION_READY};
use crate::host::{self, Host};
use crate::logging::fatal;
use crate::ownership::Handle;
use crate::types::{
    Array, InstanceId, ObjectPtr, PackedArray, PackedElement, StringName, ToVariant, Variant,
    VariantType,
};

mod value;
mod world;

/// A property as the class database received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub name: String,
    pub variant_type: VariantType,
    pub class_name: String,
    pub hint: u32,
    pub hint_string: String,
    pub usage: u32,
}

/// One entry of a class's inspector layout, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRecord {
    Group { name: String, prefix: String },
    Subgroup { name: String, prefix: String },
    Property(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRecord {
    pub name: String,
    pub params: Vec<PropertyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub name: String,
    pub args: Vec<VariantType>,
    pub ret: Option<VariantType>,
    pub flags: u32,
}

/// Everything registered for one extension class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub name: String,
    pub parent: String,
    pub layout: Vec<LayoutRecord>,
    pub properties: Vec<PropertyRecord>,
    pub signals: Vec<SignalRecord>,
    pub methods: Vec<MethodRecord>,
    /// `(enum, name, value)`.
    pub constants: Vec<(String, String, i64)>,
}

impl ClassRecord {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyRecord> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn signal(&self, name: &str) -> Option<&SignalRecord> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// One `emit_signal` the engine received; arguments are stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionRecord {
    pub object: InstanceId,
    pub signal: String,
    pub args: Vec<String>,
}

/// A child in the mock scene tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRecord {
    pub id: InstanceId,
    pub name: String,
    pub class_name: String,
    pub internal: bool,
    /// Scene owner, set when the child is saved with an edited scene.
    pub owner: Option<InstanceId>,
}

impl ChildRecord {
    #[must_use]
    pub fn object(&self) -> Option<ObjectPtr> {
        ObjectPtr::from_instance_id(self.id)
    }
}

// Not a real pointer; the engine only ever compares it.
const LIBRARY_TOKEN: usize = 0x6d0c_0000;

/// Class-library token the mock hands to the entry point.
#[must_use]
pub fn library() -> ClassLibraryPtr {
    LIBRARY_TOKEN as ClassLibraryPtr
}

macro_rules! symbol_table {
    ($name:expr; $($symbol:ident),* $(,)?) => {
        match $name {
            $(stringify!($symbol) => Some(std::mem::transmute::<*const (), unsafe extern "C" fn()>(
                $symbol as *const (),
            )),)*
            _ => None,
        }
    };
}

unsafe extern "C" fn get_proc_address(name: *const c_char) -> InterfaceFunctionPtr {
    use value::*;
    use world::*;

    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return None;
    };
    symbol_table! { name;
        get_godot_version, get_library_path, print_error, print_error_with_message, print_warning,
        print_warning_with_message,
        variant_new_copy, variant_new_nil, variant_destroy, variant_call, variant_get_named,
        variant_set_named, variant_get_type, variant_booleanize, variant_stringify, variant_hash,
        variant_get_type_name, get_variant_from_type_constructor, get_variant_to_type_constructor,
        variant_get_ptr_constructor, variant_get_ptr_destructor,
        string_new_with_utf8_chars_and_len, string_to_utf8_chars, string_name_new_with_utf8_chars_and_len,
        array_operator_index, array_operator_index_const, dictionary_operator_index,
        dictionary_operator_index_const, packed_byte_array_operator_index,
        packed_int32_array_operator_index, packed_int64_array_operator_index,
        packed_float32_array_operator_index, packed_float64_array_operator_index,
        packed_string_array_operator_index, packed_vector2_array_operator_index,
        packed_vector3_array_operator_index, packed_color_array_operator_index,
        object_method_bind_call, object_method_bind_ptrcall, object_destroy, global_get_singleton,
        object_set_instance, object_get_class_name, object_cast_to, object_get_instance_from_id,
        object_get_instance_id, ref_get_object, ref_set_object,
        callable_custom_create,
        classdb_construct_object, classdb_get_method_bind, classdb_get_class_tag,
        classdb_register_extension_class2, classdb_register_extension_class_method,
        classdb_register_extension_class_integer_constant, classdb_register_extension_class_property,
        classdb_register_extension_class_property_group, classdb_register_extension_class_property_subgroup,
        classdb_register_extension_class_signal, classdb_unregister_extension_class,
        editor_add_plugin, editor_remove_plugin,
    }
}

/// The mock's symbol resolver, as handed to an entry point.
#[must_use]
pub fn resolver() -> GetProcAddress {
    get_proc_address
}

/// Load the host from the mock engine. Idempotent.
pub fn install() -> &'static Host {
    let _ = crate::logging::init_from_env();
    match unsafe { host::load(get_proc_address, library()) } {
        Ok(host) => host,
        Err(err) => fatal(&format!("mock engine failed to load: {err}")),
    }
}

fn id(object: ObjectPtr) -> u64 {
    world::id_of(object.addr())
}

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

pub fn set_frames_drawn(frames: i64) {
    world::set_frames(frames);
}

/// Advance the frame counter by one and return it.
pub fn advance_frame() -> i64 {
    world::advance_frame()
}

pub fn set_editor_hint(editor: bool) {
    world::set_editor(editor);
}

/// Root of the scene open in the editor; `None` closes it.
pub fn set_edited_scene_root(root: Option<ObjectPtr>) {
    world::set_edited_root(root.map(id));
}

/// Messages received through `print_error*`.
#[must_use]
pub fn errors() -> Vec<String> {
    world::errors()
}

#[must_use]
pub fn warnings() -> Vec<String> {
    world::warnings()
}

/// Classes currently added as editor plugins.
#[must_use]
pub fn plugins() -> Vec<String> {
    world::plugins()
}

// ---------------------------------------------------------------------------
// Objects and the scene tree
// ---------------------------------------------------------------------------

/// Construct an object the way the engine does when it instantiates a
/// class, extension classes included.
#[must_use]
pub fn instantiate(class_name: &str) -> Option<ObjectPtr> {
    install();
    ObjectPtr::construct(class_name)
}

/// Destroy `object` and its children.
pub fn free(object: ObjectPtr) {
    unsafe { object.destroy() };
}

#[must_use]
pub fn is_alive(object: ObjectPtr) -> bool {
    world::is_alive(id(object))
}

#[must_use]
pub fn refcount(object: ObjectPtr) -> Option<i64> {
    world::refcount(id(object))
}

#[must_use]
pub fn node_name(object: ObjectPtr) -> Option<String> {
    world::object_name(id(object))
}

/// Instantiate `class_name` and place it under `parent` as `name`, the way a
/// scene file would before `_ready` runs.
#[must_use]
pub fn add_named_child(parent: ObjectPtr, class_name: &str, name: &str) -> Option<ObjectPtr> {
    let child = instantiate(class_name)?;
    world::attach(id(parent), id(child), name).then_some(child)
}

#[must_use]
pub fn children(parent: ObjectPtr) -> Vec<ChildRecord> {
    world::children(id(parent))
}

/// Deliver a notification through `Object.notification`.
pub fn notify(object: ObjectPtr, what: i32) {
    engine::notification(object, what, false);
}

pub fn ready(object: ObjectPtr) {
    notify(object, NOTIFICATION_READY);
}

// ---------------------------------------------------------------------------
// Class database
// ---------------------------------------------------------------------------

#[must_use]
pub fn class_record(class_name: &str) -> Option<ClassRecord> {
    world::class_record(class_name)
}

/// Whether the engine would dispatch virtual `name` of `class_name` to the
/// extension.
#[must_use]
pub fn has_virtual(class_name: &str, name: &str) -> bool {
    let Some(callbacks) = world::class_callbacks(class_name) else {
        return false;
    };
    let Some(get) = callbacks.0.get_virtual_call_data_func else {
        return false;
    };
    let name = StringName::new(name);
    !unsafe { get(callbacks.0.class_userdata, name.sys()) }.is_null()
}

/// Call virtual `name` on `object` with a typed frame. `None` when the class
/// does not dispatch it.
pub fn call_virtual<A: WireArgs, R: FromWire>(object: ObjectPtr, name: &str, args: A) -> Option<R> {
    let (instance, callbacks) = world::extension(id(object))?;
    let get = callbacks.0.get_virtual_call_data_func?;
    let call = callbacks.0.call_virtual_with_data_func?;
    let name = StringName::new(name);
    let data = unsafe { get(callbacks.0.class_userdata, name.sys()) };
    if data.is_null() {
        return None;
    }
    let mut frame = CallFrame::for_signature::<A, R>();
    args.push_all(&mut frame);
    frame.prepare_return::<R>();
    unsafe { call(instance, name.sys(), data, frame.arg_ptrs(), frame.ret_ptr()) };
    Some(frame.take_return())
}

/// Call an exported method through its variant entry.
pub fn call(object: ObjectPtr, method: &str, args: &[&Variant]) -> Result<Variant, CallErrorKind> {
    let mut target = object.to_variant();
    target.call(&StringName::new(method), args)
}

/// Call an exported method through its typed entry.
pub fn ptrcall<A: WireArgs, R: FromWire>(object: ObjectPtr, method: &str, args: A) -> Option<R> {
    let entry = world::method(id(object), method)?;
    let instance = if entry.is_static {
        std::ptr::null_mut()
    } else {
        world::extension(id(object))?.0
    };
    let ptrcall = entry.ptrcall?;
    let mut frame = CallFrame::for_signature::<A, R>();
    args.push_all(&mut frame);
    frame.prepare_return::<R>();
    unsafe { ptrcall(entry.userdata as *mut c_void, instance, frame.arg_ptrs(), frame.ret_ptr()) };
    Some(frame.take_return())
}

/// Call a static method of `class_name` through its variant entry, with no
/// instance.
pub fn call_static(class_name: &str, method: &str, args: &[&Variant]) -> Result<Variant, CallErrorKind> {
    let entry = world::class_method(class_name, method).ok_or(CallErrorKind::InvalidMethod)?;
    let call = entry.call.ok_or(CallErrorKind::InvalidMethod)?;
    let arg_ptrs: Vec<ConstVariantPtr> = args.iter().map(|arg| arg.sys()).collect();
    let mut error = CallError::default();
    let result = unsafe {
        Variant::from_sys_init(|dst| {
            call(
                entry.userdata as *mut c_void,
                std::ptr::null_mut(),
                arg_ptrs.as_ptr(),
                arg_ptrs.len() as GdInt,
                dst,
                &mut error,
            );
        })
    };
    match CallErrorKind::from_raw(error.error) {
        CallErrorKind::Ok => Ok(result),
        kind => Err(kind),
    }
}

/// Call a static method of `class_name` through its typed entry.
pub fn ptrcall_static<A: WireArgs, R: FromWire>(class_name: &str, method: &str, args: A) -> Option<R> {
    let entry = world::class_method(class_name, method)?;
    let ptrcall = entry.ptrcall?;
    let mut frame = CallFrame::for_signature::<A, R>();
    args.push_all(&mut frame);
    frame.prepare_return::<R>();
    unsafe {
        ptrcall(
            entry.userdata as *mut c_void,
            std::ptr::null_mut(),
            frame.arg_ptrs(),
            frame.ret_ptr(),
        );
    }
    Some(frame.take_return())
}

/// Property list the inspector would show for `object`.
#[must_use]
pub fn property_list(object: ObjectPtr) -> Vec<PropertyRecord> {
    let Some((instance, callbacks)) = world::extension(id(object)) else {
        return Vec::new();
    };
    let Some(get) = callbacks.0.get_property_list_func else {
        return Vec::new();
    };
    let mut count = 0u32;
    unsafe {
        let list: *const PropertyInfo = get(instance, &mut count);
        let records = world::read_property_list(list, count);
        if let Some(free) = callbacks.0.free_property_list_func {
            free(instance, list);
        }
        records
    }
}

#[must_use]
pub fn can_revert(object: ObjectPtr, property: &str) -> bool {
    let Some((instance, callbacks)) = world::extension(id(object)) else {
        return false;
    };
    let name = StringName::new(property);
    callbacks
        .0
        .property_can_revert_func
        .is_some_and(|f| unsafe { f(instance, name.sys()) } != 0)
}

#[must_use]
pub fn get_revert(object: ObjectPtr, property: &str) -> Option<Variant> {
    let (instance, callbacks) = world::extension(id(object))?;
    let get = callbacks.0.property_get_revert_func?;
    let name = StringName::new(property);
    let mut value = Variant::nil();
    (unsafe { get(instance, name.sys(), value.sys_mut()) } != 0).then_some(value)
}

/// `str(object)` as the engine prints it.
#[must_use]
pub fn to_string(object: ObjectPtr) -> String {
    world::describe_object(object.addr())
}

/// Hot-reload `object`: the engine drops the managed side and asks the
/// extension to rebuild it. `false` when the class does not support it.
pub fn reload(object: ObjectPtr) -> bool {
    let Some((_, callbacks)) = world::extension(id(object)) else {
        return false;
    };
    let Some(recreate) = callbacks.0.recreate_instance_func else {
        return false;
    };
    !unsafe { recreate(callbacks.0.class_userdata, object.as_raw()) }.is_null()
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[must_use]
pub fn emissions(object: ObjectPtr) -> Vec<EmissionRecord> {
    world::emissions(id(object))
}

/// Poll until `object` has at least `count` emissions or `timeout` passes.
#[must_use]
pub fn wait_for_emissions(object: ObjectPtr, count: usize, timeout: Duration) -> Vec<EmissionRecord> {
    let deadline = Instant::now() + timeout;
    loop {
        let seen = emissions(object);
        if seen.len() >= count || Instant::now() >= deadline {
            return seen;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// An engine array holding copies of `values`.
#[must_use]
pub fn array_of(values: &[Variant]) -> Array {
    install();
    let contents = values
        .iter()
        .map(|v| unsafe { value::read_variant(v.sys()) })
        .collect();
    let slots = std::sync::Arc::new(value::Slots::from_values(contents));
    unsafe { Array::from_opaque([std::sync::Arc::into_raw(slots) as u64]) }
}

#[must_use]
pub fn array_len(array: &Array) -> usize {
    match unsafe { value::read_typed(VariantType::Array, array.sys().cast()) } {
        value::Value::Array(slots) => slots.len(),
        _ => 0,
    }
}

/// A packed array of `len` zeroed elements.
#[must_use]
pub fn packed_zeroed<E: PackedElement>(len: usize) -> PackedArray<E> {
    install();
    let packed = std::sync::Arc::new(value::Packed::zeroed(E::ARRAY_TYPE, len));
    unsafe { PackedArray::from_opaque([std::sync::Arc::into_raw(packed) as u64, 0]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiTable;

    #[test]
    fn resolver_serves_every_symbol() {
        for symbol in AbiTable::SYMBOLS {
            let name = std::ffi::CString::new(*symbol).expect("symbol name");
            assert!(
                unsafe { get_proc_address(name.as_ptr()) }.is_some(),
                "mock does not serve `{symbol}`"
            );
        }
        let unknown = std::ffi::CString::new("no_such_symbol").expect("symbol name");
        assert!(unsafe { get_proc_address(unknown.as_ptr()) }.is_none());
    }

    #[test]
    fn install_reports_mock_version() {
        let host = install();
        assert_eq!((host.version().major, host.version().minor), (4, 3));
        assert!(host.version().label.contains("mock"));
        assert!(host.library_path().ends_with(".so"));
    }

    #[test]
    fn native_objects_follow_class_hierarchy() {
        let node = instantiate("Node2D").expect("native class");
        assert!(node.is_class("Node"));
        assert!(node.is_class("CanvasItem"));
        assert!(!node.is_class("Control"));
        assert_eq!(node.class_name().as_deref(), Some("Node2D"));
        assert!(instantiate("NoSuchClass").is_none());

        free(node);
        assert!(!is_alive(node));
        assert!(ObjectPtr::from_instance_id(node.instance_id()).is_none());
    }

    #[test]
    fn scene_paths_resolve_through_children() {
        let root = instantiate("Node").expect("root");
        let hud = add_named_child(root, "Control", "Hud").expect("child");
        let label = add_named_child(hud, "Label", "Score").expect("grandchild");

        assert!(engine::has_node(root, &"Hud/Score".into()));
        assert_eq!(engine::get_node(root, &"Hud/Score".into()), Some(label));
        assert!(!engine::has_node(root, &"Hud/Missing".into()));
        assert_eq!(children(root).len(), 1);

        free(root);
        assert!(!is_alive(label));
    }
}
