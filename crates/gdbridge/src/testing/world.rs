// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Objects, class database and engine methods of the mock engine.
//!
//! All state sits behind one lock. Extension callbacks are never invoked while
//! it is held: they call straight back into the engine.

use std::collections::HashMap;
use std::ffi::{c_char, c_void};
use std::sync::LazyLock;

use parking_lot::Mutex;

use super::value::{
    intern, name_at, name_of, read_variant, string_at, stringify, text_at, write_string, write_variant,
    Value,
};
use super::{ChildRecord, ClassRecord, EmissionRecord, LayoutRecord, MethodRecord, PropertyRecord, SignalRecord};
use crate::abi::{
    method_flags, CallError, CallErrorKind, ClassCreationInfo, ClassInstancePtr, ClassLibraryPtr, ClassMethodCall,
    ClassMethodInfo, ClassMethodPtrCall, ConstRawObject, ConstStringNamePtr, ConstStringPtr, ConstTypePtr,
    ConstVariantPtr, GdBool, GdInt, GodotVersion, MethodBindPtr, PropertyInfo, RawObject, StringNamePtr,
    StringPtr, TypePtr, VariantPtr, FALSE, TRUE,
};
use crate::types::{InstanceId, VariantType};

const NATIVE_CLASSES: &[(&str, &str)] = &[
    ("Object", ""),
    ("RefCounted", "Object"),
    ("Resource", "RefCounted"),
    ("Node", "Object"),
    ("CanvasItem", "Node"),
    ("Node2D", "CanvasItem"),
    ("Sprite2D", "Node2D"),
    ("Node3D", "Node"),
    ("Control", "CanvasItem"),
    ("Label", "Control"),
    ("EditorPlugin", "Node"),
    ("Script", "Resource"),
    ("ScriptExtension", "Script"),
    ("ScriptLanguage", "Object"),
    ("ScriptLanguageExtension", "ScriptLanguage"),
    ("Engine", "Object"),
    ("EditorInterface", "Object"),
];

fn native_parent(class: &str) -> Option<&'static str> {
    NATIVE_CLASSES
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, parent)| *parent)
}

// Object pointers are ids shifted past the low bits, so that a pointer never
// collides with the small integers tests use elsewhere.
pub(super) fn ptr_of(id: u64) -> usize {
    (id as usize) << 4
}

pub(super) fn id_of(ptr: usize) -> u64 {
    (ptr >> 4) as u64
}

#[derive(Clone, Copy)]
enum Bind {
    FramesDrawn,
    IsEditorHint,
    HasNode,
    GetNode,
    AddChild,
    SetName,
    SetOwner,
    EditedSceneRoot,
    Notification,
    EmitSignal,
    Reference,
    Unreference,
}

const BINDS: &[(&str, &str, Bind)] = &[
    ("Engine", "get_frames_drawn", Bind::FramesDrawn),
    ("Engine", "is_editor_hint", Bind::IsEditorHint),
    ("Node", "has_node", Bind::HasNode),
    ("Node", "get_node", Bind::GetNode),
    ("Node", "add_child", Bind::AddChild),
    ("Node", "set_name", Bind::SetName),
    ("Node", "set_owner", Bind::SetOwner),
    ("EditorInterface", "get_edited_scene_root", Bind::EditedSceneRoot),
    ("Object", "notification", Bind::Notification),
    ("Object", "emit_signal", Bind::EmitSignal),
    ("RefCounted", "reference", Bind::Reference),
    ("RefCounted", "unreference", Bind::Unreference),
];

fn bind_at(ptr: MethodBindPtr) -> Option<Bind> {
    BINDS.get((ptr as usize).checked_sub(1)?).map(|(_, _, bind)| *bind)
}

struct ObjectData {
    class: String,
    /// Extension class name and instance pointer.
    extension: Option<(String, usize)>,
    name: String,
    parent: Option<u64>,
    /// Child ids with their internal flag.
    children: Vec<(u64, bool)>,
    owner: Option<u64>,
    refcount: i64,
}

/// Class vtable as handed over at registration.
#[derive(Clone, Copy)]
pub(super) struct Callbacks(pub(super) ClassCreationInfo);

// SAFETY: the userdata pointer is only handed back to the extension.
unsafe impl Send for Callbacks {}

#[derive(Clone, Copy)]
pub(super) struct MethodEntry {
    pub(super) userdata: usize,
    pub(super) call: Option<ClassMethodCall>,
    pub(super) ptrcall: Option<ClassMethodPtrCall>,
    pub(super) is_static: bool,
}

struct ClassData {
    parent: String,
    callbacks: Callbacks,
    layout: Vec<LayoutRecord>,
    properties: Vec<PropertyRecord>,
    signals: Vec<SignalRecord>,
    methods: Vec<(MethodRecord, MethodEntry)>,
    constants: Vec<(String, String, i64)>,
}

struct State {
    objects: HashMap<u64, ObjectData>,
    next_id: u64,
    classes: HashMap<String, ClassData>,
    frames: i64,
    editor: bool,
    emissions: Vec<EmissionRecord>,
    errors: Vec<String>,
    warnings: Vec<String>,
    plugins: Vec<String>,
    engine: u64,
    editor_interface: u64,
    edited_root: Option<u64>,
}

impl State {
    fn new() -> Self {
        let mut state = Self {
            objects: HashMap::new(),
            next_id: 1,
            classes: HashMap::new(),
            frames: 0,
            editor: false,
            emissions: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            plugins: Vec::new(),
            engine: 0,
            editor_interface: 0,
            edited_root: None,
        };
        state.engine = state.alloc("Engine");
        state.editor_interface = state.alloc("EditorInterface");
        state
    }

    fn alloc(&mut self, class: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(
            id,
            ObjectData {
                class: class.to_string(),
                extension: None,
                name: String::new(),
                parent: None,
                children: Vec::new(),
                owner: None,
                refcount: 0,
            },
        );
        id
    }

    fn class_of(&self, id: u64) -> Option<String> {
        let data = self.objects.get(&id)?;
        Some(match &data.extension {
            Some((class, _)) => class.clone(),
            None => data.class.clone(),
        })
    }

    fn parent_class(&self, class: &str) -> Option<String> {
        if let Some(data) = self.classes.get(class) {
            return Some(data.parent.clone());
        }
        native_parent(class).filter(|p| !p.is_empty()).map(str::to_string)
    }

    fn is_known(&self, class: &str) -> bool {
        self.classes.contains_key(class) || native_parent(class).is_some()
    }

    fn is_a(&self, class: &str, target: &str) -> bool {
        let mut current = Some(class.to_string());
        while let Some(class) = current {
            if class == target {
                return true;
            }
            current = self.parent_class(&class);
        }
        false
    }

    fn find_path(&self, from: u64, path: &str) -> Option<u64> {
        let mut current = from;
        for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
            let data = self.objects.get(&current)?;
            current = if part == ".." {
                data.parent?
            } else {
                data.children
                    .iter()
                    .map(|(child, _)| *child)
                    .find(|child| self.objects.get(child).is_some_and(|c| c.name == part))?
            };
        }
        Some(current)
    }

    fn is_ancestor(&self, ancestor: u64, of: u64) -> bool {
        let mut current = self.objects.get(&of).and_then(|data| data.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.objects.get(&id).and_then(|data| data.parent);
        }
        false
    }

    fn extension(&self, id: u64) -> Option<(ClassInstancePtr, Callbacks)> {
        let (class, instance) = self.objects.get(&id)?.extension.as_ref()?;
        let callbacks = self.classes.get(class)?.callbacks;
        Some((*instance as ClassInstancePtr, callbacks))
    }

    fn method(&self, id: u64, name: &str) -> Option<MethodEntry> {
        let mut class = self.class_of(id);
        while let Some(current) = class {
            let data = self.classes.get(&current)?;
            if let Some((_, entry)) = data.methods.iter().find(|(record, _)| record.name == name) {
                return Some(*entry);
            }
            class = Some(data.parent.clone());
        }
        None
    }
}

static STATE: LazyLock<Mutex<State>> = LazyLock::new(|| Mutex::new(State::new()));

// ============================================================================
// Helpers for the public test surface
// ============================================================================

pub(super) fn set_frames(frames: i64) {
    STATE.lock().frames = frames;
}

pub(super) fn advance_frame() -> i64 {
    let mut state = STATE.lock();
    state.frames += 1;
    state.frames
}

pub(super) fn set_editor(editor: bool) {
    STATE.lock().editor = editor;
}

pub(super) fn set_edited_root(id: Option<u64>) {
    STATE.lock().edited_root = id;
}

pub(super) fn is_alive(id: u64) -> bool {
    STATE.lock().objects.contains_key(&id)
}

pub(super) fn refcount(id: u64) -> Option<i64> {
    STATE.lock().objects.get(&id).map(|data| data.refcount)
}

pub(super) fn object_name(id: u64) -> Option<String> {
    STATE.lock().objects.get(&id).map(|data| data.name.clone())
}

pub(super) fn extension(id: u64) -> Option<(ClassInstancePtr, Callbacks)> {
    STATE.lock().extension(id)
}

pub(super) fn class_callbacks(class: &str) -> Option<Callbacks> {
    STATE.lock().classes.get(class).map(|data| data.callbacks)
}

pub(super) fn method(id: u64, name: &str) -> Option<MethodEntry> {
    STATE.lock().method(id, name)
}

pub(super) fn class_method(class: &str, name: &str) -> Option<MethodEntry> {
    let state = STATE.lock();
    let data = state.classes.get(class)?;
    data.methods
        .iter()
        .find(|(record, _)| record.name == name)
        .map(|(_, entry)| *entry)
}

/// Attach `child` under `parent` the way the scene loader does.
pub(super) fn attach(parent: u64, child: u64, name: &str) -> bool {
    let mut state = STATE.lock();
    if !state.objects.contains_key(&parent) {
        return false;
    }
    let Some(data) = state.objects.get_mut(&child) else {
        return false;
    };
    data.name = name.to_string();
    data.parent = Some(parent);
    if let Some(parent) = state.objects.get_mut(&parent) {
        parent.children.push((child, false));
    }
    true
}

pub(super) fn children(id: u64) -> Vec<ChildRecord> {
    let state = STATE.lock();
    let Some(data) = state.objects.get(&id) else {
        return Vec::new();
    };
    data.children
        .iter()
        .filter_map(|(child, internal)| {
            let object = state.objects.get(child)?;
            Some(ChildRecord {
                id: InstanceId(*child),
                name: object.name.clone(),
                class_name: state.class_of(*child).unwrap_or_default(),
                internal: *internal,
                owner: object.owner.map(InstanceId),
            })
        })
        .collect()
}

pub(super) fn class_record(name: &str) -> Option<ClassRecord> {
    let state = STATE.lock();
    let data = state.classes.get(name)?;
    Some(ClassRecord {
        name: name.to_string(),
        parent: data.parent.clone(),
        layout: data.layout.clone(),
        properties: data.properties.clone(),
        signals: data.signals.clone(),
        methods: data.methods.iter().map(|(record, _)| record.clone()).collect(),
        constants: data.constants.clone(),
    })
}

pub(super) fn emissions(id: u64) -> Vec<EmissionRecord> {
    STATE
        .lock()
        .emissions
        .iter()
        .filter(|emission| emission.object.0 == id)
        .cloned()
        .collect()
}

pub(super) fn errors() -> Vec<String> {
    STATE.lock().errors.clone()
}

pub(super) fn warnings() -> Vec<String> {
    STATE.lock().warnings.clone()
}

pub(super) fn plugins() -> Vec<String> {
    STATE.lock().plugins.clone()
}

/// Text of an object value; runs the extension's `to_string` outside the lock.
pub(super) fn describe_object(ptr: usize) -> String {
    if ptr == 0 {
        return "<Object#null>".to_string();
    }
    let id = id_of(ptr);
    let (class, extension) = {
        let state = STATE.lock();
        (state.class_of(id), state.extension(id))
    };
    let Some(class) = class else {
        return "<Freed Object>".to_string();
    };
    if let Some((instance, callbacks)) = extension {
        if let Some(to_string) = callbacks.0.to_string_func {
            let mut out = [0u64; 1];
            let mut valid: GdBool = FALSE;
            unsafe {
                write_string(out.as_mut_ptr().cast(), String::new());
                to_string(instance, &mut valid, out.as_mut_ptr().cast());
                let text = string_at(out.as_ptr().cast());
                super::value::destroy_typed(VariantType::String, out.as_mut_ptr());
                if valid != 0 {
                    return text;
                }
            }
        }
    }
    format!("<{class}#{id}>")
}

unsafe fn property_record(info: &PropertyInfo) -> PropertyRecord {
    PropertyRecord {
        name: name_at(info.name),
        variant_type: VariantType::from_raw(info.type_),
        class_name: name_at(info.class_name),
        hint: info.hint,
        hint_string: string_at(info.hint_string),
        usage: info.usage,
    }
}

unsafe fn property_records(list: *const PropertyInfo, count: usize) -> Vec<PropertyRecord> {
    if list.is_null() {
        return Vec::new();
    }
    std::slice::from_raw_parts(list, count)
        .iter()
        .map(|info| property_record(info))
        .collect()
}

pub(super) unsafe fn read_property_list(list: *const PropertyInfo, count: u32) -> Vec<PropertyRecord> {
    property_records(list, count as usize)
}

// ============================================================================
// Core entries
// ============================================================================

pub(super) unsafe extern "C" fn get_godot_version(out: *mut GodotVersion) {
    *out = GodotVersion {
        major: 4,
        minor: 3,
        patch: 0,
        string: c"Godot Engine v4.3.stable.mock".as_ptr(),
    };
}

pub(super) unsafe extern "C" fn get_library_path(_library: ClassLibraryPtr, out: StringPtr) {
    super::value::destroy_typed(VariantType::String, out.cast());
    write_string(out, "res://bin/libgdbridge_mock.so".to_string());
}

pub(super) unsafe extern "C" fn print_error(
    description: *const c_char,
    _function: *const c_char,
    _file: *const c_char,
    _line: i32,
    _notify: GdBool,
) {
    STATE.lock().errors.push(text_at(description));
}

pub(super) unsafe extern "C" fn print_error_with_message(
    _description: *const c_char,
    message: *const c_char,
    _function: *const c_char,
    _file: *const c_char,
    _line: i32,
    _notify: GdBool,
) {
    STATE.lock().errors.push(text_at(message));
}

pub(super) unsafe extern "C" fn print_warning(
    description: *const c_char,
    _function: *const c_char,
    _file: *const c_char,
    _line: i32,
    _notify: GdBool,
) {
    STATE.lock().warnings.push(text_at(description));
}

pub(super) unsafe extern "C" fn print_warning_with_message(
    _description: *const c_char,
    message: *const c_char,
    _function: *const c_char,
    _file: *const c_char,
    _line: i32,
    _notify: GdBool,
) {
    STATE.lock().warnings.push(text_at(message));
}

// ============================================================================
// Variant entries that reach objects
// ============================================================================

pub(super) unsafe extern "C" fn variant_get_named(
    variant: ConstVariantPtr,
    name: ConstStringNamePtr,
    ret: VariantPtr,
    valid: *mut GdBool,
) {
    write_variant(ret, Value::Nil);
    *valid = FALSE;
    match read_variant(variant) {
        Value::Object(ptr) if ptr != 0 => {
            let id = id_of(ptr);
            if let Some((instance, callbacks)) = extension(id) {
                if let Some(get) = callbacks.0.get_func {
                    if get(instance, name, ret) != 0 {
                        *valid = TRUE;
                        return;
                    }
                }
            }
            if name_at(name) == "name" {
                if let Some(node_name) = object_name(id) {
                    super::value::destroy_variant(ret);
                    write_variant(ret, Value::String(node_name));
                    *valid = TRUE;
                }
            }
        }
        Value::Dictionary(dict) => {
            if let Some(value) = dict.get(&Value::StringName(name.cast::<u64>().read())) {
                super::value::destroy_variant(ret);
                write_variant(ret, value);
                *valid = TRUE;
            }
        }
        _ => {}
    }
}

pub(super) unsafe extern "C" fn variant_set_named(
    variant: VariantPtr,
    name: ConstStringNamePtr,
    value: ConstVariantPtr,
    valid: *mut GdBool,
) {
    *valid = FALSE;
    let Value::Object(ptr) = read_variant(variant) else {
        return;
    };
    if ptr == 0 {
        return;
    }
    let id = id_of(ptr);
    if let Some((instance, callbacks)) = extension(id) {
        if let Some(set) = callbacks.0.set_func {
            if set(instance, name, value) != 0 {
                *valid = TRUE;
                return;
            }
        }
    }
    if name_at(name) == "name" {
        if let Value::String(text) = read_variant(value) {
            if let Some(data) = STATE.lock().objects.get_mut(&id) {
                data.name = text;
                *valid = TRUE;
            }
        }
    }
}

pub(super) unsafe extern "C" fn variant_call(
    variant: VariantPtr,
    method: ConstStringNamePtr,
    args: *const ConstVariantPtr,
    count: GdInt,
    ret: VariantPtr,
    error: *mut CallError,
) {
    write_variant(ret, Value::Nil);
    *error = CallError {
        error: CallErrorKind::InvalidMethod as u32,
        argument: 0,
        expected: 0,
    };
    let method_name = name_at(method);
    match read_variant(variant) {
        Value::Callable(Some(callable)) if method_name == "call" => {
            if let Some(call) = callable.info.call_func {
                (*error).error = CallErrorKind::Ok as u32;
                call(callable.info.callable_userdata, args, count, ret, error);
            }
        }
        Value::Object(0) => (*error).error = CallErrorKind::InstanceIsNull as u32,
        Value::Object(ptr) => {
            let id = id_of(ptr);
            let Some(entry) = self::method(id, &method_name) else {
                return;
            };
            // Static methods are called without a receiver.
            let instance = if entry.is_static {
                std::ptr::null_mut()
            } else {
                let Some((instance, _)) = extension(id) else {
                    return;
                };
                instance
            };
            if let Some(call) = entry.call {
                (*error).error = CallErrorKind::Ok as u32;
                call(entry.userdata as *mut c_void, instance, args, count, ret, error);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Object entries
// ============================================================================

pub(super) unsafe extern "C" fn object_method_bind_call(
    bind: MethodBindPtr,
    object: RawObject,
    args: *const ConstVariantPtr,
    count: GdInt,
    ret: VariantPtr,
    error: *mut CallError,
) {
    write_variant(ret, Value::Nil);
    *error = CallError::default();
    let Some(Bind::EmitSignal) = bind_at(bind) else {
        (*error).error = CallErrorKind::InvalidMethod as u32;
        return;
    };
    let values: Vec<Value> = (0..usize::try_from(count).unwrap_or(0))
        .map(|i| read_variant(*args.add(i)))
        .collect();
    let signal = match values.first() {
        Some(Value::StringName(id)) => name_of(*id),
        Some(Value::String(text)) => text.clone(),
        _ => {
            (*error).error = CallErrorKind::InvalidArgument as u32;
            return;
        }
    };
    // Rendering may call back into extensions.
    let args: Vec<String> = values[1..].iter().map(stringify).collect();
    STATE.lock().emissions.push(EmissionRecord {
        object: InstanceId(id_of(object as usize)),
        signal,
        args,
    });
    super::value::destroy_variant(ret);
    write_variant(ret, Value::Int(0));
}

pub(super) unsafe extern "C" fn object_method_bind_ptrcall(
    bind: MethodBindPtr,
    object: RawObject,
    args: *const ConstTypePtr,
    ret: TypePtr,
) {
    let Some(bind) = bind_at(bind) else {
        return;
    };
    let id = id_of(object as usize);
    match bind {
        Bind::FramesDrawn => ret.cast::<i64>().write(STATE.lock().frames),
        Bind::IsEditorHint => ret.cast::<u8>().write(u8::from(STATE.lock().editor)),
        Bind::HasNode => {
            let path = string_at(*args);
            let found = STATE.lock().find_path(id, &path).is_some();
            ret.cast::<u8>().write(u8::from(found));
        }
        Bind::GetNode => {
            let path = string_at(*args);
            let found = STATE.lock().find_path(id, &path);
            ret.cast::<usize>().write(found.map_or(0, ptr_of));
        }
        Bind::AddChild => {
            let child = id_of((*args).cast::<usize>().read());
            let internal = (*args.add(2)).cast::<i64>().read() != 0;
            let mut state = STATE.lock();
            let Some(class) = state.class_of(child) else {
                state.errors.push("add_child: child is not a live object".to_string());
                return;
            };
            let Some(data) = state.objects.get_mut(&child) else {
                return;
            };
            if data.parent.is_some() {
                state.errors.push("add_child: child already has a parent".to_string());
                return;
            }
            data.parent = Some(id);
            if data.name.is_empty() {
                data.name = class;
            }
            if let Some(parent) = state.objects.get_mut(&id) {
                parent.children.push((child, internal));
            }
        }
        Bind::SetName => {
            let name = name_of((*args).cast::<u64>().read());
            if let Some(data) = STATE.lock().objects.get_mut(&id) {
                data.name = name;
            }
        }
        Bind::SetOwner => {
            let owner = id_of((*args).cast::<usize>().read());
            let mut state = STATE.lock();
            if !state.is_ancestor(owner, id) {
                state.errors.push("set_owner: owner is not an ancestor".to_string());
                return;
            }
            if let Some(data) = state.objects.get_mut(&id) {
                data.owner = Some(owner);
            }
        }
        Bind::EditedSceneRoot => {
            let root = STATE.lock().edited_root;
            ret.cast::<usize>().write(root.map_or(0, ptr_of));
        }
        Bind::Notification => {
            let what = (*args).cast::<i64>().read() as i32;
            let reversed = (*args.add(1)).cast::<u8>().read();
            if let Some((instance, callbacks)) = extension(id) {
                if let Some(notify) = callbacks.0.notification_func {
                    notify(instance, what, reversed);
                }
            }
        }
        Bind::EmitSignal => {}
        Bind::Reference => {
            if let Some(data) = STATE.lock().objects.get_mut(&id) {
                data.refcount += 1;
            }
            ret.cast::<u8>().write(TRUE);
        }
        Bind::Unreference => {
            let released = match STATE.lock().objects.get_mut(&id) {
                Some(data) => {
                    data.refcount -= 1;
                    data.refcount <= 0
                }
                None => false,
            };
            ret.cast::<u8>().write(u8::from(released));
        }
    }
}

pub(super) unsafe extern "C" fn object_destroy(object: RawObject) {
    let id = id_of(object as usize);
    let (extension, children) = {
        let mut state = STATE.lock();
        let extension = state.extension(id);
        let Some(data) = state.objects.remove(&id) else {
            return;
        };
        if let Some(parent) = data.parent.and_then(|p| state.objects.get_mut(&p)) {
            parent.children.retain(|(child, _)| *child != id);
        }
        if state.edited_root == Some(id) {
            state.edited_root = None;
        }
        (extension, data.children)
    };
    if let Some((instance, callbacks)) = extension {
        if let Some(free) = callbacks.0.free_instance_func {
            free(callbacks.0.class_userdata, instance);
        }
    }
    for (child, _) in children {
        object_destroy(ptr_of(child) as RawObject);
    }
}

pub(super) unsafe extern "C" fn global_get_singleton(name: ConstStringNamePtr) -> RawObject {
    let state = STATE.lock();
    match name_at(name).as_str() {
        "Engine" => ptr_of(state.engine) as RawObject,
        // Only the editor exposes its interface.
        "EditorInterface" if state.editor => ptr_of(state.editor_interface) as RawObject,
        _ => std::ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn object_set_instance(
    object: RawObject,
    class: ConstStringNamePtr,
    instance: ClassInstancePtr,
) {
    let class = name_at(class);
    if let Some(data) = STATE.lock().objects.get_mut(&id_of(object as usize)) {
        data.extension = Some((class, instance as usize));
    }
}

pub(super) unsafe extern "C" fn object_get_class_name(
    object: ConstRawObject,
    _library: ClassLibraryPtr,
    out: StringNamePtr,
) -> GdBool {
    match STATE.lock().class_of(id_of(object as usize)) {
        Some(class) => {
            out.cast::<u64>().write(intern(&class));
            TRUE
        }
        None => FALSE,
    }
}

pub(super) unsafe extern "C" fn object_cast_to(object: ConstRawObject, tag: *mut c_void) -> RawObject {
    let target = name_of(tag as u64);
    let state = STATE.lock();
    match state.class_of(id_of(object as usize)) {
        Some(class) if state.is_a(&class, &target) => object.cast_mut(),
        _ => std::ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn object_get_instance_from_id(id: u64) -> RawObject {
    if STATE.lock().objects.contains_key(&id) {
        ptr_of(id) as RawObject
    } else {
        std::ptr::null_mut()
    }
}

pub(super) unsafe extern "C" fn object_get_instance_id(object: ConstRawObject) -> u64 {
    // Ids are never reused, so a freed object keeps its id.
    id_of(object as usize)
}

pub(super) unsafe extern "C" fn ref_get_object(reference: ConstTypePtr) -> RawObject {
    reference.cast::<usize>().read() as RawObject
}

pub(super) unsafe extern "C" fn ref_set_object(reference: TypePtr, object: RawObject) {
    reference.cast::<usize>().write(object as usize);
}

// ============================================================================
// ClassDB entries
// ============================================================================

pub(super) unsafe extern "C" fn classdb_construct_object(name: ConstStringNamePtr) -> RawObject {
    let class = name_at(name);
    let extension = STATE.lock().classes.get(&class).map(|data| data.callbacks);
    if let Some(callbacks) = extension {
        // The extension constructs its native base and attaches itself.
        return match callbacks.0.create_instance_func {
            Some(create) => create(callbacks.0.class_userdata),
            None => std::ptr::null_mut(),
        };
    }
    if native_parent(&class).is_none() {
        return std::ptr::null_mut();
    }
    ptr_of(STATE.lock().alloc(&class)) as RawObject
}

pub(super) unsafe extern "C" fn classdb_get_method_bind(
    class: ConstStringNamePtr,
    method: ConstStringNamePtr,
    _hash: GdInt,
) -> MethodBindPtr {
    let (class, method) = (name_at(class), name_at(method));
    match BINDS.iter().position(|(c, m, _)| *c == class && *m == method) {
        Some(index) => (index + 1) as MethodBindPtr,
        None => std::ptr::null(),
    }
}

pub(super) unsafe extern "C" fn classdb_get_class_tag(name: ConstStringNamePtr) -> *mut c_void {
    let class = name_at(name);
    if STATE.lock().is_known(&class) {
        intern(&class) as *mut c_void
    } else {
        std::ptr::null_mut()
    }
}

pub(super) unsafe extern "C" fn classdb_register_extension_class2(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    parent: ConstStringNamePtr,
    info: *const ClassCreationInfo,
) {
    let (class, parent) = (name_at(class), name_at(parent));
    let mut state = STATE.lock();
    if state.is_known(&class) {
        state.errors.push(format!("class `{class}` already exists"));
        return;
    }
    if !state.is_known(&parent) {
        state.errors.push(format!("parent class `{parent}` of `{class}` does not exist"));
        return;
    }
    state.classes.insert(
        class,
        ClassData {
            parent,
            callbacks: Callbacks(*info),
            layout: Vec::new(),
            properties: Vec::new(),
            signals: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
        },
    );
}

fn with_class(class: ConstStringNamePtr, record: impl FnOnce(&mut ClassData)) {
    let class = unsafe { name_at(class) };
    let mut state = STATE.lock();
    match state.classes.get_mut(&class) {
        Some(data) => record(data),
        None => state.errors.push(format!("class `{class}` is not registered")),
    }
}

pub(super) unsafe extern "C" fn classdb_register_extension_class_method(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    info: *const ClassMethodInfo,
) {
    let info = &*info;
    let args = property_records(info.arguments_info, info.argument_count as usize)
        .into_iter()
        .map(|arg| arg.variant_type)
        .collect();
    let ret = (info.has_return_value != 0 && !info.return_value_info.is_null())
        .then(|| VariantType::from_raw((*info.return_value_info).type_));
    let record = MethodRecord {
        name: name_at(info.name),
        args,
        ret,
        flags: info.method_flags,
    };
    let entry = MethodEntry {
        userdata: info.method_userdata as usize,
        call: info.call_func,
        ptrcall: info.ptrcall_func,
        is_static: info.method_flags & method_flags::STATIC != 0,
    };
    with_class(class, |data| data.methods.push((record, entry)));
}

pub(super) unsafe extern "C" fn classdb_register_extension_class_integer_constant(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    enum_name: ConstStringNamePtr,
    name: ConstStringNamePtr,
    value: GdInt,
    _bitfield: GdBool,
) {
    let constant = (name_at(enum_name), name_at(name), value);
    with_class(class, |data| data.constants.push(constant));
}

pub(super) unsafe extern "C" fn classdb_register_extension_class_property(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    info: *const PropertyInfo,
    _setter: ConstStringNamePtr,
    _getter: ConstStringNamePtr,
) {
    let record = property_record(&*info);
    with_class(class, |data| {
        data.layout.push(LayoutRecord::Property(record.name.clone()));
        data.properties.push(record);
    });
}

pub(super) unsafe extern "C" fn classdb_register_extension_class_property_group(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    name: ConstStringPtr,
    prefix: ConstStringPtr,
) {
    let entry = LayoutRecord::Group {
        name: string_at(name),
        prefix: string_at(prefix),
    };
    with_class(class, |data| data.layout.push(entry));
}

pub(super) unsafe extern "C" fn classdb_register_extension_class_property_subgroup(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    name: ConstStringPtr,
    prefix: ConstStringPtr,
) {
    let entry = LayoutRecord::Subgroup {
        name: string_at(name),
        prefix: string_at(prefix),
    };
    with_class(class, |data| data.layout.push(entry));
}

pub(super) unsafe extern "C" fn classdb_register_extension_class_signal(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
    name: ConstStringNamePtr,
    args: *const PropertyInfo,
    count: GdInt,
) {
    let record = SignalRecord {
        name: name_at(name),
        params: property_records(args, usize::try_from(count).unwrap_or(0)),
    };
    with_class(class, |data| data.signals.push(record));
}

pub(super) unsafe extern "C" fn classdb_unregister_extension_class(
    _library: ClassLibraryPtr,
    class: ConstStringNamePtr,
) {
    let class = name_at(class);
    let mut state = STATE.lock();
    if state.classes.values().any(|data| data.parent == class) {
        state.errors.push(format!("class `{class}` still has registered subclasses"));
    }
    if state.classes.remove(&class).is_none() {
        state.errors.push(format!("class `{class}` is not registered"));
    }
}

// ============================================================================
// Editor entries
// ============================================================================

pub(super) unsafe extern "C" fn editor_add_plugin(class: ConstStringNamePtr) {
    STATE.lock().plugins.push(name_at(class));
}

pub(super) unsafe extern "C" fn editor_remove_plugin(class: ConstStringNamePtr) {
    let class = name_at(class);
    STATE.lock().plugins.retain(|plugin| *plugin != class);
}
