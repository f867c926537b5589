// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value storage of the mock engine.
//!
//! Typed storage follows the real word footprints. Handle types keep a
//! pointer in their first word: a boxed `String` for String and NodePath,
//! an `Arc` for arrays, dictionaries, callables and packed arrays. A
//! StringName word is an interned id. A variant is `[tag, Box<Value>, 0]`.

use std::collections::HashMap;
use std::ffi::{c_char, c_void};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};

use crate::abi::{
    CallableCustomInfo, ConstStringPtr, ConstTypePtr, ConstVariantPtr, GdBool, GdInt, PtrConstructor,
    PtrDestructor, RawVariantType, StringNamePtr, StringPtr, TypeFromVariantConstructor, TypePtr,
    VariantFromTypeConstructor, VariantPtr, FALSE, TRUE,
};
use crate::types::VariantType;

// ============================================================================
// StringName interning
// ============================================================================

struct Interner {
    ids: HashMap<Arc<str>, u64>,
    names: Vec<Arc<str>>,
}

static NAMES: LazyLock<RwLock<Interner>> = LazyLock::new(|| {
    let empty: Arc<str> = Arc::from("");
    RwLock::new(Interner {
        ids: HashMap::from([(Arc::clone(&empty), 0)]),
        names: vec![empty],
    })
});

pub(super) fn intern(text: &str) -> u64 {
    if let Some(&id) = NAMES.read().ids.get(text) {
        return id;
    }
    let mut names = NAMES.write();
    if let Some(&id) = names.ids.get(text) {
        return id;
    }
    let id = names.names.len() as u64;
    let text: Arc<str> = Arc::from(text);
    names.names.push(Arc::clone(&text));
    names.ids.insert(text, id);
    id
}

pub(super) fn name_of(id: u64) -> String {
    NAMES
        .read()
        .names
        .get(id as usize)
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// StringName behind a pointer to its storage.
pub(super) unsafe fn name_at(ptr: *const c_void) -> String {
    if ptr.is_null() {
        return String::new();
    }
    name_of(ptr.cast::<u64>().read())
}

/// String behind a pointer to its storage.
pub(super) unsafe fn string_at(ptr: *const c_void) -> String {
    if ptr.is_null() {
        return String::new();
    }
    read_boxed(ptr.cast())
}

pub(super) unsafe fn text_at(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

// ============================================================================
// Values
// ============================================================================

/// Content of one engine value.
#[derive(Clone)]
pub(super) enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    NodePath(String),
    StringName(u64),
    /// Vectors, colors and other plain structs, at most two words.
    Plain(VariantType, [u64; 2]),
    Object(usize),
    Array(Arc<Slots>),
    Dictionary(Arc<Dict>),
    Callable(Option<Arc<CustomCallable>>),
    Packed(Arc<Packed>),
}

impl Value {
    pub(super) fn variant_type(&self) -> VariantType {
        match self {
            Self::Nil => VariantType::Nil,
            Self::Bool(_) => VariantType::Bool,
            Self::Int(_) => VariantType::Int,
            Self::Float(_) => VariantType::Float,
            Self::String(_) => VariantType::String,
            Self::NodePath(_) => VariantType::NodePath,
            Self::StringName(_) => VariantType::StringName,
            Self::Plain(ty, _) => *ty,
            Self::Object(_) => VariantType::Object,
            Self::Array(_) => VariantType::Array,
            Self::Dictionary(_) => VariantType::Dictionary,
            Self::Callable(_) => VariantType::Callable,
            Self::Packed(packed) => packed.ty,
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) | Self::NodePath(s) => !s.is_empty(),
            Self::StringName(id) => *id != 0,
            Self::Plain(_, words) => words.iter().any(|w| *w != 0),
            Self::Object(ptr) => *ptr != 0,
            Self::Callable(c) => c.is_some(),
            Self::Array(_) | Self::Dictionary(_) | Self::Packed(_) => true,
        }
    }

    /// Key equality used by dictionaries.
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::StringName(a), Self::StringName(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            // String and StringName keys compare by text.
            (Self::String(a), Self::StringName(b)) | (Self::StringName(b), Self::String(a)) => *a == name_of(*b),
            (a, b) => a.variant_type() == b.variant_type() && stringify(a) == stringify(b),
        }
    }
}

fn default_of(ty: VariantType) -> Value {
    match ty {
        VariantType::Nil => Value::Nil,
        VariantType::Bool => Value::Bool(false),
        VariantType::Int => Value::Int(0),
        VariantType::Float => Value::Float(0.0),
        VariantType::String => Value::String(String::new()),
        VariantType::NodePath => Value::NodePath(String::new()),
        VariantType::StringName => Value::StringName(0),
        VariantType::Object => Value::Object(0),
        VariantType::Array => Value::Array(Arc::default()),
        VariantType::Dictionary => Value::Dictionary(Arc::default()),
        VariantType::Callable => Value::Callable(None),
        ty if is_packed(ty) => Value::Packed(Arc::new(Packed::empty(ty))),
        ty => Value::Plain(ty, [0; 2]),
    }
}

fn is_packed(ty: VariantType) -> bool {
    ty >= VariantType::PackedByteArray
}

fn float_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn plain_text(ty: VariantType, words: &[u64; 2]) -> String {
    let floats: &[f32; 4] = unsafe { &*words.as_ptr().cast::<[f32; 4]>() };
    let ints: &[i32; 4] = unsafe { &*words.as_ptr().cast::<[i32; 4]>() };
    let join = |parts: Vec<String>| format!("({})", parts.join(", "));
    match ty {
        VariantType::Vector2 => join(floats[..2].iter().map(|f| float_text(f64::from(*f))).collect()),
        VariantType::Vector3 => join(floats[..3].iter().map(|f| float_text(f64::from(*f))).collect()),
        VariantType::Color => join(floats.iter().map(|f| float_text(f64::from(*f))).collect()),
        VariantType::Vector2i => join(ints[..2].iter().map(ToString::to_string).collect()),
        VariantType::Vector3i => join(ints[..3].iter().map(ToString::to_string).collect()),
        ty => format!("<{ty:?}>"),
    }
}

/// Engine-style text of a value.
pub(super) fn stringify(value: &Value) -> String {
    match value {
        Value::Nil => "<null>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_text(*f),
        Value::String(s) | Value::NodePath(s) => s.clone(),
        Value::StringName(id) => name_of(*id),
        Value::Plain(ty, words) => plain_text(*ty, words),
        Value::Object(ptr) => super::world::describe_object(*ptr),
        Value::Array(slots) => {
            let items: Vec<String> = slots.values().iter().map(stringify).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Dictionary(dict) => {
            let entries: Vec<String> = dict
                .entries()
                .iter()
                .map(|(k, v)| format!("{}: {}", stringify(k), stringify(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Callable(Some(callable)) => callable.describe(),
        Value::Callable(None) => "null::null".to_string(),
        Value::Packed(packed) => format!("{:?}[{}]", packed.ty, packed.len),
    }
}

// ============================================================================
// Reference types
// ============================================================================

/// Variant slots of an array.
#[derive(Default)]
pub(super) struct Slots(Mutex<Vec<Box<[u64; 3]>>>);

impl Slots {
    pub(super) fn from_values(values: Vec<Value>) -> Self {
        let slots = values
            .into_iter()
            .map(|value| {
                let mut slot = Box::new([0u64; 3]);
                unsafe { write_variant(slot.as_mut_ptr().cast(), value) };
                slot
            })
            .collect();
        Self(Mutex::new(slots))
    }

    pub(super) fn values(&self) -> Vec<Value> {
        self.0
            .lock()
            .iter()
            .map(|slot| unsafe { read_variant(slot.as_ptr().cast()) })
            .collect()
    }

    pub(super) fn len(&self) -> usize {
        self.0.lock().len()
    }

    fn slot(&self, index: GdInt) -> VariantPtr {
        let mut slots = self.0.lock();
        match usize::try_from(index).ok().and_then(|i| slots.get_mut(i)) {
            Some(slot) => slot.as_mut_ptr().cast(),
            None => std::ptr::null_mut(),
        }
    }
}

impl Drop for Slots {
    fn drop(&mut self) {
        for slot in self.0.get_mut().iter_mut() {
            unsafe { destroy_variant(slot.as_mut_ptr().cast()) };
        }
    }
}

/// Key/value slots of a dictionary, in insertion order.
#[derive(Default)]
pub(super) struct Dict(Mutex<Vec<(Value, Box<[u64; 3]>)>>);

impl Dict {
    fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .lock()
            .iter()
            .map(|(key, slot)| (key.clone(), unsafe { read_variant(slot.as_ptr().cast()) }))
            .collect()
    }

    pub(super) fn get(&self, key: &Value) -> Option<Value> {
        self.0
            .lock()
            .iter()
            .find(|(k, _)| k.same(key))
            .map(|(_, slot)| unsafe { read_variant(slot.as_ptr().cast()) })
    }

    fn slot(&self, key: Value, insert: bool) -> VariantPtr {
        let mut entries = self.0.lock();
        if let Some(index) = entries.iter().position(|(k, _)| k.same(&key)) {
            return entries[index].1.as_mut_ptr().cast();
        }
        if !insert {
            return std::ptr::null_mut();
        }
        entries.push((key, Box::new([0u64; 3])));
        match entries.last_mut() {
            Some((_, slot)) => slot.as_mut_ptr().cast(),
            None => std::ptr::null_mut(),
        }
    }
}

impl Drop for Dict {
    fn drop(&mut self) {
        for (_, slot) in self.0.get_mut().iter_mut() {
            unsafe { destroy_variant(slot.as_mut_ptr().cast()) };
        }
    }
}

/// A callable created through `callable_custom_create`.
pub(super) struct CustomCallable {
    pub(super) info: CallableCustomInfo,
}

// SAFETY: the extension promises its custom callables are thread-safe.
unsafe impl Send for CustomCallable {}
unsafe impl Sync for CustomCallable {}

impl CustomCallable {
    fn describe(&self) -> String {
        let Some(to_string) = self.info.to_string_func else {
            return "<custom callable>".to_string();
        };
        let mut out = [0u64; 1];
        unsafe {
            write_string(out.as_mut_ptr().cast(), String::new());
            let mut valid: GdBool = FALSE;
            to_string(self.info.callable_userdata, &mut valid, out.as_mut_ptr().cast());
            let text = read_boxed(out.as_ptr());
            destroy_typed(VariantType::String, out.as_mut_ptr());
            text
        }
    }
}

impl Drop for CustomCallable {
    fn drop(&mut self) {
        if let Some(free) = self.info.free_func {
            unsafe { free(self.info.callable_userdata) };
        }
    }
}

/// A packed array with a fixed element count.
pub(super) struct Packed {
    ty: VariantType,
    len: usize,
    words: Mutex<Vec<u64>>,
}

fn element_size(ty: VariantType) -> usize {
    match ty {
        VariantType::PackedByteArray => 1,
        VariantType::PackedInt32Array | VariantType::PackedFloat32Array => 4,
        VariantType::PackedVector3Array => 12,
        VariantType::PackedColorArray | VariantType::PackedVector4Array => 16,
        _ => 8,
    }
}

impl Packed {
    fn empty(ty: VariantType) -> Self {
        Self::zeroed(ty, 0)
    }

    /// `len` zeroed elements; string elements start empty.
    pub(super) fn zeroed(ty: VariantType, len: usize) -> Self {
        let words = (len * element_size(ty)).div_ceil(8);
        let packed = Self {
            ty,
            len,
            words: Mutex::new(vec![0; words]),
        };
        if ty == VariantType::PackedStringArray {
            let mut words = packed.words.lock();
            for word in words.iter_mut() {
                unsafe { write_string((word as *mut u64).cast(), String::new()) };
            }
        }
        packed
    }

    fn element(&self, index: GdInt) -> *mut c_void {
        let Some(index) = usize::try_from(index).ok().filter(|i| *i < self.len) else {
            return std::ptr::null_mut();
        };
        let mut words = self.words.lock();
        unsafe { words.as_mut_ptr().cast::<u8>().add(index * element_size(self.ty)).cast() }
    }
}

impl Drop for Packed {
    fn drop(&mut self) {
        if self.ty == VariantType::PackedStringArray {
            for word in self.words.get_mut().iter_mut() {
                unsafe { destroy_typed(VariantType::String, word) };
            }
        }
    }
}

// ============================================================================
// Typed storage
// ============================================================================

unsafe fn read_boxed(src: *const u64) -> String {
    let raw = src.read() as *const String;
    if raw.is_null() {
        String::new()
    } else {
        (*raw).clone()
    }
}

pub(super) unsafe fn write_string(dst: *mut c_void, text: String) {
    dst.cast::<u64>().write(Box::into_raw(Box::new(text)) as u64);
}

unsafe fn share<X>(src: *const u64) -> Option<Arc<X>> {
    let raw = src.read() as *const X;
    if raw.is_null() {
        return None;
    }
    Arc::increment_strong_count(raw);
    Some(Arc::from_raw(raw))
}

unsafe fn release<X>(dst: *mut u64) {
    let raw = dst.read() as *const X;
    if !raw.is_null() {
        drop(Arc::from_raw(raw));
    }
    dst.write(0);
}

/// Copy of the value stored at `src`.
pub(super) unsafe fn read_typed(ty: VariantType, src: *const u64) -> Value {
    match ty {
        VariantType::Nil => Value::Nil,
        VariantType::Bool => Value::Bool(src.cast::<u8>().read() != 0),
        VariantType::Int => Value::Int(src.cast::<i64>().read()),
        VariantType::Float => Value::Float(src.cast::<f64>().read()),
        VariantType::String => Value::String(read_boxed(src)),
        VariantType::NodePath => Value::NodePath(read_boxed(src)),
        VariantType::StringName => Value::StringName(src.read()),
        VariantType::Object => Value::Object(src.cast::<usize>().read()),
        VariantType::Array => Value::Array(share(src).unwrap_or_default()),
        VariantType::Dictionary => Value::Dictionary(share(src).unwrap_or_default()),
        VariantType::Callable => Value::Callable(share(src)),
        ty if is_packed(ty) => Value::Packed(share(src).unwrap_or_else(|| Arc::new(Packed::empty(ty)))),
        ty => {
            let mut words = [0u64; 2];
            std::ptr::copy_nonoverlapping(src, words.as_mut_ptr(), ty.words().min(2));
            Value::Plain(ty, words)
        }
    }
}

/// Initialize storage of type `ty` at `dst` with `value`.
pub(super) unsafe fn write_typed(ty: VariantType, dst: *mut u64, value: Value) {
    let value = if value.variant_type() == ty {
        value
    } else {
        default_of(ty)
    };
    match value {
        Value::Nil => {}
        Value::Bool(b) => dst.write(u64::from(b)),
        Value::Int(i) => dst.cast::<i64>().write(i),
        Value::Float(f) => dst.cast::<f64>().write(f),
        Value::String(s) | Value::NodePath(s) => write_string(dst.cast(), s),
        Value::StringName(id) => dst.write(id),
        Value::Object(ptr) => dst.write(ptr as u64),
        Value::Array(slots) => dst.write(Arc::into_raw(slots) as u64),
        Value::Dictionary(dict) => dst.write(Arc::into_raw(dict) as u64),
        Value::Callable(callable) => {
            dst.write(callable.map_or(0, |c| Arc::into_raw(c) as u64));
            dst.add(1).write(0);
        }
        Value::Packed(packed) => {
            dst.write(Arc::into_raw(packed) as u64);
            dst.add(1).write(0);
        }
        Value::Plain(ty, words) => std::ptr::copy_nonoverlapping(words.as_ptr(), dst, ty.words().min(2)),
    }
}

pub(super) unsafe fn destroy_typed(ty: VariantType, dst: *mut u64) {
    match ty {
        VariantType::String | VariantType::NodePath => {
            let raw = dst.read() as *mut String;
            if !raw.is_null() {
                drop(Box::from_raw(raw));
            }
            dst.write(0);
        }
        VariantType::Array => release::<Slots>(dst),
        VariantType::Dictionary => release::<Dict>(dst),
        VariantType::Callable => release::<CustomCallable>(dst),
        ty if is_packed(ty) => release::<Packed>(dst),
        _ => {}
    }
}

pub(super) unsafe fn read_variant(src: *const c_void) -> Value {
    let words = src.cast::<u64>();
    if words.read() == 0 {
        return Value::Nil;
    }
    let boxed = words.add(1).read() as *const Value;
    if boxed.is_null() {
        Value::Nil
    } else {
        (*boxed).clone()
    }
}

/// Initialize the variant at `dst`.
pub(super) unsafe fn write_variant(dst: *mut c_void, value: Value) {
    let words = dst.cast::<u64>();
    let tag = value.variant_type() as u64;
    words.write(tag);
    words
        .add(1)
        .write(if tag == 0 { 0 } else { Box::into_raw(Box::new(value)) as u64 });
    words.add(2).write(0);
}

pub(super) unsafe fn destroy_variant(dst: *mut c_void) {
    let words = dst.cast::<u64>();
    let boxed = words.add(1).read() as *mut Value;
    if words.read() != 0 && !boxed.is_null() {
        drop(Box::from_raw(boxed));
    }
    std::ptr::write_bytes(words, 0, 3);
}

// ============================================================================
// Variant entries
// ============================================================================

pub(super) unsafe extern "C" fn variant_new_copy(dst: VariantPtr, src: ConstVariantPtr) {
    write_variant(dst, read_variant(src));
}

pub(super) unsafe extern "C" fn variant_new_nil(dst: VariantPtr) {
    write_variant(dst, Value::Nil);
}

pub(super) unsafe extern "C" fn variant_destroy(variant: VariantPtr) {
    destroy_variant(variant);
}

pub(super) unsafe extern "C" fn variant_get_type(variant: ConstVariantPtr) -> RawVariantType {
    variant.cast::<u64>().read() as RawVariantType
}

pub(super) unsafe extern "C" fn variant_booleanize(variant: ConstVariantPtr) -> GdBool {
    if read_variant(variant).truthy() {
        TRUE
    } else {
        FALSE
    }
}

pub(super) unsafe extern "C" fn variant_stringify(variant: ConstVariantPtr, out: StringPtr) {
    destroy_typed(VariantType::String, out.cast());
    write_string(out, stringify(&read_variant(variant)));
}

pub(super) unsafe extern "C" fn variant_hash(variant: ConstVariantPtr) -> GdInt {
    let text = stringify(&read_variant(variant));
    text.bytes()
        .fold(5381i64, |hash, byte| hash.wrapping_mul(33) ^ i64::from(byte))
}

pub(super) unsafe extern "C" fn variant_get_type_name(ty: RawVariantType, out: StringPtr) {
    write_string(out, format!("{:?}", VariantType::from_raw(ty)));
}

unsafe extern "C" fn from_type<const T: u32>(dst: VariantPtr, src: TypePtr) {
    write_variant(dst, read_typed(VariantType::from_raw(T), src.cast()));
}

unsafe extern "C" fn to_type<const T: u32>(dst: TypePtr, src: VariantPtr) {
    let ty = VariantType::from_raw(T);
    // Assigns into initialized storage.
    destroy_typed(ty, dst.cast());
    write_typed(ty, dst.cast(), read_variant(src));
}

unsafe extern "C" fn construct_default<const T: u32>(base: TypePtr, _args: *const ConstTypePtr) {
    let ty = VariantType::from_raw(T);
    write_typed(ty, base.cast(), default_of(ty));
}

unsafe extern "C" fn construct_copy<const T: u32>(base: TypePtr, args: *const ConstTypePtr) {
    let ty = VariantType::from_raw(T);
    write_typed(ty, base.cast(), read_typed(ty, (*args).cast()));
}

unsafe extern "C" fn destruct<const T: u32>(base: TypePtr) {
    destroy_typed(VariantType::from_raw(T), base.cast());
}

unsafe extern "C" fn string_from_name(base: TypePtr, args: *const ConstTypePtr) {
    write_string(base, name_at(*args));
}

unsafe extern "C" fn string_from_path(base: TypePtr, args: *const ConstTypePtr) {
    write_string(base, string_at(*args));
}

unsafe extern "C" fn path_from_string(base: TypePtr, args: *const ConstTypePtr) {
    write_string(base, string_at(*args));
}

macro_rules! per_type {
    ($raw:expr, $f:ident as $t:ty) => {
        per_type!(@arms $raw, $f, $t,
            1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19
            20 21 22 23 24 25 26 27 28 29 30 31 32 33 34 35 36 37 38)
    };
    (@arms $raw:expr, $f:ident, $t:ty, $($n:literal)*) => {
        match $raw {
            $($n => Some($f::<$n> as $t),)*
            _ => None,
        }
    };
}

pub(super) unsafe extern "C" fn get_variant_from_type_constructor(
    ty: RawVariantType,
) -> Option<VariantFromTypeConstructor> {
    per_type!(ty, from_type as VariantFromTypeConstructor)
}

pub(super) unsafe extern "C" fn get_variant_to_type_constructor(
    ty: RawVariantType,
) -> Option<TypeFromVariantConstructor> {
    per_type!(ty, to_type as TypeFromVariantConstructor)
}

pub(super) unsafe extern "C" fn variant_get_ptr_constructor(ty: RawVariantType, index: i32) -> Option<PtrConstructor> {
    match (VariantType::from_raw(ty), index) {
        (VariantType::String, 2) => Some(string_from_name as PtrConstructor),
        (VariantType::String, 3) => Some(string_from_path as PtrConstructor),
        (VariantType::NodePath, 2) => Some(path_from_string as PtrConstructor),
        (_, 0) => per_type!(ty, construct_default as PtrConstructor),
        (_, 1) => per_type!(ty, construct_copy as PtrConstructor),
        _ => None,
    }
}

pub(super) unsafe extern "C" fn variant_get_ptr_destructor(ty: RawVariantType) -> Option<PtrDestructor> {
    per_type!(ty, destruct as PtrDestructor)
}

// ============================================================================
// String entries
// ============================================================================

pub(super) unsafe extern "C" fn string_new_with_utf8_chars_and_len(dst: StringPtr, text: *const c_char, len: GdInt) {
    let bytes = if text.is_null() || len <= 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(text.cast::<u8>(), len as usize)
    };
    write_string(dst, String::from_utf8_lossy(bytes).into_owned());
}

pub(super) unsafe extern "C" fn string_to_utf8_chars(string: ConstStringPtr, out: *mut c_char, max: GdInt) -> GdInt {
    let text = string_at(string);
    if !out.is_null() && max > 0 {
        let count = text.len().min(max as usize);
        std::ptr::copy_nonoverlapping(text.as_ptr(), out.cast::<u8>(), count);
    }
    text.len() as GdInt
}

pub(super) unsafe extern "C" fn string_name_new_with_utf8_chars_and_len(
    dst: StringNamePtr,
    text: *const c_char,
    len: GdInt,
) {
    let bytes = if text.is_null() || len <= 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(text.cast::<u8>(), len as usize)
    };
    dst.cast::<u64>().write(intern(&String::from_utf8_lossy(bytes)));
}

// ============================================================================
// Collection entries
// ============================================================================

pub(super) unsafe extern "C" fn array_operator_index(array: TypePtr, index: GdInt) -> VariantPtr {
    match share::<Slots>(array.cast()) {
        Some(slots) => slots.slot(index),
        None => std::ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn array_operator_index_const(array: ConstTypePtr, index: GdInt) -> VariantPtr {
    array_operator_index(array.cast_mut(), index)
}

pub(super) unsafe extern "C" fn dictionary_operator_index(dict: TypePtr, key: ConstVariantPtr) -> VariantPtr {
    match share::<Dict>(dict.cast()) {
        Some(dict) => dict.slot(read_variant(key), true),
        None => std::ptr::null_mut(),
    }
}

pub(super) unsafe extern "C" fn dictionary_operator_index_const(dict: ConstTypePtr, key: ConstVariantPtr) -> VariantPtr {
    match share::<Dict>(dict.cast()) {
        Some(dict) => dict.slot(read_variant(key), false),
        None => std::ptr::null_mut(),
    }
}

unsafe fn packed_element(array: TypePtr, index: GdInt) -> *mut c_void {
    match share::<Packed>(array.cast()) {
        Some(packed) => packed.element(index),
        None => std::ptr::null_mut(),
    }
}

macro_rules! packed_index {
    ($($name:ident -> $ret:ty),* $(,)?) => {$(
        pub(super) unsafe extern "C" fn $name(array: TypePtr, index: GdInt) -> $ret {
            packed_element(array, index).cast()
        }
    )*};
}

packed_index! {
    packed_byte_array_operator_index -> *mut u8,
    packed_int32_array_operator_index -> *mut i32,
    packed_int64_array_operator_index -> *mut i64,
    packed_float32_array_operator_index -> *mut f32,
    packed_float64_array_operator_index -> *mut f64,
    packed_string_array_operator_index -> StringPtr,
    packed_vector2_array_operator_index -> TypePtr,
    packed_vector3_array_operator_index -> TypePtr,
    packed_color_array_operator_index -> TypePtr,
}

pub(super) unsafe extern "C" fn callable_custom_create(dst: TypePtr, info: *mut CallableCustomInfo) {
    let callable = Arc::new(CustomCallable { info: *info });
    write_typed(VariantType::Callable, dst.cast(), Value::Callable(Some(callable)));
}
