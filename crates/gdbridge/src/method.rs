// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Method Registrar: typed method handlers and their invocation thunks.
//!
//! A handler is any `Fn(&mut T, A1, .., An) -> R` with `n <= 6`, each `Ai`
//! an [`Arg`] and `R` a [`Ret`] (`()` for no return value). The handler is
//! erased into two thunks:
//!
//! - ptrcall: arguments are borrowed typed slots, the return slot is
//!   engine-initialized storage that gets assigned.
//! - call: arguments are variants; count and types are checked and reported
//!   through the native call-error record.

use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use crate::abi::{arg_metadata, CallError, CallErrorKind, ConstTypePtr, TypePtr};
use crate::callframe::{FromWire, Wire};
use crate::types::{Builtin, FromVariant, GString, ToVariant, Variant, VariantType};

/// Argument and return types of a method or virtual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub args: Vec<VariantType>,
    /// `None` for no return value.
    pub ret: Option<VariantType>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|ty| format!("{ty:?}")).collect();
        write!(f, "func({})", args.join(", "))?;
        if let Some(ret) = self.ret {
            write!(f, " {ret:?}")?;
        }
        Ok(())
    }
}

/// A type accepted as a method argument.
pub trait Arg: Sized + 'static {
    fn variant_type() -> VariantType;

    fn metadata() -> u32 {
        arg_metadata::NONE
    }

    /// Copy out of a borrowed typed slot.
    ///
    /// # Safety
    ///
    /// `ptr` must point at live typed storage of `variant_type()`.
    unsafe fn from_arg_ptr(ptr: ConstTypePtr) -> Self;

    fn from_arg_variant(variant: &Variant) -> Option<Self>;
}

impl<T: Builtin + Clone + 'static> Arg for T {
    fn variant_type() -> VariantType {
        T::VARIANT_TYPE
    }

    fn metadata() -> u32 {
        T::METADATA
    }

    unsafe fn from_arg_ptr(ptr: ConstTypePtr) -> Self {
        // The slot stays owned by the engine.
        let borrowed = ManuallyDrop::new(T::read_wire(ptr.cast()));
        T::clone(&borrowed)
    }

    fn from_arg_variant(variant: &Variant) -> Option<Self> {
        T::from_variant(variant)
    }
}

impl Arg for Variant {
    fn variant_type() -> VariantType {
        VariantType::Nil
    }

    unsafe fn from_arg_ptr(ptr: ConstTypePtr) -> Self {
        Variant::borrow_sys(ptr).clone()
    }

    fn from_arg_variant(variant: &Variant) -> Option<Self> {
        Some(variant.clone())
    }
}

impl Arg for String {
    fn variant_type() -> VariantType {
        VariantType::String
    }

    unsafe fn from_arg_ptr(ptr: ConstTypePtr) -> Self {
        GString::from_arg_ptr(ptr).to_string()
    }

    fn from_arg_variant(variant: &Variant) -> Option<Self> {
        String::from_variant(variant)
    }
}

/// A type a method may return.
pub trait Ret: Sized + 'static {
    /// `None` for no return value.
    fn ret_type() -> Option<VariantType>;

    fn metadata() -> u32 {
        arg_metadata::NONE
    }

    /// Assign into an engine-initialized return slot.
    ///
    /// # Safety
    ///
    /// `ret` must point at initialized typed storage of `ret_type()`.
    unsafe fn write_ret_ptr(self, ret: TypePtr);

    fn into_ret_variant(self) -> Variant;
}

/// Replace the value in an initialized slot, handing ownership to the engine.
unsafe fn assign_slot<T: FromWire>(value: T, slot: TypePtr) {
    let slot = slot.cast::<u64>();
    if std::mem::needs_drop::<T>() {
        drop(T::read_wire(slot));
    }
    value.write_wire(slot);
    std::mem::forget(value);
}

impl Ret for () {
    fn ret_type() -> Option<VariantType> {
        None
    }

    unsafe fn write_ret_ptr(self, _ret: TypePtr) {}

    fn into_ret_variant(self) -> Variant {
        Variant::nil()
    }
}

impl<T: Builtin + 'static> Ret for T {
    fn ret_type() -> Option<VariantType> {
        Some(T::VARIANT_TYPE)
    }

    fn metadata() -> u32 {
        T::METADATA
    }

    unsafe fn write_ret_ptr(self, ret: TypePtr) {
        assign_slot(self, ret);
    }

    fn into_ret_variant(self) -> Variant {
        self.to_variant()
    }
}

impl Ret for Variant {
    fn ret_type() -> Option<VariantType> {
        Some(VariantType::Nil)
    }

    unsafe fn write_ret_ptr(self, ret: TypePtr) {
        assign_slot(self, ret);
    }

    fn into_ret_variant(self) -> Variant {
        self
    }
}

impl Ret for String {
    fn ret_type() -> Option<VariantType> {
        Some(VariantType::String)
    }

    unsafe fn write_ret_ptr(self, ret: TypePtr) {
        assign_slot(GString::new(&self), ret);
    }

    fn into_ret_variant(self) -> Variant {
        self.to_variant()
    }
}

/// A typed method on `T` with argument tuple `Args`.
pub trait MethodHandler<T, Args>: Send + Sync + 'static {
    fn signature() -> Signature;

    /// Per-argument metadata followed by the return metadata.
    fn metadata() -> (Vec<u32>, u32);

    /// # Safety
    ///
    /// `args` must hold one live typed slot per argument; `ret` must be
    /// initialized storage of the return type (or null when there is none).
    unsafe fn call_ptr(&self, this: &mut T, args: *const ConstTypePtr, ret: TypePtr);

    fn call_variant(&self, this: &mut T, args: &[&Variant]) -> Result<Variant, CallError>;
}

/// A typed method with no receiver, exported as a static method.
pub trait StaticHandler<Args>: Send + Sync + 'static {
    fn signature() -> Signature;

    fn metadata() -> (Vec<u32>, u32);

    /// # Safety
    ///
    /// Same contract as [`MethodHandler::call_ptr`].
    unsafe fn call_ptr(&self, args: *const ConstTypePtr, ret: TypePtr);

    fn call_variant(&self, args: &[&Variant]) -> Result<Variant, CallError>;
}

macro_rules! count {
    () => { 0usize };
    ($head:tt $($tail:tt)*) => { 1usize + count!($($tail)*) };
}

fn arg_error(kind: CallErrorKind, argument: usize, expected: usize) -> CallError {
    CallError {
        error: kind as u32,
        argument: argument as i32,
        expected: expected as i32,
    }
}

macro_rules! method_handler {
    ($($arg:ident: $idx:tt),*) => {
        impl<T, F, R, $($arg),*> MethodHandler<T, ($($arg,)*)> for F
        where
            T: 'static,
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: Ret,
            $($arg: Arg,)*
        {
            fn signature() -> Signature {
                Signature {
                    args: vec![$($arg::variant_type()),*],
                    ret: R::ret_type(),
                }
            }

            fn metadata() -> (Vec<u32>, u32) {
                (vec![$(<$arg as Arg>::metadata()),*], <R as Ret>::metadata())
            }

            #[allow(unused_variables)]
            unsafe fn call_ptr(&self, this: &mut T, args: *const ConstTypePtr, ret: TypePtr) {
                let value = self(this, $($arg::from_arg_ptr(*args.add($idx))),*);
                if !ret.is_null() {
                    value.write_ret_ptr(ret);
                }
            }

            #[allow(unused_comparisons)]
            fn call_variant(&self, this: &mut T, args: &[&Variant]) -> Result<Variant, CallError> {
                const COUNT: usize = count!($($idx)*);
                if args.len() < COUNT {
                    return Err(arg_error(CallErrorKind::TooFewArguments, 0, COUNT));
                }
                if args.len() > COUNT {
                    return Err(arg_error(CallErrorKind::TooManyArguments, 0, COUNT));
                }
                let value = self(this, $(
                    match $arg::from_arg_variant(args[$idx]) {
                        Some(value) => value,
                        None => {
                            return Err(arg_error(
                                CallErrorKind::InvalidArgument,
                                $idx,
                                $arg::variant_type() as usize,
                            ))
                        }
                    }
                ),*);
                Ok(value.into_ret_variant())
            }
        }

        impl<F, R, $($arg),*> StaticHandler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Ret,
            $($arg: Arg,)*
        {
            fn signature() -> Signature {
                Signature {
                    args: vec![$($arg::variant_type()),*],
                    ret: R::ret_type(),
                }
            }

            fn metadata() -> (Vec<u32>, u32) {
                (vec![$(<$arg as Arg>::metadata()),*], <R as Ret>::metadata())
            }

            #[allow(unused_variables)]
            unsafe fn call_ptr(&self, args: *const ConstTypePtr, ret: TypePtr) {
                let value = self($($arg::from_arg_ptr(*args.add($idx))),*);
                if !ret.is_null() {
                    value.write_ret_ptr(ret);
                }
            }

            #[allow(unused_comparisons)]
            fn call_variant(&self, args: &[&Variant]) -> Result<Variant, CallError> {
                const COUNT: usize = count!($($idx)*);
                if args.len() < COUNT {
                    return Err(arg_error(CallErrorKind::TooFewArguments, 0, COUNT));
                }
                if args.len() > COUNT {
                    return Err(arg_error(CallErrorKind::TooManyArguments, 0, COUNT));
                }
                let value = self($(
                    match $arg::from_arg_variant(args[$idx]) {
                        Some(value) => value,
                        None => {
                            return Err(arg_error(
                                CallErrorKind::InvalidArgument,
                                $idx,
                                $arg::variant_type() as usize,
                            ))
                        }
                    }
                ),*);
                Ok(value.into_ret_variant())
            }
        }
    };
}

method_handler!();
method_handler!(A: 0);
method_handler!(A: 0, B: 1);
method_handler!(A: 0, B: 1, C: 2);
method_handler!(A: 0, B: 1, C: 2, D: 3);
method_handler!(A: 0, B: 1, C: 2, D: 3, E: 4);
method_handler!(A: 0, B: 1, C: 2, D: 3, E: 4, G: 5);

type PtrThunk<T> = Box<dyn Fn(&mut T, *const ConstTypePtr, TypePtr) + Send + Sync>;
type VarThunk<T> = Box<dyn Fn(&mut T, &[&Variant]) -> Result<Variant, CallError> + Send + Sync>;
type StaticPtrThunk = Box<dyn Fn(*const ConstTypePtr, TypePtr) + Send + Sync>;
type StaticVarThunk = Box<dyn Fn(&[&Variant]) -> Result<Variant, CallError> + Send + Sync>;

enum Thunks<T> {
    Instance { ptrcall: PtrThunk<T>, varcall: VarThunk<T> },
    Static { ptrcall: StaticPtrThunk, varcall: StaticVarThunk },
}

/// One exported method, type-erased.
pub struct MethodDescriptor<T> {
    pub(crate) name: String,
    pub(crate) signature: Signature,
    pub(crate) arg_metadata: Vec<u32>,
    pub(crate) ret_metadata: u32,
    thunks: Thunks<T>,
}

impl<T: 'static> MethodDescriptor<T> {
    pub(crate) fn new<Args, H: MethodHandler<T, Args>>(name: &str, handler: H) -> Self {
        let (arg_metadata, ret_metadata) = H::metadata();
        let handler = Arc::new(handler);
        let ptr_handler = Arc::clone(&handler);
        Self {
            name: name.to_string(),
            signature: H::signature(),
            arg_metadata,
            ret_metadata,
            thunks: Thunks::Instance {
                ptrcall: Box::new(move |this: &mut T, args: *const ConstTypePtr, ret: TypePtr| unsafe {
                    ptr_handler.call_ptr(this, args, ret);
                }),
                varcall: Box::new(move |this: &mut T, args: &[&Variant]| handler.call_variant(this, args)),
            },
        }
    }

    pub(crate) fn new_static<Args, H: StaticHandler<Args>>(name: &str, handler: H) -> Self {
        let (arg_metadata, ret_metadata) = H::metadata();
        let handler = Arc::new(handler);
        let ptr_handler = Arc::clone(&handler);
        Self {
            name: name.to_string(),
            signature: H::signature(),
            arg_metadata,
            ret_metadata,
            thunks: Thunks::Static {
                ptrcall: Box::new(move |args: *const ConstTypePtr, ret: TypePtr| unsafe {
                    ptr_handler.call_ptr(args, ret);
                }),
                varcall: Box::new(move |args: &[&Variant]| handler.call_variant(args)),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Called without a receiver.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.thunks, Thunks::Static { .. })
    }

    /// # Safety
    ///
    /// See [`MethodHandler::call_ptr`].
    pub unsafe fn call_ptr(&self, this: &mut T, args: *const ConstTypePtr, ret: TypePtr) {
        match &self.thunks {
            Thunks::Instance { ptrcall, .. } => ptrcall(this, args, ret),
            Thunks::Static { ptrcall, .. } => ptrcall(args, ret),
        }
    }

    pub fn call_variant(&self, this: &mut T, args: &[&Variant]) -> Result<Variant, CallError> {
        match &self.thunks {
            Thunks::Instance { varcall, .. } => varcall(this, args),
            Thunks::Static { varcall, .. } => varcall(args),
        }
    }

    /// Receiver-less typed call; `false` for instance methods, which need
    /// one.
    ///
    /// # Safety
    ///
    /// See [`MethodHandler::call_ptr`].
    pub unsafe fn call_static_ptr(&self, args: *const ConstTypePtr, ret: TypePtr) -> bool {
        match &self.thunks {
            Thunks::Static { ptrcall, .. } => {
                ptrcall(args, ret);
                true
            }
            Thunks::Instance { .. } => false,
        }
    }

    /// Receiver-less variant call; instance methods report a null instance.
    pub fn call_static_variant(&self, args: &[&Variant]) -> Result<Variant, CallError> {
        match &self.thunks {
            Thunks::Static { varcall, .. } => varcall(args),
            Thunks::Instance { .. } => Err(arg_error(CallErrorKind::InstanceIsNull, 0, 0)),
        }
    }
}

/// A user override of a base-class virtual.
pub struct VirtualDescriptor<T> {
    /// Converted lookup key (`_physics_process` -> `PhysicsProcess`).
    pub(crate) key: String,
    pub(crate) method: MethodDescriptor<T>,
}

impl<T: 'static> VirtualDescriptor<T> {
    pub(crate) fn new<Args, H: MethodHandler<T, Args>>(name: &str, handler: H) -> Self {
        Self {
            key: convert_name(name),
            method: MethodDescriptor::new(name, handler),
        }
    }
}

/// Engine virtual name to the key user virtuals are matched by.
///
/// `_physics_process` becomes `PhysicsProcess`; `seek` and `type_string` have
/// fixed spellings.
#[must_use]
pub fn convert_name(name: &str) -> String {
    match name {
        "seek" => return "SeekTo".to_string(),
        "type_string" => return "TypeToString".to_string(),
        _ => {}
    }
    name.to_lowercase()
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `MaxHealth` / `maxHealth` / `max_health` to `max_health`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        total: i64,
    }

    fn signature_of<Args, H: MethodHandler<Counter, Args>>(_handler: &H) -> Signature {
        H::signature()
    }

    #[test]
    fn converted_names_match_original_spelling() {
        assert_eq!(convert_name("_process"), "Process");
        assert_eq!(convert_name("_physics_process"), "PhysicsProcess");
        assert_eq!(convert_name("_ready"), "Ready");
        assert_eq!(convert_name("Process"), "Process");
        assert_eq!(convert_name("seek"), "SeekTo");
        assert_eq!(convert_name("type_string"), "TypeToString");
    }

    #[test]
    fn snake_case_property_names() {
        assert_eq!(to_snake_case("MaxHealth"), "max_health");
        assert_eq!(to_snake_case("speed"), "speed");
        assert_eq!(to_snake_case("max_health"), "max_health");
        assert_eq!(to_snake_case("hp2Max"), "hp2_max");
    }

    #[test]
    fn signatures_come_from_handler_types() {
        let add = |c: &mut Counter, by: i32| {
            c.total += i64::from(by);
            c.total
        };
        assert_eq!(
            signature_of(&add),
            Signature {
                args: vec![VariantType::Int],
                ret: Some(VariantType::Int),
            }
        );

        let reset = |c: &mut Counter| c.total = 0;
        assert_eq!(signature_of(&reset), Signature { args: vec![], ret: None });
        assert_eq!(signature_of(&reset).to_string(), "func()");
    }

    #[test]
    fn ptrcall_thunk_reads_typed_slots() {
        let descriptor = MethodDescriptor::new("add", |c: &mut Counter, a: i32, b: f64| {
            c.total += i64::from(a) + b as i64;
            c.total
        });
        let mut counter = Counter { total: 1 };
        let a = 4i64;
        let b = 2.0f64;
        let args: [ConstTypePtr; 2] = [(&a as *const i64).cast(), (&b as *const f64).cast()];
        let mut ret = 0i64;
        unsafe { descriptor.call_ptr(&mut counter, args.as_ptr(), (&mut ret as *mut i64).cast()) };
        assert_eq!(counter.total, 7);
        assert_eq!(ret, 7);
        assert_eq!(descriptor.arg_metadata, vec![arg_metadata::INT_IS_INT32, arg_metadata::REAL_IS_DOUBLE]);
    }

    #[test]
    fn static_thunks_ignore_the_receiver() {
        let descriptor = MethodDescriptor::<Counter>::new_static("twice", |v: i64| v * 2);
        assert!(descriptor.is_static());
        assert_eq!(descriptor.signature.args, vec![VariantType::Int]);

        let v = 21i64;
        let args: [ConstTypePtr; 1] = [(&v as *const i64).cast()];
        let mut ret = 0i64;
        assert!(unsafe { descriptor.call_static_ptr(args.as_ptr(), (&mut ret as *mut i64).cast()) });
        assert_eq!(ret, 42);

        let mut counter = Counter { total: 5 };
        ret = 0;
        unsafe { descriptor.call_ptr(&mut counter, args.as_ptr(), (&mut ret as *mut i64).cast()) };
        assert_eq!((ret, counter.total), (42, 5));

        let bound = MethodDescriptor::new("bump", |c: &mut Counter| c.total += 1);
        assert!(!bound.is_static());
        let err = bound.call_static_variant(&[]).expect_err("needs an instance");
        assert_eq!(CallErrorKind::from_raw(err.error), CallErrorKind::InstanceIsNull);
    }

    #[test]
    fn variant_thunk_checks_argument_count() {
        let descriptor = MethodDescriptor::new("bump", |c: &mut Counter, by: i64| c.total += by);
        let mut counter = Counter { total: 0 };
        let err = descriptor
            .call_variant(&mut counter, &[])
            .expect_err("missing argument");
        assert_eq!(CallErrorKind::from_raw(err.error), CallErrorKind::TooFewArguments);
        assert_eq!(err.expected, 1);
    }
}
