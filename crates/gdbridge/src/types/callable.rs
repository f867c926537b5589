// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine `Callable`, including callables backed by a Rust closure.

use std::ffi::c_void;
use std::fmt;

use super::{opaque_handle, StringName, ToVariant, Variant, VariantType};
use crate::abi::{CallError, CallErrorKind, CallableCustomInfo, ConstVariantPtr, GdInt, VariantPtr};
use crate::host::host;

opaque_handle!(
    /// Engine `Callable` (object + method pair or custom callable).
    Callable,
    VariantType::Callable,
    2
);

type CallableFn = Box<dyn Fn(&[&Variant]) -> Variant + Send + Sync>;

struct CustomCallable {
    name: String,
    function: CallableFn,
}

unsafe extern "C" fn custom_call(
    userdata: *mut c_void,
    args: *const ConstVariantPtr,
    arg_count: GdInt,
    ret: VariantPtr,
    error: *mut CallError,
) {
    crate::ownership::reconcile_if_due();
    let custom = &*userdata.cast::<CustomCallable>();
    let count = usize::try_from(arg_count).unwrap_or(0);
    let borrowed: Vec<&Variant> = (0..count)
        .map(|i| Variant::borrow_sys(*args.add(i)))
        .collect();
    // `ret` holds an initialized variant; assignment drops it.
    *ret.cast::<Variant>() = (custom.function)(&borrowed);
    if !error.is_null() {
        (*error).error = CallErrorKind::Ok as u32;
    }
}

unsafe extern "C" fn custom_free(userdata: *mut c_void) {
    drop(Box::from_raw(userdata.cast::<CustomCallable>()));
}

unsafe extern "C" fn custom_to_string(
    userdata: *mut c_void,
    is_valid: *mut crate::abi::GdBool,
    out: crate::abi::StringPtr,
) {
    let custom = &*userdata.cast::<CustomCallable>();
    // `out` holds an initialized String; assignment drops it.
    *out.cast::<super::GString>() = super::GString::new(&custom.name);
    *is_valid = crate::abi::TRUE;
}

impl Callable {
    /// Wrap a closure as a custom callable owned by the engine.
    ///
    /// `name` only shows up when the callable is printed.
    pub fn from_fn<F>(name: &str, function: F) -> Self
    where
        F: Fn(&[&Variant]) -> Variant + Send + Sync + 'static,
    {
        let userdata = Box::into_raw(Box::new(CustomCallable {
            name: name.to_string(),
            function: Box::new(function),
        }));
        let mut info = CallableCustomInfo {
            callable_userdata: userdata.cast(),
            token: host().library(),
            object_id: 0,
            call_func: Some(custom_call),
            is_valid_func: None,
            free_func: Some(custom_free),
            hash_func: None,
            equal_func: None,
            less_than_func: None,
            to_string_func: Some(custom_to_string),
        };
        let mut opaque = [0u64; 2];
        unsafe { (host().abi.callable_custom_create)(opaque.as_mut_ptr().cast(), &mut info) };
        Self { opaque }
    }

    /// Invoke the callable through the engine.
    pub fn call(&self, args: &[&Variant]) -> Result<Variant, CallErrorKind> {
        let mut target = self.to_variant();
        target.call(&StringName::new("call"), args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.to_variant().stringify())
    }
}
