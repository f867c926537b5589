// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The engine's tagged union value.

use std::fmt;
use std::mem::MaybeUninit;

use super::{FromVariant, GString, StringName, ToVariant, VariantType};
use crate::abi::{CallError, CallErrorKind, ConstVariantPtr, GdBool, GdInt, VariantPtr};
use crate::callframe::{FromWire, Wire};
use crate::host::host;
use crate::ownership::Handle;

/// Owned engine `Variant` (three words).
#[repr(C)]
pub struct Variant {
    opaque: [u64; 3],
}

// SAFETY: variants are moved to the signal worker; the engine's variant
// storage is refcounted atomically.
unsafe impl Send for Variant {}
unsafe impl Sync for Variant {}

impl Variant {
    #[must_use]
    pub fn nil() -> Self {
        unsafe { Self::from_sys_init(|dst| (host().abi.variant_new_nil)(dst)) }
    }

    /// Build a variant by letting the engine initialize fresh storage.
    ///
    /// # Safety
    ///
    /// `init` must fully initialize the variant behind the pointer.
    pub unsafe fn from_sys_init(init: impl FnOnce(VariantPtr)) -> Self {
        let mut raw = MaybeUninit::<[u64; 3]>::zeroed();
        init(raw.as_mut_ptr().cast());
        Self {
            opaque: raw.assume_init(),
        }
    }

    /// Borrow a variant the engine owns, for the duration of a callback.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live variant that outlives `'a`.
    pub unsafe fn borrow_sys<'a>(ptr: ConstVariantPtr) -> &'a Variant {
        &*ptr.cast::<Variant>()
    }

    pub fn sys(&self) -> ConstVariantPtr {
        self.opaque.as_ptr().cast()
    }

    pub fn sys_mut(&mut self) -> VariantPtr {
        self.opaque.as_mut_ptr().cast()
    }

    #[must_use]
    pub fn from<T: ToVariant + ?Sized>(value: &T) -> Self {
        value.to_variant()
    }

    #[must_use]
    pub fn to<T: FromVariant>(&self) -> Option<T> {
        T::from_variant(self)
    }

    #[must_use]
    pub fn get_type(&self) -> VariantType {
        VariantType::from_raw(unsafe { (host().abi.variant_get_type)(self.sys()) })
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.get_type() == VariantType::Nil
    }

    #[must_use]
    pub fn booleanize(&self) -> bool {
        unsafe { (host().abi.variant_booleanize)(self.sys()) != 0 }
    }

    #[must_use]
    pub fn stringify(&self) -> String {
        let mut text = GString::new("");
        unsafe { (host().abi.variant_stringify)(self.sys(), text.sys_mut()) };
        text.to_string()
    }

    #[must_use]
    pub fn hash(&self) -> i64 {
        unsafe { (host().abi.variant_hash)(self.sys()) }
    }

    /// Read property or member `name` (objects, dictionaries, vectors).
    #[must_use]
    pub fn get_named(&self, name: &StringName) -> Option<Variant> {
        let mut valid: GdBool = 0;
        let value = unsafe {
            Self::from_sys_init(|dst| {
                (host().abi.variant_get_named)(self.sys(), name.sys(), dst, &mut valid);
            })
        };
        (valid != 0).then_some(value)
    }

    /// Assign property or member `name`; `false` when the engine refused.
    pub fn set_named(&mut self, name: &StringName, value: &Variant) -> bool {
        let mut valid: GdBool = 0;
        unsafe { (host().abi.variant_set_named)(self.sys_mut(), name.sys(), value.sys(), &mut valid) };
        valid != 0
    }

    /// Call builtin or object method `method` with variant arguments.
    pub fn call(&mut self, method: &StringName, args: &[&Variant]) -> Result<Variant, CallErrorKind> {
        let arg_ptrs: Vec<ConstVariantPtr> = args.iter().map(|arg| arg.sys()).collect();
        let mut error = CallError::default();
        let result = unsafe {
            Self::from_sys_init(|dst| {
                (host().abi.variant_call)(
                    self.sys_mut(),
                    method.sys(),
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
}

unsafe impl Handle for Variant {
    type Opaque = [u64; 3];

    fn opaque(&self) -> Self::Opaque {
        self.opaque
    }

    unsafe fn from_opaque(opaque: Self::Opaque) -> Self {
        Self { opaque }
    }
}

unsafe impl Wire for Variant {
    const WORDS: usize = 3;

    unsafe fn write_wire(&self, dst: *mut u64) {
        std::ptr::copy_nonoverlapping(self.opaque.as_ptr(), dst, 3);
    }
}

unsafe impl FromWire for Variant {
    unsafe fn read_wire(src: *const u64) -> Self {
        let mut opaque = [0u64; 3];
        std::ptr::copy_nonoverlapping(src, opaque.as_mut_ptr(), 3);
        Self { opaque }
    }

    unsafe fn init_slot(dst: *mut u64) {
        (host().abi.variant_new_nil)(dst.cast());
    }
}

impl Clone for Variant {
    fn clone(&self) -> Self {
        unsafe { Self::from_sys_init(|dst| (host().abi.variant_new_copy)(dst, self.sys())) }
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        if let Some(host) = crate::host::try_host() {
            unsafe { (host.abi.variant_destroy)(self.sys_mut()) };
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variant({:?}: {})", self.get_type(), self.stringify())
    }
}
