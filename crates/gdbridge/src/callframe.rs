// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call frames: the packed argument and return buffer of one native call.
//!
//! # Wire layout
//!
//! Every value crossing the boundary occupies a whole number of 64-bit words:
//!
//! ```text
//! scalar / object / String / StringName / Array   1 word
//! packed array / Callable / Vector3 / Color       2 words
//! Variant                                         3 words
//! ```
//!
//! A frame is allocated once with the exact sum of its argument footprints
//! plus the return slot, filled in declaration order, handed to the engine as
//! an array of pointers, then dropped.

use std::ffi::c_void;

use crate::abi::{CallError, CallErrorKind, ConstTypePtr, ConstVariantPtr, GdInt, MethodBindPtr, TypePtr};
use crate::host::host;
use crate::logging::fatal;
use crate::types::{ObjectPtr, StringName, Variant};

/// Fixed word encoding of a value written into a call frame.
///
/// `write_wire` copies the bits without transferring ownership: the frame
/// borrows the value for the duration of the call.
///
/// # Safety
///
/// `WORDS` must cover every byte `write_wire` touches, and the encoding must
/// be the engine's typed storage for the value.
pub unsafe trait Wire: Sized {
    const WORDS: usize;

    /// Copy the value into `dst` (borrowed for the call).
    ///
    /// # Safety
    ///
    /// `dst` must have room for `WORDS` words.
    unsafe fn write_wire(&self, dst: *mut u64);
}

/// A [`Wire`] value that can also be read back out of a slot.
///
/// # Safety
///
/// `read_wire` must accept exactly what the engine stores for this type.
pub unsafe trait FromWire: Wire {
    /// Take ownership of the value stored at `src`.
    ///
    /// # Safety
    ///
    /// `src` must hold a valid value of this type, read at most once.
    unsafe fn read_wire(src: *const u64) -> Self;

    /// Prepare a return slot. Handle types default-construct, since the engine
    /// assigns into the slot rather than initializing it.
    ///
    /// # Safety
    ///
    /// `dst` must have room for `WORDS` words.
    unsafe fn init_slot(_dst: *mut u64) {}
}

// Arguments may be passed by reference.
unsafe impl<W: Wire> Wire for &W {
    const WORDS: usize = W::WORDS;

    unsafe fn write_wire(&self, dst: *mut u64) {
        (**self).write_wire(dst);
    }
}

// The void return shape.
unsafe impl Wire for () {
    const WORDS: usize = 0;

    unsafe fn write_wire(&self, _dst: *mut u64) {}
}

unsafe impl FromWire for () {
    unsafe fn read_wire(_src: *const u64) -> Self {}
}

/// Argument list with a statically known frame layout.
pub trait WireArgs {
    /// Word footprint of each argument, in order.
    const FOOTPRINTS: &'static [usize];

    fn push_all(&self, frame: &mut CallFrame);
}

macro_rules! wire_args {
    ($($name:ident: $idx:tt),*) => {
        impl<$($name: Wire),*> WireArgs for ($($name,)*) {
            const FOOTPRINTS: &'static [usize] = &[$($name::WORDS),*];

            #[allow(unused_variables)]
            fn push_all(&self, frame: &mut CallFrame) {
                $(frame.push(&self.$idx);)*
            }
        }
    };
}

wire_args!();
wire_args!(A: 0);
wire_args!(A: 0, B: 1);
wire_args!(A: 0, B: 1, C: 2);
wire_args!(A: 0, B: 1, C: 2, D: 3);
wire_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
wire_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Transient argument/return buffer for one call.
pub struct CallFrame {
    words: Box<[u64]>,
    offsets: Box<[usize]>,
    footprints: Box<[usize]>,
    pushed: usize,
    ret_offset: usize,
    ret_words: usize,
    arg_ptrs: Vec<ConstTypePtr>,
    /// Destroys an initialized return slot that was never taken.
    pending_return: Option<unsafe fn(*const u64)>,
}

unsafe fn drop_slot<R: FromWire>(src: *const u64) {
    drop(R::read_wire(src));
}

impl CallFrame {
    /// Allocate a frame for arguments of the given footprints and a return
    /// slot of `ret_words` (0 for void).
    #[must_use]
    pub fn new(arg_footprints: &[usize], ret_words: usize) -> Self {
        let mut offsets = Vec::with_capacity(arg_footprints.len());
        let mut total = 0;
        for words in arg_footprints {
            offsets.push(total);
            total += words;
        }
        Self {
            words: vec![0u64; total + ret_words].into_boxed_slice(),
            offsets: offsets.into_boxed_slice(),
            footprints: arg_footprints.into(),
            pushed: 0,
            ret_offset: total,
            ret_words,
            arg_ptrs: Vec::with_capacity(arg_footprints.len()),
            pending_return: None,
        }
    }

    /// Frame sized for `A` and `R`.
    #[must_use]
    pub fn for_signature<A: WireArgs, R: FromWire>() -> Self {
        Self::new(A::FOOTPRINTS, R::WORDS)
    }

    /// Total words, return slot included.
    #[must_use]
    pub fn len_words(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.offsets.len()
    }

    /// Write the next argument.
    ///
    /// # Panics
    ///
    /// Panics when the frame is full or the value's footprint differs from the
    /// declared slot; both are contract violations of the caller.
    pub fn push<W: Wire>(&mut self, value: &W) {
        let index = self.pushed;
        let Some(&declared) = self.footprints.get(index) else {
            fatal(&format!("call frame overflow: argument #{index} was never declared"));
        };
        if declared != W::WORDS {
            fatal(&format!(
                "call frame argument #{index} declared {declared} words, got {}",
                W::WORDS
            ));
        }
        let offset = self.offsets[index];
        unsafe { value.write_wire(self.words.as_mut_ptr().add(offset)) };
        self.pushed += 1;
    }

    /// Initialize the return slot for `R`.
    pub fn prepare_return<R: FromWire>(&mut self) {
        if R::WORDS != self.ret_words {
            fatal(&format!(
                "call frame return declared {} words, got {}",
                self.ret_words,
                R::WORDS
            ));
        }
        self.release_return();
        if R::WORDS > 0 {
            unsafe { R::init_slot(self.ret_slot()) };
            self.pending_return = Some(drop_slot::<R>);
        }
    }

    /// Pointer array for the engine. Every declared argument must be pushed.
    pub fn arg_ptrs(&mut self) -> *const ConstTypePtr {
        if self.pushed != self.offsets.len() {
            fatal(&format!(
                "call frame sealed with {} of {} arguments",
                self.pushed,
                self.offsets.len()
            ));
        }
        if self.arg_ptrs.is_empty() {
            let base = self.words.as_ptr();
            self.arg_ptrs
                .extend(self.offsets.iter().map(|&offset| unsafe { base.add(offset) }.cast::<c_void>()));
        }
        self.arg_ptrs.as_ptr()
    }

    /// Return slot pointer; null for void.
    pub fn ret_ptr(&mut self) -> TypePtr {
        if self.ret_words == 0 {
            std::ptr::null_mut()
        } else {
            self.ret_slot().cast()
        }
    }

    fn ret_slot(&mut self) -> *mut u64 {
        unsafe { self.words.as_mut_ptr().add(self.ret_offset) }
    }

    /// Take ownership of the return value.
    pub fn take_return<R: FromWire>(&mut self) -> R {
        if R::WORDS != self.ret_words {
            fatal(&format!(
                "call frame return declared {} words, read as {}",
                self.ret_words,
                R::WORDS
            ));
        }
        self.pending_return = None;
        unsafe { R::read_wire(self.words.as_ptr().add(self.ret_offset)) }
    }

    /// Read argument `index` back out of the frame.
    ///
    /// # Safety
    ///
    /// The frame only borrowed its arguments: for handle types the result
    /// aliases the pushed value and must not be dropped alongside it.
    pub unsafe fn read_arg<W: FromWire>(&self, index: usize) -> W {
        if self.footprints.get(index) != Some(&W::WORDS) {
            fatal(&format!("call frame argument #{index} read with the wrong footprint"));
        }
        W::read_wire(self.words.as_ptr().add(self.offsets[index]))
    }

    fn release_return(&mut self) {
        if let Some(drop_fn) = self.pending_return.take() {
            unsafe { drop_fn(self.words.as_ptr().add(self.ret_offset)) };
        }
    }
}

impl Drop for CallFrame {
    fn drop(&mut self) {
        self.release_return();
    }
}

/// Declared shape of an engine method bind.
#[derive(Debug, Clone, Copy)]
pub struct BindSpec {
    pub class: &'static str,
    pub method: &'static str,
    pub hash: i64,
    /// Argument footprints in words.
    pub args: &'static [usize],
    /// Return footprint in words (0 for void).
    pub ret: usize,
}

/// Resolved engine method.
#[derive(Debug, Clone, Copy)]
pub struct MethodBind {
    ptr: MethodBindPtr,
    spec: Option<&'static BindSpec>,
}

// SAFETY: method binds are immutable engine-lifetime tables.
unsafe impl Send for MethodBind {}
unsafe impl Sync for MethodBind {}

impl MethodBind {
    /// Look up `class.method` with the engine's compatibility hash.
    #[must_use]
    pub fn lookup(class: &str, method: &str, hash: i64) -> Option<Self> {
        let class = StringName::new(class);
        let method = StringName::new(method);
        let ptr = unsafe { (host().abi.classdb_get_method_bind)(class.sys(), method.sys(), hash) };
        (!ptr.is_null()).then_some(Self { ptr, spec: None })
    }

    /// Look up a bind whose frame layout is checked on every ptrcall.
    #[must_use]
    pub fn from_spec(spec: &'static BindSpec) -> Option<Self> {
        let bind = Self::lookup(spec.class, spec.method, spec.hash);
        if bind.is_none() {
            log::warn!(
                "[callframe] engine has no method bind {}.{} ({})",
                spec.class,
                spec.method,
                spec.hash
            );
        }
        bind.map(|bind| Self {
            spec: Some(spec),
            ..bind
        })
    }

    #[must_use]
    pub fn as_raw(self) -> MethodBindPtr {
        self.ptr
    }

    /// Typed call through a call frame.
    pub fn ptrcall<A: WireArgs, R: FromWire>(self, object: ObjectPtr, args: A) -> R {
        if let Some(spec) = self.spec {
            if spec.args != A::FOOTPRINTS || spec.ret != R::WORDS {
                fatal(&format!(
                    "{}.{} called with frame {:?} -> {}, declared {:?} -> {}",
                    spec.class,
                    spec.method,
                    A::FOOTPRINTS,
                    R::WORDS,
                    spec.args,
                    spec.ret
                ));
            }
        }
        let mut frame = CallFrame::for_signature::<A, R>();
        args.push_all(&mut frame);
        frame.prepare_return::<R>();
        unsafe { self.ptrcall_frame(object, &mut frame) };
        frame.take_return::<R>()
    }

    /// Invoke with a frame the caller filled in.
    ///
    /// # Safety
    ///
    /// The frame layout must match the bind's native signature.
    pub unsafe fn ptrcall_frame(self, object: ObjectPtr, frame: &mut CallFrame) {
        let args = frame.arg_ptrs();
        let ret = frame.ret_ptr();
        (host().abi.object_method_bind_ptrcall)(self.ptr, object.as_raw(), args, ret);
    }

    /// Dynamic call with variant arguments (vararg binds included).
    pub fn call(self, object: ObjectPtr, args: &[&Variant]) -> Result<Variant, CallErrorKind> {
        let arg_ptrs: Vec<ConstVariantPtr> = args.iter().map(|arg| arg.sys()).collect();
        let mut error = CallError::default();
        let result = unsafe {
            Variant::from_sys_init(|dst| {
                (host().abi.object_method_bind_call)(
                    self.ptr,
                    object.as_raw(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_sized_from_footprints() {
        let frame = CallFrame::new(&[1, 2, 3], 1);
        assert_eq!(frame.len_words(), 7);
        assert_eq!(frame.arg_count(), 3);
    }

    #[test]
    fn void_frame_has_null_return() {
        let mut frame = CallFrame::for_signature::<(), ()>();
        assert_eq!(frame.len_words(), 0);
        assert!(frame.ret_ptr().is_null());
        frame.prepare_return::<()>();
        frame.take_return::<()>();
    }

    #[test]
    fn arguments_land_in_declaration_order() {
        let mut frame = CallFrame::for_signature::<(i32, bool, f64), i64>();
        frame.push(&-7i32);
        frame.push(&true);
        frame.push(&2.5f64);
        let ptrs = frame.arg_ptrs();
        unsafe {
            assert_eq!(*(*ptrs).cast::<i64>(), -7);
            assert_eq!(*(*ptrs.add(1)).cast::<u8>(), 1);
            assert_eq!(*(*ptrs.add(2)).cast::<f64>(), 2.5);
            assert_eq!(frame.read_arg::<i32>(0), -7);
        }
    }

    #[test]
    fn args_footprints_are_static() {
        assert_eq!(<(i64, bool) as WireArgs>::FOOTPRINTS, &[1, 1]);
        assert!(<() as WireArgs>::FOOTPRINTS.is_empty());
    }

    #[test]
    #[should_panic(expected = "declared 2 words")]
    fn footprint_mismatch_is_fatal() {
        let mut frame = CallFrame::new(&[2], 0);
        frame.push(&1i64);
    }

    #[test]
    #[should_panic(expected = "sealed with 0 of 1")]
    fn unfilled_frame_is_fatal() {
        let mut frame = CallFrame::new(&[1], 0);
        let _ = frame.arg_ptrs();
    }
}
