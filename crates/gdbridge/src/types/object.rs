// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw object pointers.
//!
//! The engine owns every object; an [`ObjectPtr`] is a non-owning, nullable
//! reference that stays valid only while the engine keeps the object alive.
//! Use [`InstanceId`] to re-resolve an object across frames.

use super::{Builtin, StringName, ToVariant, Variant, VariantType};
use crate::abi::RawObject;
use crate::callframe::{FromWire, Wire};
use crate::host::host;

/// Engine object id; stable for the object's lifetime and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// Nullable, non-owning engine object pointer.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectPtr(RawObject);

// SAFETY: the pointer is an opaque engine id; access goes through the ABI.
unsafe impl Send for ObjectPtr {}
unsafe impl Sync for ObjectPtr {}

impl Default for ObjectPtr {
    fn default() -> Self {
        Self::null()
    }
}

impl ObjectPtr {
    #[must_use]
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    #[must_use]
    pub fn from_raw(raw: RawObject) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_raw(self) -> RawObject {
        self.0
    }

    #[must_use]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// `None` for a null pointer.
    #[must_use]
    pub fn non_null(self) -> Option<Self> {
        (!self.is_null()).then_some(self)
    }

    /// Address, used as the key of the instance registry.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0 as usize
    }

    /// Construct a native object of class `class_name`.
    #[must_use]
    pub fn construct(class_name: &str) -> Option<Self> {
        let name = StringName::new(class_name);
        Self::construct_named(&name)
    }

    #[must_use]
    pub fn construct_named(class_name: &StringName) -> Option<Self> {
        Self(unsafe { (host().abi.classdb_construct_object)(class_name.sys()) }).non_null()
    }

    /// Look up a live object by id.
    #[must_use]
    pub fn from_instance_id(id: InstanceId) -> Option<Self> {
        Self(unsafe { (host().abi.object_get_instance_from_id)(id.0) }).non_null()
    }

    #[must_use]
    pub fn instance_id(self) -> InstanceId {
        InstanceId(unsafe { (host().abi.object_get_instance_id)(self.0) })
    }

    /// Engine singleton by name (`Engine`, `Input`, ...).
    #[must_use]
    pub fn singleton(name: &str) -> Option<Self> {
        let name = StringName::new(name);
        Self(unsafe { (host().abi.global_get_singleton)(name.sys()) }).non_null()
    }

    /// Most derived class name, extension classes included.
    #[must_use]
    pub fn class_name(self) -> Option<String> {
        let mut name = StringName::new("");
        let found = unsafe {
            (host().abi.object_get_class_name)(self.0, host().library(), name.sys_mut())
        };
        (found != 0).then(|| name.to_string())
    }

    /// Checked cast to `class_name` or one of its descendants.
    #[must_use]
    pub fn cast_to(self, class_name: &str) -> Option<Self> {
        if self.is_null() {
            return None;
        }
        let name = StringName::new(class_name);
        let tag = unsafe { (host().abi.classdb_get_class_tag)(name.sys()) };
        if tag.is_null() {
            return None;
        }
        Self(unsafe { (host().abi.object_cast_to)(self.0, tag) }).non_null()
    }

    #[must_use]
    pub fn is_class(self, class_name: &str) -> bool {
        self.cast_to(class_name).is_some()
    }

    /// Read property `name` through the engine's property protocol.
    #[must_use]
    pub fn get(self, name: &str) -> Option<Variant> {
        let name = StringName::new(name);
        self.to_variant().get_named(&name)
    }

    /// Assign property `name`; `false` when the engine refused.
    pub fn set(self, name: &str, value: &Variant) -> bool {
        let name = StringName::new(name);
        self.to_variant().set_named(&name, value)
    }

    /// Destroy the object immediately.
    ///
    /// # Safety
    ///
    /// No other reference to the object may be used afterwards.
    pub unsafe fn destroy(self) {
        (host().abi.object_destroy)(self.0);
    }
}

unsafe impl Wire for ObjectPtr {
    const WORDS: usize = 1;

    unsafe fn write_wire(&self, dst: *mut u64) {
        dst.cast::<RawObject>().write(self.0);
    }
}

unsafe impl FromWire for ObjectPtr {
    unsafe fn read_wire(src: *const u64) -> Self {
        Self(src.cast::<RawObject>().read())
    }
}

unsafe impl Builtin for ObjectPtr {
    const VARIANT_TYPE: VariantType = VariantType::Object;
}
