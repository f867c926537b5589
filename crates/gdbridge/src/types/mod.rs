// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cross-boundary value types.
//!
//! Every type here has a fixed wire footprint (see [`Wire`](crate::callframe::Wire))
//! and, for engine-owned storage, a single owner on the Rust side: dropping the
//! value runs the engine destructor, [`Handle::into_opaque`](crate::ownership::Handle::into_opaque)
//! hands it to the engine instead.

mod callable;
mod collections;
mod convert;
mod math;
mod object;
mod strings;
mod variant;

pub use callable::Callable;
pub use collections::{
    Array, Dictionary, PackedArray, PackedByteArray, PackedColorArray, PackedElement,
    PackedFloat32Array, PackedFloat64Array, PackedInt32Array, PackedInt64Array,
    PackedStringArray, PackedVector2Array, PackedVector3Array,
};
pub use convert::{Builtin, FromVariant, ToVariant};
pub use math::{Color, Vector2, Vector2i, Vector3, Vector3i};
pub use object::{InstanceId, ObjectPtr};
pub use strings::{GString, NodePath, StringName};
pub use variant::Variant;

/// Number of variant types known to the ABI (4.3 layout).
pub const VARIANT_MAX: usize = 39;

/// Native variant type tag (`GDExtensionVariantType`).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantType {
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Vector2 = 5,
    Vector2i = 6,
    Rect2 = 7,
    Rect2i = 8,
    Vector3 = 9,
    Vector3i = 10,
    Transform2D = 11,
    Vector4 = 12,
    Vector4i = 13,
    Plane = 14,
    Quaternion = 15,
    Aabb = 16,
    Basis = 17,
    Transform3D = 18,
    Projection = 19,
    Color = 20,
    StringName = 21,
    NodePath = 22,
    Rid = 23,
    Object = 24,
    Callable = 25,
    Signal = 26,
    Dictionary = 27,
    Array = 28,
    PackedByteArray = 29,
    PackedInt32Array = 30,
    PackedInt64Array = 31,
    PackedFloat32Array = 32,
    PackedFloat64Array = 33,
    PackedStringArray = 34,
    PackedVector2Array = 35,
    PackedVector3Array = 36,
    PackedColorArray = 37,
    PackedVector4Array = 38,
}

impl VariantType {
    const ALL: [VariantType; VARIANT_MAX] = [
        Self::Nil,
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::String,
        Self::Vector2,
        Self::Vector2i,
        Self::Rect2,
        Self::Rect2i,
        Self::Vector3,
        Self::Vector3i,
        Self::Transform2D,
        Self::Vector4,
        Self::Vector4i,
        Self::Plane,
        Self::Quaternion,
        Self::Aabb,
        Self::Basis,
        Self::Transform3D,
        Self::Projection,
        Self::Color,
        Self::StringName,
        Self::NodePath,
        Self::Rid,
        Self::Object,
        Self::Callable,
        Self::Signal,
        Self::Dictionary,
        Self::Array,
        Self::PackedByteArray,
        Self::PackedInt32Array,
        Self::PackedInt64Array,
        Self::PackedFloat32Array,
        Self::PackedFloat64Array,
        Self::PackedStringArray,
        Self::PackedVector2Array,
        Self::PackedVector3Array,
        Self::PackedColorArray,
        Self::PackedVector4Array,
    ];

    /// Decode a raw tag; unknown tags read as `Nil`.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        Self::ALL.get(raw as usize).copied().unwrap_or(Self::Nil)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Words this type occupies in a call frame.
    #[must_use]
    pub const fn words(self) -> usize {
        match self {
            Self::Nil => 3,
            Self::Bool | Self::Int | Self::Float | Self::String | Self::Vector2
            | Self::Vector2i | Self::StringName | Self::NodePath | Self::Rid
            | Self::Object | Self::Dictionary | Self::Array => 1,
            Self::Rect2 | Self::Rect2i | Self::Vector3 | Self::Vector3i | Self::Vector4
            | Self::Vector4i | Self::Plane | Self::Quaternion | Self::Color | Self::Callable
            | Self::Signal => 2,
            Self::PackedByteArray
            | Self::PackedInt32Array
            | Self::PackedInt64Array
            | Self::PackedFloat32Array
            | Self::PackedFloat64Array
            | Self::PackedStringArray
            | Self::PackedVector2Array
            | Self::PackedVector3Array
            | Self::PackedColorArray
            | Self::PackedVector4Array => 2,
            Self::Transform2D | Self::Aabb => 3,
            Self::Basis => 5,
            Self::Transform3D => 6,
            Self::Projection => 8,
        }
    }
}

/// Declares an engine-owned handle type with `WORDS` words of opaque storage.
///
/// The generated type owns its storage: `Drop` runs the engine destructor and
/// `Clone` the engine copy constructor.
macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident, $variant:expr, $words:literal) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $name {
            opaque: [u64; $words],
        }

        // SAFETY: engine builtin handles are reference counted atomically.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            /// Default-constructed value.
            #[must_use]
            pub fn new_default() -> Self {
                let ctor = $crate::host::host().default_constructor($variant);
                let mut opaque = [0u64; $words];
                unsafe { ctor(opaque.as_mut_ptr().cast(), std::ptr::null()) };
                Self { opaque }
            }

            pub fn sys(&self) -> $crate::abi::ConstTypePtr {
                self.opaque.as_ptr().cast()
            }

            pub fn sys_mut(&mut self) -> $crate::abi::TypePtr {
                self.opaque.as_mut_ptr().cast()
            }
        }

        unsafe impl $crate::ownership::Handle for $name {
            type Opaque = [u64; $words];

            fn opaque(&self) -> Self::Opaque {
                self.opaque
            }

            unsafe fn from_opaque(opaque: Self::Opaque) -> Self {
                Self { opaque }
            }
        }

        unsafe impl $crate::callframe::Wire for $name {
            const WORDS: usize = $words;

            unsafe fn write_wire(&self, dst: *mut u64) {
                std::ptr::copy_nonoverlapping(self.opaque.as_ptr(), dst, $words);
            }
        }

        unsafe impl $crate::callframe::FromWire for $name {
            unsafe fn read_wire(src: *const u64) -> Self {
                let mut opaque = [0u64; $words];
                std::ptr::copy_nonoverlapping(src, opaque.as_mut_ptr(), $words);
                Self { opaque }
            }

            unsafe fn init_slot(dst: *mut u64) {
                let ctor = $crate::host::host().default_constructor($variant);
                ctor(dst.cast(), std::ptr::null());
            }
        }

        unsafe impl $crate::types::Builtin for $name {
            const VARIANT_TYPE: $crate::types::VariantType = $variant;
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                let ctor = $crate::host::host().copy_constructor($variant);
                let mut opaque = [0u64; $words];
                let args = [self.sys()];
                unsafe { ctor(opaque.as_mut_ptr().cast(), args.as_ptr()) };
                Self { opaque }
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                let dtor = $crate::host::try_host().and_then(|host| host.destructor($variant));
                if let Some(dtor) = dtor {
                    unsafe { dtor(self.sys_mut()) };
                }
            }
        }
    };
}

pub(crate) use opaque_handle;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tags_round_trip() {
        for (index, ty) in VariantType::ALL.iter().enumerate() {
            assert_eq!(VariantType::from_raw(index as u32), *ty);
        }
        assert_eq!(VariantType::from_raw(900), VariantType::Nil);
    }

    #[test]
    fn footprints_follow_wire_layout() {
        assert_eq!(VariantType::Int.words(), 1);
        assert_eq!(VariantType::Object.words(), 1);
        assert_eq!(VariantType::PackedByteArray.words(), 2);
        assert_eq!(VariantType::Nil.words(), 3);
    }
}
