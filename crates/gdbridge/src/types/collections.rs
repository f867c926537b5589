// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array, Dictionary and packed array handles.
//!
//! Only element access lives here; sizing and the rest of the builtin method
//! surface belong to generated wrapper code.

use std::fmt;
use std::marker::PhantomData;

use super::{opaque_handle, Builtin, Color, GString, Variant, VariantType, Vector2, Vector3};
use crate::abi::{AbiTable, GdInt, TypePtr};
use crate::callframe::{FromWire, Wire};
use crate::host::host;
use crate::ownership::Handle;

opaque_handle!(
    /// Engine `Array` of variants.
    Array,
    VariantType::Array,
    1
);

opaque_handle!(
    /// Engine `Dictionary`.
    Dictionary,
    VariantType::Dictionary,
    1
);

/// Overwrite the engine-owned variant at `slot` with a copy of `value`.
unsafe fn assign_variant(slot: *mut std::ffi::c_void, value: &Variant) {
    let abi = &host().abi;
    (abi.variant_destroy)(slot);
    (abi.variant_new_copy)(slot, value.sys());
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::new_default()
    }

    /// Copy of the element at `index`, `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Variant> {
        let slot = unsafe { (host().abi.array_operator_index_const)(self.sys(), index as GdInt) };
        if slot.is_null() {
            return None;
        }
        Some(unsafe { Variant::borrow_sys(slot) }.clone())
    }

    /// Replace the element at `index`; `false` when out of range.
    pub fn set(&mut self, index: usize, value: &Variant) -> bool {
        let slot = unsafe { (host().abi.array_operator_index)(self.sys_mut(), index as GdInt) };
        if slot.is_null() {
            return false;
        }
        unsafe { assign_variant(slot, value) };
        true
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use super::ToVariant;
        write!(f, "Array({})", self.to_variant().stringify())
    }
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::new_default()
    }

    /// Copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &Variant) -> Option<Variant> {
        let slot = unsafe { (host().abi.dictionary_operator_index_const)(self.sys(), key.sys()) };
        if slot.is_null() {
            return None;
        }
        Some(unsafe { Variant::borrow_sys(slot) }.clone())
    }

    /// Insert or replace the value under `key`.
    pub fn set(&mut self, key: &Variant, value: &Variant) {
        let slot = unsafe { (host().abi.dictionary_operator_index)(self.sys_mut(), key.sys()) };
        if !slot.is_null() {
            unsafe { assign_variant(slot, value) };
        }
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use super::ToVariant;
        write!(f, "Dictionary({})", self.to_variant().stringify())
    }
}

/// Element type of a packed array.
pub trait PackedElement: Sized + 'static {
    const ARRAY_TYPE: VariantType;

    /// Pointer to element `index`, null when out of range.
    ///
    /// # Safety
    ///
    /// `array` must point at a live packed array of this element type.
    unsafe fn element(abi: &AbiTable, array: TypePtr, index: GdInt) -> *mut Self::Stored;

    /// Storage layout of one element inside the array.
    type Stored;

    fn load(stored: &Self::Stored) -> Self;
    fn store(self, stored: &mut Self::Stored);
}

macro_rules! packed_plain {
    ($elem:ty, $array:expr, $index:ident) => {
        impl PackedElement for $elem {
            const ARRAY_TYPE: VariantType = $array;
            type Stored = $elem;

            unsafe fn element(abi: &AbiTable, array: TypePtr, index: GdInt) -> *mut $elem {
                (abi.$index)(array, index).cast()
            }

            fn load(stored: &$elem) -> Self {
                *stored
            }

            fn store(self, stored: &mut $elem) {
                *stored = self;
            }
        }
    };
}

packed_plain!(u8, VariantType::PackedByteArray, packed_byte_array_operator_index);
packed_plain!(i32, VariantType::PackedInt32Array, packed_int32_array_operator_index);
packed_plain!(i64, VariantType::PackedInt64Array, packed_int64_array_operator_index);
packed_plain!(f32, VariantType::PackedFloat32Array, packed_float32_array_operator_index);
packed_plain!(f64, VariantType::PackedFloat64Array, packed_float64_array_operator_index);
packed_plain!(Vector2, VariantType::PackedVector2Array, packed_vector2_array_operator_index);
packed_plain!(Vector3, VariantType::PackedVector3Array, packed_vector3_array_operator_index);
packed_plain!(Color, VariantType::PackedColorArray, packed_color_array_operator_index);

impl PackedElement for GString {
    const ARRAY_TYPE: VariantType = VariantType::PackedStringArray;
    type Stored = GString;

    unsafe fn element(abi: &AbiTable, array: TypePtr, index: GdInt) -> *mut GString {
        (abi.packed_string_array_operator_index)(array, index).cast()
    }

    fn load(stored: &GString) -> Self {
        stored.clone()
    }

    fn store(self, stored: &mut GString) {
        *stored = self;
    }
}

/// Engine packed array (two words: data pointer and size).
#[repr(C)]
pub struct PackedArray<E: PackedElement> {
    opaque: [u64; 2],
    _element: PhantomData<E>,
}

pub type PackedByteArray = PackedArray<u8>;
pub type PackedInt32Array = PackedArray<i32>;
pub type PackedInt64Array = PackedArray<i64>;
pub type PackedFloat32Array = PackedArray<f32>;
pub type PackedFloat64Array = PackedArray<f64>;
pub type PackedStringArray = PackedArray<GString>;
pub type PackedVector2Array = PackedArray<Vector2>;
pub type PackedVector3Array = PackedArray<Vector3>;
pub type PackedColorArray = PackedArray<Color>;

// SAFETY: packed arrays are copy-on-write with atomic refcounts.
unsafe impl<E: PackedElement> Send for PackedArray<E> {}
unsafe impl<E: PackedElement> Sync for PackedArray<E> {}

impl<E: PackedElement> PackedArray<E> {
    #[must_use]
    pub fn new() -> Self {
        let ctor = host().default_constructor(E::ARRAY_TYPE);
        let mut opaque = [0u64; 2];
        unsafe { ctor(opaque.as_mut_ptr().cast(), std::ptr::null()) };
        Self {
            opaque,
            _element: PhantomData,
        }
    }

    pub fn sys(&self) -> crate::abi::ConstTypePtr {
        self.opaque.as_ptr().cast()
    }

    pub fn sys_mut(&mut self) -> TypePtr {
        self.opaque.as_mut_ptr().cast()
    }

    /// Copy of element `index`, `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<E> {
        // The indexer only reads through the pointer.
        let array = self.opaque.as_ptr().cast_mut().cast();
        let element = unsafe { E::element(&host().abi, array, index as GdInt) };
        if element.is_null() {
            return None;
        }
        Some(E::load(unsafe { &*element }))
    }

    /// Replace element `index`; `false` when out of range.
    pub fn set(&mut self, index: usize, value: E) -> bool {
        let element = unsafe { E::element(&host().abi, self.sys_mut(), index as GdInt) };
        if element.is_null() {
            return false;
        }
        value.store(unsafe { &mut *element });
        true
    }
}

impl<E: PackedElement> Default for PackedArray<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PackedElement> Clone for PackedArray<E> {
    fn clone(&self) -> Self {
        let ctor = host().copy_constructor(E::ARRAY_TYPE);
        let mut opaque = [0u64; 2];
        let args = [self.sys()];
        unsafe { ctor(opaque.as_mut_ptr().cast(), args.as_ptr()) };
        Self {
            opaque,
            _element: PhantomData,
        }
    }
}

impl<E: PackedElement> Drop for PackedArray<E> {
    fn drop(&mut self) {
        let dtor = crate::host::try_host().and_then(|host| host.destructor(E::ARRAY_TYPE));
        if let Some(dtor) = dtor {
            unsafe { dtor(self.sys_mut()) };
        }
    }
}

unsafe impl<E: PackedElement> Handle for PackedArray<E> {
    type Opaque = [u64; 2];

    fn opaque(&self) -> Self::Opaque {
        self.opaque
    }

    unsafe fn from_opaque(opaque: Self::Opaque) -> Self {
        Self {
            opaque,
            _element: PhantomData,
        }
    }
}

unsafe impl<E: PackedElement> Wire for PackedArray<E> {
    const WORDS: usize = 2;

    unsafe fn write_wire(&self, dst: *mut u64) {
        std::ptr::copy_nonoverlapping(self.opaque.as_ptr(), dst, 2);
    }
}

unsafe impl<E: PackedElement> FromWire for PackedArray<E> {
    unsafe fn read_wire(src: *const u64) -> Self {
        let mut opaque = [0u64; 2];
        std::ptr::copy_nonoverlapping(src, opaque.as_mut_ptr(), 2);
        Self::from_opaque(opaque)
    }

    unsafe fn init_slot(dst: *mut u64) {
        let ctor = host().default_constructor(E::ARRAY_TYPE);
        ctor(dst.cast(), std::ptr::null());
    }
}

unsafe impl<E: PackedElement> Builtin for PackedArray<E> {
    const VARIANT_TYPE: VariantType = E::ARRAY_TYPE;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_arrays_are_two_words() {
        assert_eq!(PackedByteArray::WORDS, 2);
        assert_eq!(PackedStringArray::WORDS, VariantType::PackedStringArray.words());
        assert_eq!(PackedColorArray::WORDS, VariantType::PackedColorArray.words());
    }

    #[test]
    fn opaque_storage_survives_transfer() {
        let array = unsafe { PackedInt64Array::from_opaque([0xAB, 3]) };
        assert_eq!(array.into_opaque(), [0xAB, 3]);
    }
}
