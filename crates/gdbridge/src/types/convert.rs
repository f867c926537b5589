// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversions between typed values and [`Variant`].

use super::{GString, Variant, VariantType};
use crate::abi::arg_metadata;
use crate::callframe::{FromWire, Wire};
use crate::host::host;

/// Largest typed storage a variant constructor reads or writes, in words.
const MAX_TYPED_WORDS: usize = 4;

/// A value with a native builtin type.
///
/// # Safety
///
/// The wire encoding of the implementor must be exactly the engine's typed
/// storage for `VARIANT_TYPE`.
pub unsafe trait Builtin: FromWire {
    const VARIANT_TYPE: VariantType;

    /// Width hint for method argument and return metadata.
    const METADATA: u32 = arg_metadata::NONE;

    /// Like [`FromWire::read_wire`], but `None` when the stored value does not
    /// fit the Rust type.
    ///
    /// # Safety
    ///
    /// Same contract as [`FromWire::read_wire`].
    unsafe fn read_checked(src: *const u64) -> Option<Self> {
        Some(Self::read_wire(src))
    }
}

pub trait ToVariant {
    fn to_variant(&self) -> Variant;
}

pub trait FromVariant: Sized {
    /// `None` when the variant holds a different type.
    fn from_variant(variant: &Variant) -> Option<Self>;
}

impl<T: Builtin> ToVariant for T {
    fn to_variant(&self) -> Variant {
        let ctor = host().variant_from_type(T::VARIANT_TYPE);
        let mut storage = [0u64; MAX_TYPED_WORDS];
        unsafe {
            self.write_wire(storage.as_mut_ptr());
            Variant::from_sys_init(|dst| ctor(dst, storage.as_mut_ptr().cast()))
        }
    }
}

impl<T: Builtin> FromVariant for T {
    fn from_variant(variant: &Variant) -> Option<Self> {
        let actual = variant.get_type();
        let nil_object = actual == VariantType::Nil && T::VARIANT_TYPE == VariantType::Object;
        if actual != T::VARIANT_TYPE && !nil_object {
            return None;
        }
        let mut storage = [0u64; MAX_TYPED_WORDS];
        if nil_object {
            // A nil variant reads as a null object.
            return Some(unsafe { T::read_wire(storage.as_ptr()) });
        }
        let ctor = host().variant_to_type(T::VARIANT_TYPE);
        unsafe {
            T::init_slot(storage.as_mut_ptr());
            ctor(storage.as_mut_ptr().cast(), variant.sys().cast_mut());
            T::read_checked(storage.as_ptr())
        }
    }
}

unsafe impl Wire for bool {
    const WORDS: usize = 1;

    unsafe fn write_wire(&self, dst: *mut u64) {
        dst.cast::<u8>().write(u8::from(*self));
    }
}

unsafe impl FromWire for bool {
    unsafe fn read_wire(src: *const u64) -> Self {
        src.cast::<u8>().read() != 0
    }
}

unsafe impl Builtin for bool {
    const VARIANT_TYPE: VariantType = VariantType::Bool;
}

// Every integer travels as int64 and every float as double.
macro_rules! widened_builtin {
    ($variant:expr, $wide:ty => $($ty:ty: $meta:ident => $narrow:expr),+ $(,)?) => {$(
        unsafe impl Wire for $ty {
            const WORDS: usize = 1;

            unsafe fn write_wire(&self, dst: *mut u64) {
                dst.cast::<$wide>().write(*self as $wide);
            }
        }

        unsafe impl FromWire for $ty {
            unsafe fn read_wire(src: *const u64) -> Self {
                src.cast::<$wide>().read() as $ty
            }
        }

        unsafe impl Builtin for $ty {
            const VARIANT_TYPE: VariantType = $variant;
            const METADATA: u32 = arg_metadata::$meta;

            unsafe fn read_checked(src: *const u64) -> Option<Self> {
                ($narrow)(src.cast::<$wide>().read())
            }
        }
    )+};
}

fn narrow_int<T: TryFrom<i64>>(value: i64) -> Option<T> {
    T::try_from(value).ok()
}

/// Finite doubles beyond the `f32` range do not fit.
fn narrow_f32(value: f64) -> Option<f32> {
    let narrow = value as f32;
    (narrow.is_finite() || !value.is_finite()).then_some(narrow)
}

widened_builtin!(
    VariantType::Int, i64 =>
    i8: INT_IS_INT8 => narrow_int,
    i16: INT_IS_INT16 => narrow_int,
    i32: INT_IS_INT32 => narrow_int,
    i64: INT_IS_INT64 => Some,
    u8: INT_IS_UINT8 => narrow_int,
    u16: INT_IS_UINT16 => narrow_int,
    u32: INT_IS_UINT32 => narrow_int,
);
widened_builtin!(
    VariantType::Float, f64 =>
    f32: REAL_IS_FLOAT => narrow_f32,
    f64: REAL_IS_DOUBLE => Some,
);

impl ToVariant for Variant {
    fn to_variant(&self) -> Variant {
        self.clone()
    }
}

impl FromVariant for Variant {
    fn from_variant(variant: &Variant) -> Option<Self> {
        Some(variant.clone())
    }
}

impl ToVariant for str {
    fn to_variant(&self) -> Variant {
        GString::new(self).to_variant()
    }
}

impl ToVariant for String {
    fn to_variant(&self) -> Variant {
        self.as_str().to_variant()
    }
}

impl FromVariant for String {
    fn from_variant(variant: &Variant) -> Option<Self> {
        GString::from_variant(variant).map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: FromWire>(value: &T) -> T {
        let mut words = [0u64; MAX_TYPED_WORDS];
        unsafe {
            value.write_wire(words.as_mut_ptr());
            T::read_wire(words.as_ptr())
        }
    }

    #[test]
    fn narrow_integers_widen_to_int64() {
        let mut words = [0u64; 1];
        unsafe { (-3i8).write_wire(words.as_mut_ptr()) };
        assert_eq!(words[0] as i64, -3);
        assert_eq!(round_trip(&u32::MAX), u32::MAX);
        assert_eq!(round_trip(&i16::MIN), i16::MIN);
    }

    #[test]
    fn floats_widen_to_double() {
        let mut words = [0u64; 1];
        unsafe { 0.5f32.write_wire(words.as_mut_ptr()) };
        assert_eq!(f64::from_bits(words[0]), 0.5);
        assert_eq!(round_trip(&1.25f32), 1.25);
    }

    #[test]
    fn checked_reads_reject_values_that_do_not_fit() {
        let wide = [300i64 as u64];
        unsafe {
            assert_eq!(u8::read_checked(wide.as_ptr()), None);
            assert_eq!(u16::read_checked(wide.as_ptr()), Some(300));
            assert_eq!(i64::read_checked(wide.as_ptr()), Some(300));
        }
        let negative = [(-1i64) as u64];
        unsafe { assert_eq!(u32::read_checked(negative.as_ptr()), None) };
        let huge = [((1i64 << 40) | 5) as u64];
        unsafe { assert_eq!(i32::read_checked(huge.as_ptr()), None) };

        let big = [1e300f64.to_bits()];
        let infinite = [f64::INFINITY.to_bits()];
        unsafe {
            assert_eq!(f32::read_checked(big.as_ptr()), None);
            assert_eq!(f32::read_checked(infinite.as_ptr()), Some(f32::INFINITY));
            assert_eq!(f64::read_checked(big.as_ptr()), Some(1e300));
        }
    }

    #[test]
    fn bool_is_single_byte() {
        let mut words = [0u64; 1];
        unsafe { true.write_wire(words.as_mut_ptr()) };
        assert_eq!(words[0].to_le_bytes()[0], 1);
        assert!(round_trip(&true));
        assert!(!round_trip(&false));
    }
}
