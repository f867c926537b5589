// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plain-data vector and color types (single precision build).

use super::{Builtin, VariantType};
use crate::callframe::{FromWire, Wire};

macro_rules! plain_builtin {
    ($name:ident, $variant:expr) => {
        unsafe impl Wire for $name {
            const WORDS: usize = std::mem::size_of::<$name>().div_ceil(8);

            unsafe fn write_wire(&self, dst: *mut u64) {
                dst.cast::<$name>().write(*self);
            }
        }

        unsafe impl FromWire for $name {
            unsafe fn read_wire(src: *const u64) -> Self {
                src.cast::<$name>().read()
            }
        }

        unsafe impl Builtin for $name {
            const VARIANT_TYPE: VariantType = $variant;
        }
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector2i {
    pub x: i32,
    pub y: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector3i {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Vector2 {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Vector2i {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Vector3i {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

plain_builtin!(Vector2, VariantType::Vector2);
plain_builtin!(Vector2i, VariantType::Vector2i);
plain_builtin!(Vector3, VariantType::Vector3);
plain_builtin!(Vector3i, VariantType::Vector3i);
plain_builtin!(Color, VariantType::Color);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprints_match_variant_table() {
        assert_eq!(Vector2::WORDS, VariantType::Vector2.words());
        assert_eq!(Vector2i::WORDS, VariantType::Vector2i.words());
        assert_eq!(Vector3::WORDS, VariantType::Vector3.words());
        assert_eq!(Vector3i::WORDS, VariantType::Vector3i.words());
        assert_eq!(Color::WORDS, VariantType::Color.words());
    }
}
