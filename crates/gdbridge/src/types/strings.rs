// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String, StringName and NodePath handles.

use std::fmt;

use super::{opaque_handle, VariantType};
use crate::abi::GdInt;
use crate::host::host;
use crate::logging::fatal;

opaque_handle!(
    /// Engine `String`.
    GString,
    VariantType::String,
    1
);

opaque_handle!(
    /// Engine `StringName`: interned, compared by identity.
    StringName,
    VariantType::StringName,
    1
);

opaque_handle!(
    /// Engine `NodePath`.
    NodePath,
    VariantType::NodePath,
    1
);

// String constructor 2 takes a StringName, 3 a NodePath; NodePath constructor 2
// takes a String.
const STRING_FROM_STRING_NAME: i32 = 2;
const STRING_FROM_NODE_PATH: i32 = 3;
const NODE_PATH_FROM_STRING: i32 = 2;

fn convert(target: VariantType, index: i32, source: *const std::ffi::c_void) -> [u64; 1] {
    let Some(ctor) = host().ptr_constructor(target, index) else {
        fatal(&format!("engine has no {target:?} constructor #{index}"));
    };
    let mut opaque = [0u64; 1];
    let args = [source];
    unsafe { ctor(opaque.as_mut_ptr().cast(), args.as_ptr()) };
    opaque
}

impl GString {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut opaque = [0u64; 1];
        unsafe {
            (host().abi.string_new_with_utf8_chars_and_len)(
                opaque.as_mut_ptr().cast(),
                text.as_ptr().cast(),
                text.len() as GdInt,
            );
        }
        Self { opaque }
    }

    /// UTF-8 length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        let len = unsafe { (host().abi.string_to_utf8_chars)(self.sys(), std::ptr::null_mut(), 0) };
        usize::try_from(len).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.len();
        let mut buf = vec![0u8; len];
        if len > 0 {
            unsafe {
                (host().abi.string_to_utf8_chars)(self.sys(), buf.as_mut_ptr().cast(), len as GdInt);
            }
        }
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

impl fmt::Debug for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GString({:?})", self.to_string())
    }
}

impl From<&str> for GString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<&StringName> for GString {
    fn from(name: &StringName) -> Self {
        Self {
            opaque: convert(VariantType::String, STRING_FROM_STRING_NAME, name.sys()),
        }
    }
}

impl From<&NodePath> for GString {
    fn from(path: &NodePath) -> Self {
        Self {
            opaque: convert(VariantType::String, STRING_FROM_NODE_PATH, path.sys()),
        }
    }
}

impl StringName {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut opaque = [0u64; 1];
        unsafe {
            (host().abi.string_name_new_with_utf8_chars_and_len)(
                opaque.as_mut_ptr().cast(),
                text.as_ptr().cast(),
                text.len() as GdInt,
            );
        }
        Self { opaque }
    }
}

impl fmt::Display for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&GString::from(self), f)
    }
}

impl fmt::Debug for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{:?}", self.to_string())
    }
}

impl From<&str> for StringName {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl NodePath {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let text = GString::new(path);
        Self {
            opaque: convert(VariantType::NodePath, NODE_PATH_FROM_STRING, text.sys()),
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&GString::from(self), f)
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({:?})", self.to_string())
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
