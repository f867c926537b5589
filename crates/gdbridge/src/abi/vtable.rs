// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-layout structures exchanged with the engine.
//!
//! These mirror `gdextension_interface.h` field for field; the engine reads
//! them directly, so ordering and widths must not change.

use std::ffi::{c_char, c_void};

use super::{
    ClassInstancePtr, ConstStringNamePtr, ConstTypePtr, ConstVariantPtr, GdBool, GdInt,
    RawObject, RawVariantType, StringNamePtr, StringPtr, TypePtr, VariantPtr,
};

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GodotVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub string: *const c_char,
}

/// Native call-error record (`GDExtensionCallError`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallError {
    pub error: u32,
    pub argument: i32,
    pub expected: i32,
}

/// Error kinds carried in [`CallError::error`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorKind {
    Ok = 0,
    InvalidMethod = 1,
    InvalidArgument = 2,
    TooManyArguments = 3,
    TooFewArguments = 4,
    InstanceIsNull = 5,
    MethodNotConst = 6,
}

impl CallErrorKind {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Ok,
            1 => Self::InvalidMethod,
            2 => Self::InvalidArgument,
            3 => Self::TooManyArguments,
            4 => Self::TooFewArguments,
            5 => Self::InstanceIsNull,
            _ => Self::MethodNotConst,
        }
    }
}

/// `GDExtensionPropertyInfo`. Name and class name point at StringName
/// storage, the hint string at String storage.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PropertyInfo {
    pub type_: RawVariantType,
    pub name: StringNamePtr,
    pub class_name: StringNamePtr,
    pub hint: u32,
    pub hint_string: StringPtr,
    pub usage: u32,
}

pub mod usage {
    pub const NONE: u32 = 0;
    pub const STORAGE: u32 = 1 << 1;
    pub const EDITOR: u32 = 1 << 2;
    pub const DEFAULT: u32 = STORAGE | EDITOR;
    pub const GROUP: u32 = 1 << 6;
    pub const SUBGROUP: u32 = 1 << 8;
    pub const SCRIPT_VARIABLE: u32 = 1 << 12;
    pub const NIL_IS_VARIANT: u32 = 1 << 17;
}

pub mod hint {
    pub const NONE: u32 = 0;
    pub const RANGE: u32 = 1;
    pub const ENUM: u32 = 2;
    pub const FILE: u32 = 13;
    pub const MULTILINE_TEXT: u32 = 18;
    pub const NODE_TYPE: u32 = 34;
    pub const RESOURCE_TYPE: u32 = 17;
}

pub mod method_flags {
    pub const NORMAL: u32 = 1;
    pub const EDITOR: u32 = 2;
    pub const CONST: u32 = 4;
    pub const VIRTUAL: u32 = 8;
    pub const VARARG: u32 = 16;
    pub const STATIC: u32 = 32;
    pub const DEFAULT: u32 = NORMAL;
}

/// `GDExtensionClassMethodArgumentMetadata`.
pub mod arg_metadata {
    pub const NONE: u32 = 0;
    pub const INT_IS_INT8: u32 = 1;
    pub const INT_IS_INT16: u32 = 2;
    pub const INT_IS_INT32: u32 = 3;
    pub const INT_IS_INT64: u32 = 4;
    pub const INT_IS_UINT8: u32 = 5;
    pub const INT_IS_UINT16: u32 = 6;
    pub const INT_IS_UINT32: u32 = 7;
    pub const REAL_IS_FLOAT: u32 = 9;
    pub const REAL_IS_DOUBLE: u32 = 10;
}

pub type ClassSet =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, ConstVariantPtr) -> GdBool;
pub type ClassGet = unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, VariantPtr) -> GdBool;
pub type ClassGetPropertyList =
    unsafe extern "C" fn(ClassInstancePtr, *mut u32) -> *const PropertyInfo;
pub type ClassFreePropertyList = unsafe extern "C" fn(ClassInstancePtr, *const PropertyInfo);
pub type ClassPropertyCanRevert = unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr) -> GdBool;
pub type ClassPropertyGetRevert =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, VariantPtr) -> GdBool;
pub type ClassValidateProperty = unsafe extern "C" fn(ClassInstancePtr, *mut PropertyInfo) -> GdBool;
pub type ClassNotification = unsafe extern "C" fn(ClassInstancePtr, i32, GdBool);
pub type ClassToString = unsafe extern "C" fn(ClassInstancePtr, *mut GdBool, StringPtr);
pub type ClassReference = unsafe extern "C" fn(ClassInstancePtr);
pub type ClassUnreference = unsafe extern "C" fn(ClassInstancePtr);
pub type ClassCreateInstance = unsafe extern "C" fn(*mut c_void) -> RawObject;
pub type ClassFreeInstance = unsafe extern "C" fn(*mut c_void, ClassInstancePtr);
pub type ClassRecreateInstance = unsafe extern "C" fn(*mut c_void, RawObject) -> ClassInstancePtr;
pub type ClassCallVirtual = unsafe extern "C" fn(ClassInstancePtr, *const ConstTypePtr, TypePtr);
pub type ClassGetVirtual = unsafe extern "C" fn(*mut c_void, ConstStringNamePtr) -> Option<ClassCallVirtual>;
pub type ClassGetVirtualCallData = unsafe extern "C" fn(*mut c_void, ConstStringNamePtr) -> *mut c_void;
pub type ClassCallVirtualWithData =
    unsafe extern "C" fn(ClassInstancePtr, ConstStringNamePtr, *mut c_void, *const ConstTypePtr, TypePtr);
pub type ClassGetRid = unsafe extern "C" fn(ClassInstancePtr) -> u64;

/// `GDExtensionClassCreationInfo2`: the per-class vtable the engine calls.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ClassCreationInfo {
    pub is_virtual: GdBool,
    pub is_abstract: GdBool,
    pub is_exposed: GdBool,
    pub set_func: Option<ClassSet>,
    pub get_func: Option<ClassGet>,
    pub get_property_list_func: Option<ClassGetPropertyList>,
    pub free_property_list_func: Option<ClassFreePropertyList>,
    pub property_can_revert_func: Option<ClassPropertyCanRevert>,
    pub property_get_revert_func: Option<ClassPropertyGetRevert>,
    pub validate_property_func: Option<ClassValidateProperty>,
    pub notification_func: Option<ClassNotification>,
    pub to_string_func: Option<ClassToString>,
    pub reference_func: Option<ClassReference>,
    pub unreference_func: Option<ClassUnreference>,
    pub create_instance_func: Option<ClassCreateInstance>,
    pub free_instance_func: Option<ClassFreeInstance>,
    pub recreate_instance_func: Option<ClassRecreateInstance>,
    pub get_virtual_func: Option<ClassGetVirtual>,
    pub get_virtual_call_data_func: Option<ClassGetVirtualCallData>,
    pub call_virtual_with_data_func: Option<ClassCallVirtualWithData>,
    pub get_rid_func: Option<ClassGetRid>,
    pub class_userdata: *mut c_void,
}

pub type ClassMethodCall = unsafe extern "C" fn(
    *mut c_void,
    ClassInstancePtr,
    *const ConstVariantPtr,
    GdInt,
    VariantPtr,
    *mut CallError,
);
pub type ClassMethodPtrCall =
    unsafe extern "C" fn(*mut c_void, ClassInstancePtr, *const ConstTypePtr, TypePtr);

/// `GDExtensionClassMethodInfo`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ClassMethodInfo {
    pub name: StringNamePtr,
    pub method_userdata: *mut c_void,
    pub call_func: Option<ClassMethodCall>,
    pub ptrcall_func: Option<ClassMethodPtrCall>,
    pub method_flags: u32,
    pub has_return_value: GdBool,
    pub return_value_info: *mut PropertyInfo,
    pub return_value_metadata: u32,
    pub argument_count: u32,
    pub arguments_info: *mut PropertyInfo,
    pub arguments_metadata: *mut u32,
    pub default_argument_count: u32,
    pub default_arguments: *mut VariantPtr,
}

/// `GDExtensionCallableCustomInfo`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CallableCustomInfo {
    pub callable_userdata: *mut c_void,
    pub token: *mut c_void,
    pub object_id: u64,
    pub call_func: Option<
        unsafe extern "C" fn(*mut c_void, *const ConstVariantPtr, GdInt, VariantPtr, *mut CallError),
    >,
    pub is_valid_func: Option<unsafe extern "C" fn(*mut c_void) -> GdBool>,
    pub free_func: Option<unsafe extern "C" fn(*mut c_void)>,
    pub hash_func: Option<unsafe extern "C" fn(*mut c_void) -> u32>,
    pub equal_func: Option<unsafe extern "C" fn(*mut c_void, *mut c_void) -> GdBool>,
    pub less_than_func: Option<unsafe extern "C" fn(*mut c_void, *mut c_void) -> GdBool>,
    pub to_string_func: Option<unsafe extern "C" fn(*mut c_void, *mut GdBool, StringPtr)>,
}

/// Engine initialization levels, in startup order.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InitLevel {
    Core = 0,
    Servers = 1,
    Scene = 2,
    Editor = 3,
}

impl InitLevel {
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Core),
            1 => Some(Self::Servers),
            2 => Some(Self::Scene),
            3 => Some(Self::Editor),
            _ => None,
        }
    }
}

/// `GDExtensionInitialization`, filled in by the entry point.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Initialization {
    pub minimum_initialization_level: u32,
    pub userdata: *mut c_void,
    pub initialize: Option<unsafe extern "C" fn(*mut c_void, u32)>,
    pub deinitialize: Option<unsafe extern "C" fn(*mut c_void, u32)>,
}
