// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw GDExtension ABI surface.
//!
//! The engine hands the extension a single `get_proc_address` resolver. Every
//! function the bridge needs is looked up once, by its stable symbol name, and
//! stored in [`AbiTable`]. A missing symbol makes the whole table unavailable
//! instead of failing individual calls later.
//!
//! Nothing in this module holds state or interprets values; it only describes
//! the native calling convention.

use std::ffi::{c_char, c_void};

use crate::error::AbiError;

mod vtable;

pub use vtable::*;

/// Native boolean (`GDExtensionBool`).
pub type GdBool = u8;
/// Native integer (`GDExtensionInt`).
pub type GdInt = i64;
/// Raw variant type tag.
pub type RawVariantType = u32;

pub type VariantPtr = *mut c_void;
pub type ConstVariantPtr = *const c_void;
pub type StringNamePtr = *mut c_void;
pub type ConstStringNamePtr = *const c_void;
pub type StringPtr = *mut c_void;
pub type ConstStringPtr = *const c_void;
pub type TypePtr = *mut c_void;
pub type ConstTypePtr = *const c_void;
pub type RawObject = *mut c_void;
pub type ConstRawObject = *const c_void;
pub type MethodBindPtr = *const c_void;
pub type ClassInstancePtr = *mut c_void;
pub type ClassLibraryPtr = *mut c_void;

pub const TRUE: GdBool = 1;
pub const FALSE: GdBool = 0;

/// Untyped function pointer returned by the resolver.
pub type InterfaceFunctionPtr = Option<unsafe extern "C" fn()>;
/// Symbol resolver handed to the entry point.
pub type GetProcAddress = unsafe extern "C" fn(name: *const c_char) -> InterfaceFunctionPtr;

pub type PtrConstructor = unsafe extern "C" fn(base: TypePtr, args: *const ConstTypePtr);
pub type PtrDestructor = unsafe extern "C" fn(base: TypePtr);
pub type VariantFromTypeConstructor = unsafe extern "C" fn(dst: VariantPtr, src: TypePtr);
pub type TypeFromVariantConstructor = unsafe extern "C" fn(dst: TypePtr, src: VariantPtr);

macro_rules! abi_table {
    ($(
        $(#[$meta:meta])*
        $name:ident: fn($($arg:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// Function table resolved from the engine at load time.
        ///
        /// Field names are the engine's symbol names.
        #[derive(Clone, Copy)]
        pub struct AbiTable {
            $(
                $(#[$meta])*
                pub $name: unsafe extern "C" fn($($arg),*) $(-> $ret)?,
            )*
        }

        impl AbiTable {
            /// Every symbol the bridge resolves, in table order.
            pub const SYMBOLS: &'static [&'static str] = &[$(stringify!($name)),*];

            /// Resolves every entry through `get_proc_address`.
            ///
            /// # Safety
            ///
            /// `get_proc_address` must return function pointers whose real
            /// signatures match the declared ones.
            pub unsafe fn load(get_proc_address: GetProcAddress) -> Result<Self, AbiError> {
                Ok(Self {
                    $(
                        $name: {
                            let symbol = concat!(stringify!($name), "\0");
                            match get_proc_address(symbol.as_ptr().cast()) {
                                Some(raw) => std::mem::transmute::<
                                    unsafe extern "C" fn(),
                                    unsafe extern "C" fn($($arg),*) $(-> $ret)?,
                                >(raw),
                                None => return Err(AbiError::MissingSymbol(stringify!($name))),
                            }
                        },
                    )*
                })
            }
        }
    };
}

abi_table! {
    // Core
    get_godot_version: fn(*mut GodotVersion);
    get_library_path: fn(ClassLibraryPtr, StringPtr);
    print_error: fn(*const c_char, *const c_char, *const c_char, i32, GdBool);
    print_error_with_message: fn(*const c_char, *const c_char, *const c_char, *const c_char, i32, GdBool);
    print_warning: fn(*const c_char, *const c_char, *const c_char, i32, GdBool);
    print_warning_with_message: fn(*const c_char, *const c_char, *const c_char, *const c_char, i32, GdBool);

    // Variant
    variant_new_copy: fn(VariantPtr, ConstVariantPtr);
    variant_new_nil: fn(VariantPtr);
    variant_destroy: fn(VariantPtr);
    variant_call: fn(VariantPtr, ConstStringNamePtr, *const ConstVariantPtr, GdInt, VariantPtr, *mut CallError);
    variant_get_named: fn(ConstVariantPtr, ConstStringNamePtr, VariantPtr, *mut GdBool);
    variant_set_named: fn(VariantPtr, ConstStringNamePtr, ConstVariantPtr, *mut GdBool);
    variant_get_type: fn(ConstVariantPtr) -> RawVariantType;
    variant_booleanize: fn(ConstVariantPtr) -> GdBool;
    variant_stringify: fn(ConstVariantPtr, StringPtr);
    variant_hash: fn(ConstVariantPtr) -> GdInt;
    variant_get_type_name: fn(RawVariantType, StringPtr);
    get_variant_from_type_constructor: fn(RawVariantType) -> Option<VariantFromTypeConstructor>;
    get_variant_to_type_constructor: fn(RawVariantType) -> Option<TypeFromVariantConstructor>;
    variant_get_ptr_constructor: fn(RawVariantType, i32) -> Option<PtrConstructor>;
    variant_get_ptr_destructor: fn(RawVariantType) -> Option<PtrDestructor>;

    // String / StringName
    string_new_with_utf8_chars_and_len: fn(StringPtr, *const c_char, GdInt);
    string_to_utf8_chars: fn(ConstStringPtr, *mut c_char, GdInt) -> GdInt;
    string_name_new_with_utf8_chars_and_len: fn(StringNamePtr, *const c_char, GdInt);

    // Array / Dictionary / packed arrays
    array_operator_index: fn(TypePtr, GdInt) -> VariantPtr;
    array_operator_index_const: fn(ConstTypePtr, GdInt) -> VariantPtr;
    dictionary_operator_index: fn(TypePtr, ConstVariantPtr) -> VariantPtr;
    dictionary_operator_index_const: fn(ConstTypePtr, ConstVariantPtr) -> VariantPtr;
    packed_byte_array_operator_index: fn(TypePtr, GdInt) -> *mut u8;
    packed_int32_array_operator_index: fn(TypePtr, GdInt) -> *mut i32;
    packed_int64_array_operator_index: fn(TypePtr, GdInt) -> *mut i64;
    packed_float32_array_operator_index: fn(TypePtr, GdInt) -> *mut f32;
    packed_float64_array_operator_index: fn(TypePtr, GdInt) -> *mut f64;
    packed_string_array_operator_index: fn(TypePtr, GdInt) -> StringPtr;
    packed_vector2_array_operator_index: fn(TypePtr, GdInt) -> TypePtr;
    packed_vector3_array_operator_index: fn(TypePtr, GdInt) -> TypePtr;
    packed_color_array_operator_index: fn(TypePtr, GdInt) -> TypePtr;

    // Object
    object_method_bind_call: fn(MethodBindPtr, RawObject, *const ConstVariantPtr, GdInt, VariantPtr, *mut CallError);
    object_method_bind_ptrcall: fn(MethodBindPtr, RawObject, *const ConstTypePtr, TypePtr);
    object_destroy: fn(RawObject);
    global_get_singleton: fn(ConstStringNamePtr) -> RawObject;
    object_set_instance: fn(RawObject, ConstStringNamePtr, ClassInstancePtr);
    object_get_class_name: fn(ConstRawObject, ClassLibraryPtr, StringNamePtr) -> GdBool;
    object_cast_to: fn(ConstRawObject, *mut c_void) -> RawObject;
    object_get_instance_from_id: fn(u64) -> RawObject;
    object_get_instance_id: fn(ConstRawObject) -> u64;
    ref_get_object: fn(ConstTypePtr) -> RawObject;
    ref_set_object: fn(TypePtr, RawObject);

    // Callable
    callable_custom_create: fn(TypePtr, *mut CallableCustomInfo);

    // ClassDB
    classdb_construct_object: fn(ConstStringNamePtr) -> RawObject;
    classdb_get_method_bind: fn(ConstStringNamePtr, ConstStringNamePtr, GdInt) -> MethodBindPtr;
    classdb_get_class_tag: fn(ConstStringNamePtr) -> *mut c_void;
    classdb_register_extension_class2: fn(ClassLibraryPtr, ConstStringNamePtr, ConstStringNamePtr, *const ClassCreationInfo);
    classdb_register_extension_class_method: fn(ClassLibraryPtr, ConstStringNamePtr, *const ClassMethodInfo);
    classdb_register_extension_class_integer_constant: fn(ClassLibraryPtr, ConstStringNamePtr, ConstStringNamePtr, ConstStringNamePtr, GdInt, GdBool);
    classdb_register_extension_class_property: fn(ClassLibraryPtr, ConstStringNamePtr, *const PropertyInfo, ConstStringNamePtr, ConstStringNamePtr);
    classdb_register_extension_class_property_group: fn(ClassLibraryPtr, ConstStringNamePtr, ConstStringPtr, ConstStringPtr);
    classdb_register_extension_class_property_subgroup: fn(ClassLibraryPtr, ConstStringNamePtr, ConstStringPtr, ConstStringPtr);
    classdb_register_extension_class_signal: fn(ClassLibraryPtr, ConstStringNamePtr, ConstStringNamePtr, *const PropertyInfo, GdInt);
    classdb_unregister_extension_class: fn(ClassLibraryPtr, ConstStringNamePtr);

    // Editor
    editor_add_plugin: fn(ConstStringNamePtr);
    editor_remove_plugin: fn(ConstStringNamePtr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_names_are_unique() {
        let mut names = AbiTable::SYMBOLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), AbiTable::SYMBOLS.len());
    }

    #[test]
    fn missing_symbol_is_reported_by_name() {
        unsafe extern "C" fn nothing(_name: *const c_char) -> InterfaceFunctionPtr {
            None
        }

        let err = unsafe { AbiTable::load(nothing) }
            .err()
            .expect("empty resolver must fail");
        assert!(matches!(err, AbiError::MissingSymbol("get_godot_version")));
    }
}
