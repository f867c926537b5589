// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The loaded engine: resolved ABI table plus per-type constructor cache.
//!
//! Loaded exactly once per process by the entry point. Everything that talks
//! to the engine goes through [`host()`].

use std::ffi::CStr;
use std::sync::OnceLock;

use crate::abi::{
    AbiTable, ClassLibraryPtr, GetProcAddress, GodotVersion, PtrConstructor, PtrDestructor,
    TypeFromVariantConstructor, VariantFromTypeConstructor,
};
use crate::error::AbiError;
use crate::logging::fatal;
use crate::types::{VariantType, VARIANT_MAX};

/// Opaque class-database token handed to the entry point.
#[derive(Debug, Clone, Copy)]
struct LibraryToken(ClassLibraryPtr);

// SAFETY: the token is an opaque id the engine never lets us dereference.
unsafe impl Send for LibraryToken {}
unsafe impl Sync for LibraryToken {}

/// Engine version reported at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub label: String,
}

struct ConstructorCache {
    from_type: [Option<VariantFromTypeConstructor>; VARIANT_MAX],
    to_type: [Option<TypeFromVariantConstructor>; VARIANT_MAX],
    destructors: [Option<PtrDestructor>; VARIANT_MAX],
    defaults: [Option<PtrConstructor>; VARIANT_MAX],
    copies: [Option<PtrConstructor>; VARIANT_MAX],
}

impl ConstructorCache {
    unsafe fn resolve(abi: &AbiTable) -> Self {
        let mut cache = Self {
            from_type: [None; VARIANT_MAX],
            to_type: [None; VARIANT_MAX],
            destructors: [None; VARIANT_MAX],
            defaults: [None; VARIANT_MAX],
            copies: [None; VARIANT_MAX],
        };
        // NIL has no typed storage.
        for ty in 1..VARIANT_MAX {
            let raw = ty as u32;
            cache.from_type[ty] = (abi.get_variant_from_type_constructor)(raw);
            cache.to_type[ty] = (abi.get_variant_to_type_constructor)(raw);
            cache.destructors[ty] = (abi.variant_get_ptr_destructor)(raw);
            cache.defaults[ty] = (abi.variant_get_ptr_constructor)(raw, 0);
            cache.copies[ty] = (abi.variant_get_ptr_constructor)(raw, 1);
        }
        cache
    }
}

/// Resolved engine interface.
pub struct Host {
    pub abi: AbiTable,
    library: LibraryToken,
    version: EngineVersion,
    constructors: ConstructorCache,
}

static HOST: OnceLock<Host> = OnceLock::new();

/// Resolve the ABI table and make it available process-wide.
///
/// Loading twice returns the first host.
///
/// # Safety
///
/// `get_proc_address` must be the engine's resolver (or a faithful stand-in)
/// and `library` the token passed to the entry point.
pub unsafe fn load(
    get_proc_address: GetProcAddress,
    library: ClassLibraryPtr,
) -> Result<&'static Host, AbiError> {
    if let Some(host) = HOST.get() {
        log::debug!("[host] already loaded, keeping first table");
        return Ok(host);
    }

    let abi = AbiTable::load(get_proc_address)?;

    let mut raw_version = GodotVersion {
        major: 0,
        minor: 0,
        patch: 0,
        string: std::ptr::null(),
    };
    (abi.get_godot_version)(&mut raw_version);
    let label = if raw_version.string.is_null() {
        String::new()
    } else {
        CStr::from_ptr(raw_version.string).to_string_lossy().into_owned()
    };
    let version = EngineVersion {
        major: raw_version.major,
        minor: raw_version.minor,
        patch: raw_version.patch,
        label,
    };

    let constructors = ConstructorCache::resolve(&abi);
    let host = HOST.get_or_init(|| Host {
        abi,
        library: LibraryToken(library),
        version,
        constructors,
    });
    log::info!(
        "[host] resolved {} ABI symbols from {}",
        AbiTable::SYMBOLS.len(),
        host.version.label
    );
    Ok(host)
}

/// The loaded host, if any.
pub fn try_host() -> Option<&'static Host> {
    HOST.get()
}

/// The loaded host.
///
/// # Panics
///
/// Panics if called before the entry point resolved the ABI; no engine value
/// can exist at that point.
pub fn host() -> &'static Host {
    match HOST.get() {
        Some(host) => host,
        None => panic!("{}", AbiError::NotLoaded),
    }
}

impl Host {
    pub fn library(&self) -> ClassLibraryPtr {
        self.library.0
    }

    pub fn version(&self) -> &EngineVersion {
        &self.version
    }

    pub fn variant_from_type(&self, ty: VariantType) -> VariantFromTypeConstructor {
        match self.constructors.from_type[ty.index()] {
            Some(ctor) => ctor,
            None => fatal(&format!("engine has no variant constructor for {ty:?}")),
        }
    }

    pub fn variant_to_type(&self, ty: VariantType) -> TypeFromVariantConstructor {
        match self.constructors.to_type[ty.index()] {
            Some(ctor) => ctor,
            None => fatal(&format!("engine has no variant conversion to {ty:?}")),
        }
    }

    pub fn destructor(&self, ty: VariantType) -> Option<PtrDestructor> {
        self.constructors.destructors[ty.index()]
    }

    pub fn default_constructor(&self, ty: VariantType) -> PtrConstructor {
        match self.constructors.defaults[ty.index()] {
            Some(ctor) => ctor,
            None => fatal(&format!("engine has no default constructor for {ty:?}")),
        }
    }

    pub fn copy_constructor(&self, ty: VariantType) -> PtrConstructor {
        match self.constructors.copies[ty.index()] {
            Some(ctor) => ctor,
            None => fatal(&format!("engine has no copy constructor for {ty:?}")),
        }
    }

    /// Constructor `index` of builtin type `ty`, looked up on every call.
    pub fn ptr_constructor(&self, ty: VariantType, index: i32) -> Option<PtrConstructor> {
        unsafe { (self.abi.variant_get_ptr_constructor)(ty as u32, index) }
    }

    /// Filesystem path of the loaded extension library.
    pub fn library_path(&self) -> String {
        let mut path = crate::types::GString::new("");
        unsafe { (self.abi.get_library_path)(self.library(), path.sys_mut()) };
        path.to_string()
    }
}
