// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Library entry point and initialization levels.
//!
//! The engine calls the exported entry symbol once, with its symbol resolver,
//! the class-library token and an [`Initialization`] record to fill in. After
//! that it drives the library level by level: `initialize` on the way up,
//! `deinitialize` in reverse on the way down.
//!
//! ```ignore
//! struct Game;
//!
//! impl Extension for Game {
//!     fn register(classes: &mut ClassList) {
//!         classes.add::<Player>().add::<Hud>();
//!     }
//! }
//!
//! gdbridge::gdbridge_entry!(game_library_init, Game);
//! ```

use std::ffi::c_void;

use crate::abi::{ClassLibraryPtr, GdBool, GetProcAddress, Initialization, FALSE, TRUE};
use crate::class::ExtensionClass;
use crate::error::Result;
use crate::logging::fatal;
use crate::{host, logging, ownership, registrar};

pub use crate::abi::InitLevel;

/// A library of extension classes.
pub trait Extension: 'static {
    /// Declare the classes to register. Each lands at the level its base
    /// requires ([`registrar::level_of`]).
    fn register(classes: &mut ClassList);

    /// Lowest level the library wants callbacks for.
    fn min_level() -> InitLevel {
        InitLevel::Scene
    }

    /// Runs after the level's classes are registered.
    fn on_level_init(_level: InitLevel) {}

    /// Runs before the level's classes are unregistered.
    fn on_level_deinit(_level: InitLevel) {}
}

struct ClassEntry {
    name: String,
    level: InitLevel,
    register: fn() -> Result<()>,
}

fn register_erased<T: ExtensionClass>() -> Result<()> {
    registrar::register::<T>().map(|_| ())
}

/// Classes declared by an [`Extension`], in declaration order.
#[derive(Default)]
pub struct ClassList {
    entries: Vec<ClassEntry>,
}

impl ClassList {
    pub fn add<T: ExtensionClass>(&mut self) -> &mut Self {
        self.entries.push(ClassEntry {
            name: T::class_name(),
            level: registrar::level_of::<T>(),
            register: register_erased::<T>,
        });
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Class names with the level each registers at.
    #[must_use]
    pub fn levels(&self) -> Vec<(String, InitLevel)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.level))
            .collect()
    }
}

/// Body of the exported entry symbol. Use [`gdbridge_entry!`](crate::gdbridge_entry)
/// rather than calling this directly.
///
/// Returns `FALSE` when the resolver is missing or does not serve every
/// symbol; the engine then refuses the library.
///
/// # Safety
///
/// The arguments must be the ones the engine passed to the entry symbol.
pub unsafe fn load<E: Extension>(
    get_proc_address: Option<GetProcAddress>,
    library: ClassLibraryPtr,
    init: *mut Initialization,
) -> GdBool {
    let _ = logging::init_from_env();
    let Some(get_proc_address) = get_proc_address else {
        log::error!("[entry] engine passed no symbol resolver");
        return FALSE;
    };
    if init.is_null() {
        log::error!("[entry] engine passed no initialization record");
        return FALSE;
    }
    match host::load(get_proc_address, library) {
        Ok(host) => log::info!("[entry] loaded into {}", host.version().label),
        Err(err) => {
            log::error!("[entry] cannot load: {err}");
            return FALSE;
        }
    }
    *init = Initialization {
        minimum_initialization_level: E::min_level() as u32,
        userdata: std::ptr::null_mut(),
        initialize: Some(initialize::<E>),
        deinitialize: Some(deinitialize::<E>),
    };
    TRUE
}

unsafe extern "C" fn initialize<E: Extension>(_userdata: *mut c_void, level: u32) {
    if let Some(level) = InitLevel::from_raw(level) {
        initialize_level::<E>(level);
    }
}

unsafe extern "C" fn deinitialize<E: Extension>(_userdata: *mut c_void, level: u32) {
    if let Some(level) = InitLevel::from_raw(level) {
        deinitialize_level::<E>(level);
    }
}

/// Register the classes of `E` that belong to `level`.
///
/// Classes whose level lies below [`Extension::min_level`] register at the
/// minimum level instead. A registration error is fatal.
pub fn initialize_level<E: Extension>(level: InitLevel) {
    if level < E::min_level() {
        return;
    }
    let mut classes = ClassList::default();
    E::register(&mut classes);
    for entry in &classes.entries {
        if entry.level.max(E::min_level()) != level {
            continue;
        }
        if let Err(err) = (entry.register)() {
            fatal(&format!("cannot register `{}`: {err}", entry.name));
        }
    }
    E::on_level_init(level);
    log::debug!("[entry] initialized level {level:?}");
}

/// Unregister the classes of `level`, newest first. Leaving the lowest level
/// also unregisters stragglers and flushes reference tracking.
pub fn deinitialize_level<E: Extension>(level: InitLevel) {
    if level < E::min_level() {
        return;
    }
    E::on_level_deinit(level);
    registrar::unregister_level(level);
    if level == E::min_level() {
        registrar::unregister_all();
        ownership::flush();
    }
    log::debug!("[entry] deinitialized level {level:?}");
}

/// Export the library entry symbol `$symbol` for extension type `$extension`.
///
/// `$symbol` must match `entry_symbol` in the `.gdextension` file.
#[macro_export]
macro_rules! gdbridge_entry {
    ($symbol:ident, $extension:ty) => {
        /// Engine entry point.
        ///
        /// # Safety
        ///
        /// Called by the engine only.
        #[no_mangle]
        pub unsafe extern "C" fn $symbol(
            get_proc_address: ::core::option::Option<$crate::abi::GetProcAddress>,
            library: $crate::abi::ClassLibraryPtr,
            init: *mut $crate::abi::Initialization,
        ) -> $crate::abi::GdBool {
            $crate::entry::load::<$extension>(get_proc_address, library, init)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{EditorPlugin, Node};

    struct Walker;

    impl ExtensionClass for Walker {
        type Base = Node;

        fn create() -> Self {
            Walker
        }
    }

    struct Toolbox;

    impl ExtensionClass for Toolbox {
        type Base = EditorPlugin;

        fn create() -> Self {
            Toolbox
        }
    }

    struct Library;

    impl Extension for Library {
        fn register(classes: &mut ClassList) {
            classes.add::<Walker>().add::<Toolbox>();
        }
    }

    #[test]
    fn class_list_records_levels() {
        let mut classes = ClassList::default();
        Library::register(&mut classes);
        assert_eq!(classes.len(), 2);
        assert_eq!(
            classes.levels(),
            vec![
                ("Walker".to_string(), InitLevel::Scene),
                ("Toolbox".to_string(), InitLevel::Editor),
            ]
        );
    }

    #[test]
    fn load_rejects_missing_resolver() {
        let mut init = Initialization {
            minimum_initialization_level: 0,
            userdata: std::ptr::null_mut(),
            initialize: None,
            deinitialize: None,
        };
        let loaded = unsafe { load::<Library>(None, std::ptr::null_mut(), &mut init) };
        assert_eq!(loaded, FALSE);
        assert!(init.initialize.is_none());
    }
}
