// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide map from native object to its managed instance.
//!
//! Entries are created by the create-instance callback and removed by the
//! free-instance callback; callbacks may arrive from several engine threads,
//! so the map is sharded.

use std::any::Any;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::class::ExtensionClass;
use crate::instance::Instance;
use crate::logging::fatal;
use crate::types::ObjectPtr;

/// Type-erased instance stored in the registry.
pub trait AnyInstance: Any + Send + Sync {
    fn object(&self) -> ObjectPtr;
    fn class_name(&self) -> &str;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

static INSTANCES: LazyLock<DashMap<usize, Arc<dyn AnyInstance>>> = LazyLock::new(DashMap::new);

/// Register `instance` under its object. A second instance for the same
/// object is a contract violation.
pub(crate) fn insert(instance: Arc<dyn AnyInstance>) {
    let object = instance.object();
    match INSTANCES.entry(object.addr()) {
        dashmap::mapref::entry::Entry::Occupied(existing) => fatal(&format!(
            "object {:#x} already bridged to a `{}` instance",
            object.addr(),
            existing.get().class_name()
        )),
        dashmap::mapref::entry::Entry::Vacant(slot) => {
            slot.insert(instance);
        }
    }
}

/// Remove and return the instance bridged to `object`.
pub(crate) fn remove(object: ObjectPtr) -> Option<Arc<dyn AnyInstance>> {
    INSTANCES.remove(&object.addr()).map(|(_, instance)| instance)
}

/// The instance bridged to `object`, of any class.
#[must_use]
pub fn get(object: ObjectPtr) -> Option<Arc<dyn AnyInstance>> {
    INSTANCES.get(&object.addr()).map(|entry| Arc::clone(entry.value()))
}

/// The instance bridged to `object`, if it is a `T`.
#[must_use]
pub fn lookup<T: ExtensionClass>(object: ObjectPtr) -> Option<Arc<Instance<T>>> {
    downcast(get(object)?)
}

pub(crate) fn downcast<T: ExtensionClass>(instance: Arc<dyn AnyInstance>) -> Option<Arc<Instance<T>>> {
    instance.into_any().downcast::<Instance<T>>().ok()
}

/// Number of live bridged instances.
#[must_use]
pub fn len() -> usize {
    INSTANCES.len()
}

#[must_use]
pub fn is_empty() -> bool {
    INSTANCES.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker {
        object: ObjectPtr,
        class_name: &'static str,
    }

    impl AnyInstance for Marker {
        fn object(&self) -> ObjectPtr {
            self.object
        }

        fn class_name(&self) -> &str {
            self.class_name
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    // Addresses are never dereferenced; they only key the map.
    fn marker(addr: usize, class_name: &'static str) -> Arc<dyn AnyInstance> {
        Arc::new(Marker {
            object: ObjectPtr::from_raw(addr as *mut std::ffi::c_void),
            class_name,
        })
    }

    #[test]
    fn removing_one_object_keeps_its_neighbours() {
        let first = marker(0x7000_1000, "Alpha");
        let second = marker(0x7000_2000, "Beta");
        insert(Arc::clone(&first));
        insert(Arc::clone(&second));

        assert_eq!(get(first.object()).map(|i| i.class_name().to_string()).as_deref(), Some("Alpha"));
        assert_eq!(get(second.object()).map(|i| i.class_name().to_string()).as_deref(), Some("Beta"));

        let removed = remove(first.object()).expect("present");
        assert!(Arc::ptr_eq(&removed, &first));
        assert!(get(first.object()).is_none());
        assert!(remove(first.object()).is_none());

        let kept = get(second.object()).expect("untouched");
        assert!(Arc::ptr_eq(&kept, &second));
        remove(second.object());
    }

    #[test]
    fn entries_keep_their_concrete_type() {
        let entry = marker(0x7000_3000, "Gamma");
        insert(Arc::clone(&entry));
        assert!(entry.clone().into_any().downcast::<Marker>().is_ok());
        assert!(!is_empty());
        remove(entry.object());
        assert!(get(entry.object()).is_none());
    }

    #[test]
    #[should_panic(expected = "already bridged")]
    fn second_instance_for_one_object_is_fatal() {
        let addr = 0x7000_4000;
        insert(marker(addr, "Delta"));
        insert(marker(addr, "Delta"));
    }
}
