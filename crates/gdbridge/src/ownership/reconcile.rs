// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame-driven reconciliation of managed object references.
//!
//! The engine can free an object without telling the Rust side. Every
//! [`ObjectRef`] is tracked by instance id; at most once per observed frame
//! increment the pass:
//!
//! 1. invalidates references whose object no longer resolves,
//! 2. drops tracking entries nobody holds anymore, releasing the native
//!    reference taken for reference-counted objects.
//!
//! The pass is triggered lazily from the next bridge callback, never by a
//! timer.

use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicPtr, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::config::config;
use crate::engine;
use crate::types::{InstanceId, ObjectPtr};

/// Shared state behind every [`ObjectRef`] to one object.
struct TrackedObject {
    id: InstanceId,
    ptr: AtomicPtr<c_void>,
    /// A native reference was taken on behalf of the managed holders.
    holds_ref: AtomicBool,
}

impl TrackedObject {
    fn object(&self) -> Option<ObjectPtr> {
        ObjectPtr::from_raw(self.ptr.load(Ordering::Acquire)).non_null()
    }

    fn invalidate(&self) {
        self.ptr.store(std::ptr::null_mut(), Ordering::Release);
        self.holds_ref.store(false, Ordering::Release);
    }

    /// Give back the native reference, destroying the object on the last one.
    fn release(&self) {
        if !self.holds_ref.swap(false, Ordering::AcqRel) {
            return;
        }
        // Only touch objects the engine still knows.
        let Some(object) = ObjectPtr::from_instance_id(self.id) else {
            return;
        };
        if engine::unreference(object) {
            log::debug!("[reconcile] last reference to {:?} released, destroying", self.id);
            self.ptr.store(std::ptr::null_mut(), Ordering::Release);
            unsafe { object.destroy() };
        }
    }
}

/// Managed-side reference to an engine object.
///
/// Cloning shares the tracking entry. A reference becomes null once the
/// reconciliation pass notices the object is gone.
#[derive(Clone, Default)]
pub struct ObjectRef {
    tracked: Option<Arc<TrackedObject>>,
}

impl ObjectRef {
    #[must_use]
    pub const fn null() -> Self {
        Self { tracked: None }
    }

    /// Track `object` in the process-wide reconciler.
    #[must_use]
    pub fn new(object: ObjectPtr) -> Self {
        reconciler().track(object, false)
    }

    /// Track `object` and hold a native reference when it is reference
    /// counted. Used for object-typed property assignments.
    #[must_use]
    pub fn retained(object: ObjectPtr) -> Self {
        reconciler().track(object, true)
    }

    /// The object, while it is alive.
    #[must_use]
    pub fn get(&self) -> Option<ObjectPtr> {
        self.tracked.as_ref()?.object()
    }

    /// Pointer value without liveness information; null when invalidated.
    #[must_use]
    pub fn as_ptr(&self) -> ObjectPtr {
        self.get().unwrap_or_default()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.get().is_some()
    }

    #[must_use]
    pub fn instance_id(&self) -> Option<InstanceId> {
        self.tracked.as_ref().map(|tracked| tracked.id)
    }

    /// `true` while a native reference is held for this object.
    #[must_use]
    pub fn holds_reference(&self) -> bool {
        self.tracked
            .as_ref()
            .is_some_and(|tracked| tracked.holds_ref.load(Ordering::Acquire))
    }

    /// Release the held native reference if this is the last managed holder.
    /// Shared references are left to the reconciliation pass.
    pub fn release_reference(&self) {
        let Some(tracked) = &self.tracked else {
            return;
        };
        // One count belongs to the reconciler's table.
        if Arc::strong_count(tracked) <= 2 {
            tracked.release();
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.instance_id() == other.instance_id()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tracked {
            Some(tracked) => write!(f, "ObjectRef({:?}, valid={})", tracked.id, self.is_valid()),
            None => f.write_str("ObjectRef(null)"),
        }
    }
}

/// Tracking table plus the last frame a pass ran on.
pub struct Reconciler {
    last_frame: AtomicI64,
    tracked: DashMap<u64, Arc<TrackedObject>>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_frame: AtomicI64::new(-1),
            tracked: DashMap::new(),
        }
    }

    /// Start tracking `object`; repeated calls for one object share the entry.
    pub fn track(&self, object: ObjectPtr, retain: bool) -> ObjectRef {
        if object.is_null() {
            return ObjectRef::null();
        }
        let id = object.instance_id();
        let tracked = self
            .tracked
            .entry(id.0)
            .or_insert_with(|| {
                Arc::new(TrackedObject {
                    id,
                    ptr: AtomicPtr::new(object.as_raw()),
                    holds_ref: AtomicBool::new(false),
                })
            })
            .clone();
        if retain
            && object.is_class("RefCounted")
            && !tracked.holds_ref.swap(true, Ordering::AcqRel)
        {
            engine::reference(object);
        }
        ObjectRef {
            tracked: Some(tracked),
        }
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Last frame a pass ran on (-1 before the first).
    #[must_use]
    pub fn last_frame(&self) -> i64 {
        self.last_frame.load(Ordering::Acquire)
    }

    /// Run the pass if `frame` is newer than the last one seen.
    pub fn on_frame(&self, frame: i64) -> bool {
        let last = self.last_frame.load(Ordering::Acquire);
        if frame <= last {
            return false;
        }
        // Losing the race means another thread runs this frame's pass.
        if self
            .last_frame
            .compare_exchange(last, frame, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.pass();
        true
    }

    /// One reconciliation pass, regardless of frame.
    pub fn pass(&self) {
        let mut dead = Vec::new();
        let mut orphaned = Vec::new();
        for entry in &self.tracked {
            let tracked = entry.value();
            if tracked.object().is_some() && ObjectPtr::from_instance_id(tracked.id).is_none() {
                dead.push(*entry.key());
            } else if Arc::strong_count(tracked) == 1 {
                orphaned.push(*entry.key());
            }
        }

        // Engine calls happen outside the shard locks.
        for id in &dead {
            if let Some((_, tracked)) = self.tracked.remove(id) {
                tracked.invalidate();
            }
        }
        for id in &orphaned {
            if let Some((_, tracked)) = self.tracked.remove_if(id, |_, t| Arc::strong_count(t) == 1) {
                tracked.release();
            }
        }
        if !dead.is_empty() || !orphaned.is_empty() {
            log::debug!(
                "[reconcile] invalidated {} reference(s), dropped {} untracked object(s)",
                dead.len(),
                orphaned.len()
            );
        }
    }

    /// Release every held reference and forget all entries (extension unload).
    pub fn flush(&self) {
        let all: Vec<Arc<TrackedObject>> = self.tracked.iter().map(|e| Arc::clone(e.value())).collect();
        self.tracked.clear();
        for tracked in all {
            tracked.release();
        }
    }
}

static RECONCILER: LazyLock<Reconciler> = LazyLock::new(Reconciler::new);

/// The process-wide reconciler.
pub fn reconciler() -> &'static Reconciler {
    &RECONCILER
}

/// Entry hook of every engine callback: runs the pass when the engine's
/// frame counter moved since the last one.
pub fn reconcile_if_due() {
    if !config().reconcile || crate::host::try_host().is_none() {
        return;
    }
    if let Some(frame) = engine::frames_drawn() {
        reconciler().on_frame(frame);
    }
}

/// Release everything the process-wide reconciler holds.
pub fn flush() {
    reconciler().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reference_is_inert() {
        let null = ObjectRef::null();
        assert!(!null.is_valid());
        assert!(null.get().is_none());
        assert!(null.instance_id().is_none());
        null.release_reference();
        assert_eq!(ObjectRef::default(), null);
    }

    #[test]
    fn pass_runs_once_per_frame_increase() {
        let reconciler = Reconciler::new();
        assert!(reconciler.on_frame(0));
        assert!(!reconciler.on_frame(0));
        assert!(reconciler.on_frame(3));
        assert!(!reconciler.on_frame(2));
        assert_eq!(reconciler.last_frame(), 3);
    }
}
