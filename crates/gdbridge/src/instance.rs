// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instance Bridge: one managed value paired with one native object.
//!
//! The engine talks to an instance only through the callbacks below
//! (set/get, property list, revert, notification, to-string, reference).
//! Every callback first gives the reconciliation pass a chance to run, then
//! borrows the managed value. The value sits behind a re-entrant lock so an
//! engine call made from inside a method can call back into the same
//! instance; a nested mutable borrow is refused with a warning instead of
//! deadlocking.

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex};

use crate::abi::{
    ClassInstancePtr, ConstStringNamePtr, ConstVariantPtr, GdBool, PropertyInfo, StringPtr,
    VariantPtr, FALSE, TRUE,
};
use crate::class::ExtensionClass;
use crate::config::config;
use crate::engine::{self, InternalMode, NOTIFICATION_READY};
use crate::logging::{fatal, report_error, report_warning};
use crate::ownership::{reconcile_if_due, Borrowed, ObjectRef};
use crate::property::{InfoList, ResolvedNode};
use crate::registrar::ClassDescriptor;
use crate::registry::{self, AnyInstance};
use crate::signal::SignalWorker;
use crate::types::{GString, InstanceId, NodePath, ObjectPtr, StringName, Variant};

/// A child node bound during scene assembly.
#[derive(Clone, Default)]
pub struct Child {
    object: ObjectRef,
    bridged: Option<Weak<dyn AnyInstance>>,
}

impl Child {
    /// The node, while it is alive.
    #[must_use]
    pub fn object(&self) -> Option<ObjectPtr> {
        self.object.get()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.object.is_valid()
    }

    /// The managed instance behind the node, if it is a bridged `E`.
    #[must_use]
    pub fn instance<E: ExtensionClass>(&self) -> Option<Arc<Instance<E>>> {
        if let Some(bridged) = self.bridged.as_ref().and_then(Weak::upgrade) {
            return registry::downcast(bridged);
        }
        registry::lookup(self.object()?)
    }

    pub(crate) fn bind(&mut self, object: ObjectPtr, bridged: Option<Weak<dyn AnyInstance>>) {
        self.object = ObjectRef::new(object);
        self.bridged = bridged;
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Child")
            .field("object", &self.object)
            .field("bridged", &self.bridged.is_some())
            .finish()
    }
}

/// A live managed instance of extension class `T`.
pub struct Instance<T: ExtensionClass> {
    object: ObjectPtr,
    id: InstanceId,
    class: Arc<ClassDescriptor<T>>,
    value: ReentrantMutex<RefCell<T>>,
    worker: Mutex<Option<SignalWorker>>,
    is_editor: bool,
}

impl<T: ExtensionClass> Instance<T> {
    /// Pair `value` with `object`, connect its signals and publish it in the
    /// registry and on the native object.
    pub(crate) fn attach(class: Arc<ClassDescriptor<T>>, object: ObjectPtr, value: T) -> Arc<Self> {
        let id = object.instance_id();
        let instance = Arc::new(Self {
            object,
            id,
            class,
            value: ReentrantMutex::new(RefCell::new(value)),
            worker: Mutex::new(None),
            is_editor: engine::is_editor_hint(),
        });
        instance.connect_signals();

        registry::insert(Arc::clone(&instance) as Arc<dyn AnyInstance>);
        unsafe {
            (crate::host::host().abi.object_set_instance)(
                object.as_raw(),
                instance.class.class_name().sys(),
                Arc::as_ptr(&instance).cast_mut().cast(),
            );
        }

        if let Some(on_create) = instance.class.hooks.on_create {
            instance.with_mut(|value| on_create(value, object));
        }
        log::debug!("[instance] {} attached to {id:?}", instance.class.name());
        instance
    }

    fn connect_signals(&self) {
        let signals = &self.class.fields.signals;
        if signals.is_empty() {
            return;
        }
        let worker = match SignalWorker::spawn(self.id, config().signal_queue) {
            Ok(worker) => worker,
            Err(e) => {
                report_error(&format!("{}: cannot start signal worker: {e}", self.class.name()));
                return;
            }
        };
        self.with_mut(|value| {
            for signal in signals {
                (signal.access)(value).connect(worker.sender(&signal.descriptor.name));
            }
        });
        *self.worker.lock() = Some(worker);
    }

    /// Disconnect every signal and close the worker's queue.
    fn close_signals(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        self.with_mut(|value| {
            for signal in &self.class.fields.signals {
                (signal.access)(value).disconnect();
            }
        });
        // Detached: the worker drains what is queued and skips the freed object.
        drop(worker.close());
    }

    #[must_use]
    pub fn object(&self) -> ObjectPtr {
        self.object
    }

    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    #[must_use]
    pub fn class(&self) -> &ClassDescriptor<T> {
        &self.class
    }

    /// Shared access to the managed value; `None` while it is mutably
    /// borrowed further up the stack.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.value.lock();
        let Ok(value) = guard.try_borrow() else {
            log::warn!("[instance] {} {:?} is busy, skipping re-entrant read", self.class.name(), self.id);
            return None;
        };
        Some(f(&value))
    }

    /// Exclusive access to the managed value; `None` on re-entrant use.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let guard = self.value.lock();
        let Ok(mut value) = guard.try_borrow_mut() else {
            log::warn!("[instance] {} {:?} is busy, skipping re-entrant call", self.class.name(), self.id);
            return None;
        };
        Some(f(&mut value))
    }

    // ------------------------------------------------------------------------
    // Property protocol
    // ------------------------------------------------------------------------

    /// Assign property `name`; `false` lets the engine handle it.
    pub fn set_property(&self, name: &str, value: &Variant) -> bool {
        let hooks = &self.class.hooks;
        let fields = &self.class.fields;
        self.with_mut(|this| {
            if let Some(on_set) = hooks.on_set {
                if on_set(this, name, value) {
                    return true;
                }
            }
            let Some(property) = fields.property(name) else {
                return false;
            };
            let stored = (property.access.set)(this, value);
            if !stored {
                report_warning(&format!(
                    "{}.{name}: cannot store a {:?} value",
                    self.class.name(),
                    value.get_type()
                ));
            }
            stored
        })
        .unwrap_or(false)
    }

    /// Read property `name`; `None` lets the engine handle it.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<Variant> {
        let hooks = &self.class.hooks;
        let fields = &self.class.fields;
        self.with(|this| {
            if let Some(value) = hooks.on_get.and_then(|on_get| on_get(this, name)) {
                return Some(value);
            }
            fields.property(name).map(|property| (property.access.get)(this))
        })
        .flatten()
    }

    #[must_use]
    pub fn can_revert(&self, name: &str) -> bool {
        match self.class.hooks.can_revert {
            Some(can_revert) => self.with(|this| can_revert(this, name)).unwrap_or(false),
            None => self
                .class
                .fields
                .property(name)
                .is_some_and(|property| property.default.is_some()),
        }
    }

    #[must_use]
    pub fn revert_value(&self, name: &str) -> Option<Variant> {
        match self.class.hooks.get_revert {
            Some(get_revert) => self.with(|this| get_revert(this, name)).flatten(),
            None => self
                .class
                .fields
                .property(name)?
                .default
                .as_ref()
                .map(crate::property::Literal::to_variant),
        }
    }

    // ------------------------------------------------------------------------
    // Notifications and scene assembly
    // ------------------------------------------------------------------------

    /// Handle a notification. Ready runs scene assembly first; user code is
    /// skipped in the editor unless the class is a tool.
    pub fn notify(&self, what: i32) {
        if what == NOTIFICATION_READY {
            self.assemble_scene();
        }
        if self.is_editor && !self.class.is_tool() {
            return;
        }
        let ready = (what == NOTIFICATION_READY)
            .then(|| self.class.ready_virtual())
            .flatten();
        let on_notification = self.class.hooks.on_notification;
        if ready.is_none() && on_notification.is_none() {
            return;
        }
        self.with_mut(|this| {
            if let Some(ready) = ready {
                // `_ready` takes no arguments and returns nothing.
                unsafe { ready.call_ptr(this, std::ptr::null(), std::ptr::null_mut()) };
            }
            if let Some(on_notification) = on_notification {
                on_notification(this, what);
            }
        });
    }

    /// Bind every declared child node, creating the missing ones. Nested
    /// nodes are looked up and created under their bound parent.
    pub fn assemble_scene(&self) {
        let nodes = &self.class.fields.nodes;
        if nodes.is_empty() {
            return;
        }
        // Created children must be owned by the edited scene to be saved with it.
        let scene_owner = if self.is_editor { engine::edited_scene_root() } else { None };
        let mut bound: Vec<Option<ObjectPtr>> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let parent = match node.parent {
                None => Some(self.object),
                Some(index) => bound.get(index).copied().flatten(),
            };
            let child = match parent {
                Some(parent) => self.assemble_child(node, parent, scene_owner),
                None => {
                    log::debug!("[scene] {}.{} skipped, parent unavailable", self.class.name(), node.name);
                    None
                }
            };
            bound.push(child);
        }
    }

    fn assemble_child(
        &self,
        node: &ResolvedNode<T>,
        parent: ObjectPtr,
        scene_owner: Option<ObjectPtr>,
    ) -> Option<ObjectPtr> {
        let path = NodePath::new(&node.name);
        let child = if engine::has_node(parent, &path) {
            let existing = engine::get_node(parent, &path)?;
            if !existing.is_class(&node.class_name) {
                fatal(&format!(
                    "{}.{}: existing child is a {}, not a {}",
                    self.class.name(),
                    node.name,
                    existing.class_name().unwrap_or_default(),
                    node.class_name
                ));
            }
            log::debug!("[scene] {}.{} bound to existing child", self.class.name(), node.name);
            existing
        } else {
            let Some(created) = ObjectPtr::construct(&node.class_name) else {
                report_error(&format!(
                    "{}.{}: cannot construct a {}",
                    self.class.name(),
                    node.name,
                    node.class_name
                ));
                return None;
            };
            engine::set_name(created, &StringName::new(&node.name));
            let mode = if node.internal {
                InternalMode::Front
            } else {
                InternalMode::Disabled
            };
            engine::add_child(parent, created, false, mode);
            if let Some(owner) = scene_owner {
                engine::set_owner(created, owner);
            }
            log::debug!("[scene] {}.{} created as {}", self.class.name(), node.name, node.class_name);
            created
        };
        let bridged = registry::get(child).map(|instance| Arc::downgrade(&instance));
        self.with_mut(|this| (node.access)(this).bind(child, bridged));
        Some(child)
    }

    #[must_use]
    pub fn display(&self) -> Option<String> {
        let to_string = self.class.hooks.to_string?;
        self.with(|this| to_string(this))
    }

    /// Tear down on free: signals first, then the registry entry, then
    /// native references and the user hook. Returns the registry's handle,
    /// which the caller drops once it no longer borrows `self`.
    #[must_use]
    pub(crate) fn free(&self) -> Option<Arc<dyn AnyInstance>> {
        self.close_signals();
        let entry = registry::remove(self.object);
        let properties = &self.class.fields.properties;
        let on_free = self.class.hooks.on_free;
        self.with_mut(|this| {
            for property in properties {
                (property.access.release)(this);
            }
            if let Some(on_free) = on_free {
                on_free(this);
            }
        });
        log::debug!("[instance] {} {:?} freed", self.class.name(), self.id);
        entry
    }
}

impl<T: ExtensionClass> AnyInstance for Instance<T> {
    fn object(&self) -> ObjectPtr {
        self.object
    }

    fn class_name(&self) -> &str {
        self.class.name()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}

impl<T: ExtensionClass> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Engine callbacks
// ============================================================================

/// Instance behind the engine's opaque pointer.
///
/// # Safety
///
/// `ptr` must be null or a pointer handed out by [`Instance::attach`] whose
/// registry entry is still alive.
pub(crate) unsafe fn instance_ref<'a, T: ExtensionClass>(ptr: ClassInstancePtr) -> Option<&'a Instance<T>> {
    ptr.cast::<Instance<T>>().cast_const().as_ref()
}

unsafe fn name_arg(name: ConstStringNamePtr) -> String {
    Borrowed::<StringName>::from_sys(name).to_string()
}

/// Overwrite an engine-initialized variant slot.
pub(crate) unsafe fn write_variant(slot: VariantPtr, value: Variant) {
    *slot.cast::<Variant>() = value;
}

fn flag(value: bool) -> GdBool {
    if value {
        TRUE
    } else {
        FALSE
    }
}

pub(crate) unsafe extern "C" fn set<T: ExtensionClass>(
    instance: ClassInstancePtr,
    name: ConstStringNamePtr,
    value: ConstVariantPtr,
) -> GdBool {
    reconcile_if_due();
    let Some(instance) = instance_ref::<T>(instance) else {
        return FALSE;
    };
    flag(instance.set_property(&name_arg(name), Variant::borrow_sys(value)))
}

pub(crate) unsafe extern "C" fn get<T: ExtensionClass>(
    instance: ClassInstancePtr,
    name: ConstStringNamePtr,
    ret: VariantPtr,
) -> GdBool {
    reconcile_if_due();
    let Some(instance) = instance_ref::<T>(instance) else {
        return FALSE;
    };
    match instance.get_property(&name_arg(name)) {
        Some(value) => {
            write_variant(ret, value);
            TRUE
        }
        None => FALSE,
    }
}

/// Property lists produced by a user override, keyed by the pointer handed
/// to the engine until it frees them.
static OVERRIDE_LISTS: LazyLock<DashMap<usize, InfoList>> = LazyLock::new(DashMap::new);

pub(crate) unsafe extern "C" fn get_property_list<T: ExtensionClass>(
    instance: ClassInstancePtr,
    count: *mut u32,
) -> *const PropertyInfo {
    reconcile_if_due();
    let Some(instance) = instance_ref::<T>(instance) else {
        *count = 0;
        return std::ptr::null();
    };
    let class = instance.class();
    let Some(list_override) = class.hooks.property_list else {
        let infos = class.property_infos();
        *count = infos.len() as u32;
        return infos.as_ptr();
    };
    let descriptors = instance.with(|this| list_override(this)).unwrap_or_default();
    let list = InfoList::build(&descriptors);
    let ptr = list.as_ptr();
    *count = list.len() as u32;
    if !ptr.is_null() {
        OVERRIDE_LISTS.insert(ptr as usize, list);
    }
    ptr
}

pub(crate) unsafe extern "C" fn free_property_list<T: ExtensionClass>(
    _instance: ClassInstancePtr,
    list: *const PropertyInfo,
) {
    // The reflected table lives with the class and is not in the map.
    OVERRIDE_LISTS.remove(&(list as usize));
}

pub(crate) unsafe extern "C" fn property_can_revert<T: ExtensionClass>(
    instance: ClassInstancePtr,
    name: ConstStringNamePtr,
) -> GdBool {
    reconcile_if_due();
    let Some(instance) = instance_ref::<T>(instance) else {
        return FALSE;
    };
    flag(instance.can_revert(&name_arg(name)))
}

pub(crate) unsafe extern "C" fn property_get_revert<T: ExtensionClass>(
    instance: ClassInstancePtr,
    name: ConstStringNamePtr,
    ret: VariantPtr,
) -> GdBool {
    reconcile_if_due();
    let Some(instance) = instance_ref::<T>(instance) else {
        return FALSE;
    };
    match instance.revert_value(&name_arg(name)) {
        Some(value) => {
            write_variant(ret, value);
            TRUE
        }
        None => FALSE,
    }
}

pub(crate) unsafe extern "C" fn notification<T: ExtensionClass>(
    instance: ClassInstancePtr,
    what: i32,
    _reversed: GdBool,
) {
    reconcile_if_due();
    if let Some(instance) = instance_ref::<T>(instance) {
        instance.notify(what);
    }
}

pub(crate) unsafe extern "C" fn to_string<T: ExtensionClass>(
    instance: ClassInstancePtr,
    is_valid: *mut GdBool,
    out: StringPtr,
) {
    reconcile_if_due();
    let text = instance_ref::<T>(instance).and_then(Instance::display);
    match text {
        Some(text) => {
            *out.cast::<GString>() = GString::new(&text);
            *is_valid = TRUE;
        }
        None => *is_valid = FALSE,
    }
}

// The native object owns its reference count.
pub(crate) unsafe extern "C" fn reference(_instance: ClassInstancePtr) {}

pub(crate) unsafe extern "C" fn unreference(_instance: ClassInstancePtr) {}

pub(crate) unsafe extern "C" fn get_rid(_instance: ClassInstancePtr) -> u64 {
    0
}
