// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class Registrar: turns an [`ExtensionClass`] into a native class.
//!
//! `register::<T>()` collects the class spec, resolves its fields, validates
//! every virtual override against the base's virtual table, and hands the
//! engine a class-creation record whose callbacks are monomorphized for `T`.
//! The resulting [`ClassDescriptor`] lives in a process-wide table until
//! the class is unregistered; the engine keeps raw pointers into it (class
//! userdata, method userdata, virtual call data) for that whole time.

use std::any::Any;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::abi::{
    method_flags, CallError, CallErrorKind, ClassCreationInfo, ClassInstancePtr, ClassMethodInfo,
    ConstStringNamePtr, ConstTypePtr, ConstVariantPtr, GdInt, InitLevel, RawObject,
    TypePtr, VariantPtr, FALSE, TRUE,
};
use crate::class::{Capabilities, ClassSpec, ExtensionClass, Hooks, NativeClass, VirtualSig};
use crate::engine;
use crate::error::{RegistrationError, Result};
use crate::host::{host, try_host};
use crate::instance::{self, instance_ref, write_variant, Instance};
use crate::logging::{fatal, report_error};
use crate::method::{convert_name, to_snake_case, MethodDescriptor, VirtualDescriptor};
use crate::ownership::{reconcile_if_due, Borrowed, Pinned};
use crate::property::{self, InfoList, LayoutItem, PropertyDescriptor, Resolved, SignalDescriptor};
use crate::registry;
use crate::types::{GString, ObjectPtr, StringName, Variant};

/// A user virtual bound to the base-class virtual it overrides.
pub struct BoundVirtual<T> {
    descriptor: VirtualDescriptor<T>,
    sig: &'static VirtualSig,
}

impl<T: 'static> BoundVirtual<T> {
    /// Engine name of the overridden virtual (`_process`).
    #[must_use]
    pub fn engine_name(&self) -> &'static str {
        self.sig.name
    }

    #[must_use]
    pub fn method(&self) -> &MethodDescriptor<T> {
        &self.descriptor.method
    }
}

/// The registered description of one extension class.
pub struct ClassDescriptor<T> {
    name: String,
    base: &'static str,
    capabilities: Capabilities,
    tool: bool,
    class_name: Pinned<StringName>,
    base_name: Pinned<StringName>,
    pub(crate) fields: Resolved<T>,
    property_infos: InfoList,
    methods: Vec<MethodDescriptor<T>>,
    virtuals: Vec<BoundVirtual<T>>,
    pub(crate) hooks: Hooks<T>,
    constants: Vec<(String, String, i64)>,
    plugin_added: AtomicBool,
}

impl<T: ExtensionClass> ClassDescriptor<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native parent class name.
    #[must_use]
    pub fn base(&self) -> &'static str {
        self.base
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Runs in the editor.
    #[must_use]
    pub fn is_tool(&self) -> bool {
        self.tool
    }

    pub(crate) fn class_name(&self) -> &StringName {
        &self.class_name
    }

    pub(crate) fn base_name(&self) -> &StringName {
        &self.base_name
    }

    pub(crate) fn property_infos(&self) -> &InfoList {
        &self.property_infos
    }

    /// Reflected property list, in registration order.
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyDescriptor> {
        self.fields.descriptors()
    }

    #[must_use]
    pub fn signals(&self) -> Vec<SignalDescriptor> {
        self.fields
            .signals
            .iter()
            .map(|s| s.descriptor.clone())
            .collect()
    }

    #[must_use]
    pub fn methods(&self) -> &[MethodDescriptor<T>] {
        &self.methods
    }

    /// User override for the engine virtual `name`, if any.
    ///
    /// The match is by converted name; the signature was validated at
    /// registration and is re-checked here, a mismatch being fatal.
    #[must_use]
    pub fn resolve_virtual(&self, name: &str) -> Option<&BoundVirtual<T>> {
        let key = convert_name(name);
        let bound = self.virtuals.iter().find(|v| v.descriptor.key == key)?;
        let expected = bound.sig.signature();
        if bound.descriptor.method.signature != expected {
            fatal(&format!(
                "{}.{} does not match {}.{}\nis {} want {}",
                self.name,
                bound.descriptor.method.name,
                self.base,
                bound.sig.name,
                bound.descriptor.method.signature,
                expected
            ));
        }
        Some(bound)
    }

    /// The `_ready` override, run by the bridge after scene assembly.
    pub(crate) fn ready_virtual(&self) -> Option<&MethodDescriptor<T>> {
        self.resolve_virtual("_ready").map(BoundVirtual::method)
    }
}

/// Type-erased view of a registered class.
pub trait RegisteredClass: Any + Send + Sync {
    fn name(&self) -> &str;
    fn base_name(&self) -> &'static str;
    fn is_tool(&self) -> bool;
    fn property_descriptors(&self) -> Vec<PropertyDescriptor>;
    fn signal_descriptors(&self) -> Vec<SignalDescriptor>;
    fn method_names(&self) -> Vec<String>;
    fn resolves_virtual(&self, name: &str) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    /// Remove the class from the engine's class database.
    fn unregister(&self);
}

impl<T: ExtensionClass> RegisteredClass for ClassDescriptor<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_name(&self) -> &'static str {
        self.base
    }

    fn is_tool(&self) -> bool {
        self.tool
    }

    fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        self.properties()
    }

    fn signal_descriptors(&self) -> Vec<SignalDescriptor> {
        self.signals()
    }

    fn method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name.clone()).collect()
    }

    fn resolves_virtual(&self, name: &str) -> bool {
        self.resolve_virtual(name).is_some()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn unregister(&self) {
        let Some(host) = try_host() else {
            return;
        };
        unsafe {
            if self.plugin_added.swap(false, Ordering::AcqRel) {
                (host.abi.editor_remove_plugin)(self.class_name.sys());
            }
            (host.abi.classdb_unregister_extension_class)(host.library(), self.class_name.sys());
        }
        log::debug!("[registrar] unregistered {}", self.name);
    }
}

// ============================================================================
// Class table
// ============================================================================

static CLASSES: LazyLock<DashMap<String, Arc<dyn RegisteredClass>>> = LazyLock::new(DashMap::new);
static ORDER: LazyLock<Mutex<Vec<(InitLevel, String)>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Initialization level `T` registers at.
#[must_use]
pub fn level_of<T: ExtensionClass>() -> InitLevel {
    if <T::Base as NativeClass>::CAPABILITIES.needs_editor_level() {
        InitLevel::Editor
    } else {
        InitLevel::Scene
    }
}

#[must_use]
pub fn is_registered(name: &str) -> bool {
    CLASSES.contains_key(name)
}

/// Names of every registered class, in registration order.
#[must_use]
pub fn registered_classes() -> Vec<String> {
    ORDER.lock().iter().map(|(_, name)| name.clone()).collect()
}

#[must_use]
pub fn class(name: &str) -> Option<Arc<dyn RegisteredClass>> {
    CLASSES.get(name).map(|entry| Arc::clone(entry.value()))
}

/// Descriptor of the registered class `T`.
#[must_use]
pub fn descriptor<T: ExtensionClass>() -> Option<Arc<ClassDescriptor<T>>> {
    class(&T::class_name())?
        .into_any()
        .downcast::<ClassDescriptor<T>>()
        .ok()
}

/// Whether class `class` overrides the engine virtual `name`.
#[must_use]
pub fn resolve_virtual(class_name: &str, name: &str) -> bool {
    class(class_name).is_some_and(|class| class.resolves_virtual(name))
}

/// Unregister every class registered at `level`, newest first.
pub fn unregister_level(level: InitLevel) {
    let names: Vec<String> = {
        let mut order = ORDER.lock();
        let (taken, kept): (Vec<_>, Vec<_>) = order.drain(..).partition(|(l, _)| *l == level);
        *order = kept;
        taken.into_iter().map(|(_, name)| name).collect()
    };
    for name in names.iter().rev() {
        if let Some((_, class)) = CLASSES.remove(name) {
            class.unregister();
        }
    }
}

/// Unregister every class, newest first.
pub fn unregister_all() {
    let names: Vec<String> = ORDER.lock().drain(..).map(|(_, name)| name).collect();
    for name in names.iter().rev() {
        if let Some((_, class)) = CLASSES.remove(name) {
            class.unregister();
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Engine name a user virtual overrides: names starting with `_` are taken
/// as-is, others are converted to snake_case and prefixed.
fn engine_virtual_name(name: &str) -> String {
    if name.starts_with('_') {
        name.to_string()
    } else {
        format!("_{}", to_snake_case(name))
    }
}

fn bind_virtuals<T: ExtensionClass>(
    class: &str,
    virtuals: Vec<VirtualDescriptor<T>>,
) -> Result<Vec<BoundVirtual<T>>> {
    let base = <T::Base as NativeClass>::CLASS_NAME;
    virtuals
        .into_iter()
        .map(|descriptor| {
            let method = descriptor.method.name.clone();
            let virtual_name = engine_virtual_name(&method);
            let Some(sig) = <T::Base as NativeClass>::find_virtual(&virtual_name) else {
                return Err(RegistrationError::UnknownVirtual {
                    class: class.to_string(),
                    method,
                    base,
                });
            };
            let expected = sig.signature();
            if descriptor.method.signature != expected {
                return Err(RegistrationError::VirtualSignatureMismatch {
                    class: class.to_string(),
                    method,
                    base,
                    virtual_name,
                    found: descriptor.method.signature.to_string(),
                    expected: expected.to_string(),
                });
            }
            Ok(BoundVirtual { descriptor, sig })
        })
        .collect()
}

/// Register `T` with the engine's class database.
pub fn register<T: ExtensionClass>() -> Result<Arc<ClassDescriptor<T>>> {
    let host = try_host().ok_or(crate::error::AbiError::NotLoaded)?;
    let name = T::class_name();
    if CLASSES.contains_key(&name) {
        return Err(RegistrationError::DuplicateClass(name));
    }

    let spec = ClassSpec::<T>::collect();
    let fields = property::resolve(&name, spec.fields)?;
    let virtuals = bind_virtuals::<T>(&name, spec.virtuals)?;
    let capabilities = <T::Base as NativeClass>::CAPABILITIES;
    let base = <T::Base as NativeClass>::CLASS_NAME;

    let descriptor = Arc::new(ClassDescriptor {
        property_infos: InfoList::build(&fields.descriptors()),
        tool: spec.tool || capabilities.is_tool(),
        class_name: Pinned::new(StringName::new(&name)),
        base_name: Pinned::new(StringName::new(base)),
        name: name.clone(),
        base,
        capabilities,
        fields,
        methods: spec.methods,
        virtuals,
        hooks: spec.hooks,
        constants: spec.constants,
        plugin_added: AtomicBool::new(false),
    });

    let info = ClassCreationInfo {
        is_virtual: FALSE,
        is_abstract: FALSE,
        is_exposed: TRUE,
        set_func: Some(instance::set::<T>),
        get_func: Some(instance::get::<T>),
        get_property_list_func: Some(instance::get_property_list::<T>),
        free_property_list_func: Some(instance::free_property_list::<T>),
        property_can_revert_func: Some(instance::property_can_revert::<T>),
        property_get_revert_func: Some(instance::property_get_revert::<T>),
        validate_property_func: None,
        notification_func: Some(instance::notification::<T>),
        to_string_func: Some(instance::to_string::<T>),
        reference_func: Some(instance::reference),
        unreference_func: Some(instance::unreference),
        create_instance_func: Some(create_instance::<T>),
        free_instance_func: Some(free_instance::<T>),
        recreate_instance_func: Some(recreate_instance::<T>),
        get_virtual_func: None,
        get_virtual_call_data_func: Some(get_virtual_call_data::<T>),
        call_virtual_with_data_func: Some(call_virtual_with_data::<T>),
        get_rid_func: Some(instance::get_rid),
        class_userdata: Arc::as_ptr(&descriptor).cast_mut().cast(),
    };

    let library = host.library();
    let class = descriptor.class_name().sys();
    unsafe {
        (host.abi.classdb_register_extension_class2)(library, class, descriptor.base_name().sys(), &info);
    }

    register_constants(&descriptor);
    register_properties(&descriptor);
    register_signals(&descriptor);
    register_methods(&descriptor);

    if capabilities.contains(Capabilities::EDITOR_PLUGIN) && engine::is_editor_hint() {
        unsafe { (host.abi.editor_add_plugin)(class) };
        descriptor.plugin_added.store(true, Ordering::Release);
    }

    CLASSES.insert(name.clone(), Arc::clone(&descriptor) as Arc<dyn RegisteredClass>);
    ORDER.lock().push((level_of::<T>(), name.clone()));

    if let Some(on_register) = descriptor.hooks.on_register {
        on_register(&name);
    }
    log::debug!(
        "[registrar] registered {name} extends {base} ({} properties, {} signals, {} methods, {} virtuals{})",
        descriptor.fields.properties.len(),
        descriptor.fields.signals.len(),
        descriptor.methods.len(),
        descriptor.virtuals.len(),
        if descriptor.tool { ", tool" } else { "" }
    );
    Ok(descriptor)
}

fn register_constants<T: ExtensionClass>(descriptor: &ClassDescriptor<T>) {
    let host = host();
    for (enum_name, name, value) in &descriptor.constants {
        let (enum_name, name) = (StringName::new(enum_name), StringName::new(name));
        unsafe {
            (host.abi.classdb_register_extension_class_integer_constant)(
                host.library(),
                descriptor.class_name().sys(),
                enum_name.sys(),
                name.sys(),
                *value as GdInt,
                FALSE,
            );
        }
    }
}

fn register_properties<T: ExtensionClass>(descriptor: &ClassDescriptor<T>) {
    let host = host();
    let library = host.library();
    let class = descriptor.class_name().sys();
    // Empty accessor names route through the class's set/get callbacks.
    let no_accessor = StringName::new("");
    let group = |name: &str, prefix: &str, sub: bool| {
        let (name, prefix) = (GString::new(name), GString::new(prefix));
        unsafe {
            if sub {
                (host.abi.classdb_register_extension_class_property_subgroup)(library, class, name.sys(), prefix.sys());
            } else {
                (host.abi.classdb_register_extension_class_property_group)(library, class, name.sys(), prefix.sys());
            }
        }
    };

    for item in &descriptor.fields.layout {
        match item {
            LayoutItem::Group { name, prefix } => group(name, prefix, false),
            LayoutItem::Subgroup { name, prefix } => group(name, prefix, true),
            LayoutItem::EndGroup => group("", "", false),
            LayoutItem::EndSubgroup => group("", "", true),
            LayoutItem::Property(index) => {
                let Some(info) = descriptor.property_infos.get(*index) else {
                    continue;
                };
                unsafe {
                    (host.abi.classdb_register_extension_class_property)(
                        library,
                        class,
                        info,
                        no_accessor.sys(),
                        no_accessor.sys(),
                    );
                }
            }
        }
    }
}

fn register_signals<T: ExtensionClass>(descriptor: &ClassDescriptor<T>) {
    let host = host();
    for signal in &descriptor.fields.signals {
        let name = StringName::new(&signal.descriptor.name);
        let params = InfoList::build(&signal.descriptor.params);
        unsafe {
            (host.abi.classdb_register_extension_class_signal)(
                host.library(),
                descriptor.class_name().sys(),
                name.sys(),
                params.as_ptr(),
                params.len() as GdInt,
            );
        }
    }
}

fn register_methods<T: ExtensionClass>(descriptor: &ClassDescriptor<T>) {
    let host = host();
    for method in &descriptor.methods {
        let mut name = StringName::new(&method.name);
        let arg_infos: Vec<PropertyDescriptor> = method
            .signature
            .args
            .iter()
            .enumerate()
            .map(|(i, ty)| PropertyDescriptor::new(format!("arg{i}"), *ty))
            .collect();
        let args = InfoList::build(&arg_infos);
        let ret = InfoList::build(
            &method
                .signature
                .ret
                .map(|ty| PropertyDescriptor::new("", ty))
                .into_iter()
                .collect::<Vec<_>>(),
        );
        let mut arg_metadata = method.arg_metadata.clone();

        let info = ClassMethodInfo {
            name: name.sys_mut(),
            method_userdata: std::ptr::from_ref(method).cast_mut().cast(),
            call_func: Some(method_call::<T>),
            ptrcall_func: Some(method_ptrcall::<T>),
            method_flags: if method.is_static() {
                method_flags::DEFAULT | method_flags::STATIC
            } else {
                method_flags::DEFAULT
            },
            has_return_value: if method.signature.ret.is_some() { TRUE } else { FALSE },
            return_value_info: ret.as_ptr().cast_mut(),
            return_value_metadata: method.ret_metadata,
            argument_count: method.signature.args.len() as u32,
            arguments_info: args.as_ptr().cast_mut(),
            arguments_metadata: arg_metadata.as_mut_ptr(),
            default_argument_count: 0,
            default_arguments: std::ptr::null_mut(),
        };
        unsafe {
            (host.abi.classdb_register_extension_class_method)(
                host.library(),
                descriptor.class_name().sys(),
                &info,
            );
        }
    }
}

// ============================================================================
// Class callbacks
// ============================================================================

/// Shared handle on the descriptor behind a class userdata pointer.
///
/// # Safety
///
/// `userdata` must be the class userdata of a still-registered `T`.
unsafe fn descriptor_from_userdata<T: ExtensionClass>(userdata: *mut c_void) -> Arc<ClassDescriptor<T>> {
    let ptr = userdata.cast_const().cast::<ClassDescriptor<T>>();
    // The class table holds a strong count for as long as the class exists.
    Arc::increment_strong_count(ptr);
    Arc::from_raw(ptr)
}

unsafe extern "C" fn create_instance<T: ExtensionClass>(userdata: *mut c_void) -> RawObject {
    reconcile_if_due();
    let class = descriptor_from_userdata::<T>(userdata);
    let Some(object) = ObjectPtr::construct_named(class.base_name()) else {
        report_error(&format!("{}: cannot construct base {}", class.name(), class.base()));
        return std::ptr::null_mut();
    };
    Instance::attach(class, object, T::create());
    object.as_raw()
}

unsafe extern "C" fn recreate_instance<T: ExtensionClass>(
    userdata: *mut c_void,
    object: RawObject,
) -> ClassInstancePtr {
    reconcile_if_due();
    let class = descriptor_from_userdata::<T>(userdata);
    let object = ObjectPtr::from_raw(object);
    if let Some(stale) = registry::remove(object) {
        log::debug!("[registrar] {}: replacing stale {} instance on reload", class.name(), stale.class_name());
    }
    let instance = Instance::attach(class, object, T::create());
    Arc::as_ptr(&instance).cast_mut().cast()
}

unsafe extern "C" fn free_instance<T: ExtensionClass>(_userdata: *mut c_void, instance: ClassInstancePtr) {
    reconcile_if_due();
    let entry = instance_ref::<T>(instance).and_then(Instance::free);
    drop(entry);
}

unsafe extern "C" fn get_virtual_call_data<T: ExtensionClass>(
    userdata: *mut c_void,
    name: ConstStringNamePtr,
) -> *mut c_void {
    let class = &*userdata.cast_const().cast::<ClassDescriptor<T>>();
    if !class.is_tool() && engine::is_editor_hint() {
        return std::ptr::null_mut();
    }
    let name = Borrowed::<StringName>::from_sys(name).to_string();
    // `_ready` runs from the ready notification, after scene assembly.
    if name == "_ready" {
        return std::ptr::null_mut();
    }
    match class.resolve_virtual(&name) {
        Some(bound) => std::ptr::from_ref(bound).cast_mut().cast(),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn call_virtual_with_data<T: ExtensionClass>(
    instance: ClassInstancePtr,
    _name: ConstStringNamePtr,
    data: *mut c_void,
    args: *const ConstTypePtr,
    ret: TypePtr,
) {
    reconcile_if_due();
    let (Some(instance), Some(bound)) = (
        instance_ref::<T>(instance),
        data.cast_const().cast::<BoundVirtual<T>>().as_ref(),
    ) else {
        return;
    };
    instance.with_mut(|this| bound.method().call_ptr(this, args, ret));
}

fn call_error(kind: CallErrorKind) -> CallError {
    CallError {
        error: kind as u32,
        argument: 0,
        expected: 0,
    }
}

unsafe extern "C" fn method_call<T: ExtensionClass>(
    userdata: *mut c_void,
    instance: ClassInstancePtr,
    args: *const ConstVariantPtr,
    count: GdInt,
    ret: VariantPtr,
    error: *mut CallError,
) {
    reconcile_if_due();
    let method = &*userdata.cast_const().cast::<MethodDescriptor<T>>();
    let args: Vec<&Variant> = (0..usize::try_from(count).unwrap_or(0))
        .map(|i| Variant::borrow_sys(*args.add(i)))
        .collect();
    if method.is_static() {
        match method.call_static_variant(&args) {
            Ok(value) => {
                write_variant(ret, value);
                *error = call_error(CallErrorKind::Ok);
            }
            Err(e) => *error = e,
        }
        return;
    }
    let Some(instance) = instance_ref::<T>(instance) else {
        *error = call_error(CallErrorKind::InstanceIsNull);
        return;
    };
    match instance.with_mut(|this| method.call_variant(this, &args)) {
        Some(Ok(value)) => {
            write_variant(ret, value);
            *error = call_error(CallErrorKind::Ok);
        }
        Some(Err(e)) => *error = e,
        None => *error = call_error(CallErrorKind::InvalidMethod),
    }
}

unsafe extern "C" fn method_ptrcall<T: ExtensionClass>(
    userdata: *mut c_void,
    instance: ClassInstancePtr,
    args: *const ConstTypePtr,
    ret: TypePtr,
) {
    reconcile_if_due();
    let method = &*userdata.cast_const().cast::<MethodDescriptor<T>>();
    if method.call_static_ptr(args, ret) {
        return;
    }
    if let Some(instance) = instance_ref::<T>(instance) {
        instance.with_mut(|this| method.call_ptr(this, args, ret));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_of_user_virtuals() {
        assert_eq!(engine_virtual_name("_process"), "_process");
        assert_eq!(engine_virtual_name("PhysicsProcess"), "_physics_process");
        assert_eq!(engine_virtual_name("ready"), "_ready");
    }

    #[test]
    fn editor_bases_register_late() {
        struct Plugin;

        impl ExtensionClass for Plugin {
            type Base = crate::class::EditorPlugin;

            fn create() -> Self {
                Plugin
            }
        }

        struct Plain;

        impl ExtensionClass for Plain {
            type Base = crate::class::Node2D;

            fn create() -> Self {
                Plain
            }
        }

        assert_eq!(level_of::<Plugin>(), InitLevel::Editor);
        assert_eq!(level_of::<Plain>(), InitLevel::Scene);
    }

    #[test]
    fn binding_rejects_unknown_and_mismatched_virtuals() {
        struct Mover {
            x: f64,
        }

        impl ExtensionClass for Mover {
            type Base = crate::class::Node;

            fn create() -> Self {
                Mover { x: 0.0 }
            }
        }

        let ok = bind_virtuals::<Mover>(
            "Mover",
            vec![VirtualDescriptor::new("Process", |m: &mut Mover, delta: f64| m.x += delta)],
        )
        .expect("matches Node._process");
        assert_eq!(ok[0].engine_name(), "_process");

        let err = bind_virtuals::<Mover>(
            "Mover",
            vec![VirtualDescriptor::new("_process", |m: &mut Mover, delta: i64| m.x += delta as f64)],
        )
        .err()
        .expect("int is not float");
        assert!(matches!(err, RegistrationError::VirtualSignatureMismatch { ref virtual_name, .. } if virtual_name == "_process"));

        let err = bind_virtuals::<Mover>("Mover", vec![VirtualDescriptor::new("_fly", |_: &mut Mover| {})])
            .err()
            .expect("Node has no _fly");
        assert!(matches!(err, RegistrationError::UnknownVirtual { base: "Node", .. }));
    }
}
