// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property/Signal Introspector.
//!
//! A class declares its exported state as a list of [`Field`]s:
//!
//! - **property**: a leaf value with a native wire type,
//! - **group**: a nested struct whose fields get a name prefix,
//! - **signal**: a [`Signal`] emitter,
//! - **node**: a [`Child`] node assembled when the owner enters the tree.
//!
//! At registration the list is resolved into a flat property table (depth
//! first, groups flattened), the signal descriptors and the scene assembly
//! plan. Every check happens there: an unsupported leaf type, a malformed
//! default literal or a signal declaration that does not match its argument
//! tuple fails the registration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::abi::{hint, usage, PropertyInfo};
use crate::class::{Capabilities, ExtensionClass, NativeClass};
use crate::error::{RegistrationError, Result};
use crate::instance::Child;
use crate::method::to_snake_case;
use crate::ownership::ObjectRef;
use crate::signal::{Signal, SignalArgs, SignalSlot};
use crate::types::{
    Array, Callable, Color, Dictionary, FromVariant, GString, NodePath, ObjectPtr, PackedByteArray,
    PackedColorArray, PackedFloat32Array, PackedFloat64Array, PackedInt32Array, PackedInt64Array,
    PackedStringArray, PackedVector2Array, PackedVector3Array, StringName, ToVariant, Variant,
    VariantType, Vector2, Vector2i, Vector3, Vector3i,
};

mod default;

pub use default::Literal;

// ============================================================================
// Wire-type table
// ============================================================================

/// Rust-side shape of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Usize,
    Char,
    F32,
    F64,
    String,
    StringName,
    NodePath,
    Vector2,
    Vector2i,
    Vector3,
    Vector3i,
    Color,
    Array,
    Dictionary,
    Callable,
    Packed(VariantType),
    Object,
    Variant,
}

/// Native property type of `tag`, `None` when the engine cannot store it.
///
/// 64-bit unsigned integers and `char` have no lossless native encoding.
#[must_use]
pub fn wire_type(tag: TypeTag) -> Option<VariantType> {
    let ty = match tag {
        TypeTag::Bool => VariantType::Bool,
        TypeTag::I8
        | TypeTag::I16
        | TypeTag::I32
        | TypeTag::I64
        | TypeTag::U8
        | TypeTag::U16
        | TypeTag::U32 => VariantType::Int,
        TypeTag::U64 | TypeTag::Usize | TypeTag::Char => return None,
        TypeTag::F32 | TypeTag::F64 => VariantType::Float,
        TypeTag::String => VariantType::String,
        TypeTag::StringName => VariantType::StringName,
        TypeTag::NodePath => VariantType::NodePath,
        TypeTag::Vector2 => VariantType::Vector2,
        TypeTag::Vector2i => VariantType::Vector2i,
        TypeTag::Vector3 => VariantType::Vector3,
        TypeTag::Vector3i => VariantType::Vector3i,
        TypeTag::Color => VariantType::Color,
        TypeTag::Array => VariantType::Array,
        TypeTag::Dictionary => VariantType::Dictionary,
        TypeTag::Callable => VariantType::Callable,
        TypeTag::Packed(ty) => ty,
        TypeTag::Object => VariantType::Object,
        TypeTag::Variant => VariantType::Nil,
    };
    Some(ty)
}

/// A field type that can back a property.
pub trait PropertyType: Sized + Send + 'static {
    const TAG: TypeTag;

    fn to_property(&self) -> Variant;

    /// `None` when `value` cannot be stored in this field.
    fn from_property(value: &Variant) -> Option<Self>;

    /// Give back native resources before the value is overwritten or the
    /// owning instance is freed.
    fn release(&self) {}
}

macro_rules! variant_property {
    ($($ty:ty => $tag:expr),* $(,)?) => {$(
        impl PropertyType for $ty {
            const TAG: TypeTag = $tag;

            fn to_property(&self) -> Variant {
                self.to_variant()
            }

            fn from_property(value: &Variant) -> Option<Self> {
                <$ty>::from_variant(value)
            }
        }
    )*};
}

variant_property! {
    bool => TypeTag::Bool,
    i8 => TypeTag::I8,
    i16 => TypeTag::I16,
    i32 => TypeTag::I32,
    i64 => TypeTag::I64,
    u8 => TypeTag::U8,
    u16 => TypeTag::U16,
    u32 => TypeTag::U32,
    f32 => TypeTag::F32,
    f64 => TypeTag::F64,
    String => TypeTag::String,
    GString => TypeTag::String,
    StringName => TypeTag::StringName,
    NodePath => TypeTag::NodePath,
    Vector2 => TypeTag::Vector2,
    Vector2i => TypeTag::Vector2i,
    Vector3 => TypeTag::Vector3,
    Vector3i => TypeTag::Vector3i,
    Color => TypeTag::Color,
    Array => TypeTag::Array,
    Dictionary => TypeTag::Dictionary,
    Callable => TypeTag::Callable,
    ObjectPtr => TypeTag::Object,
    Variant => TypeTag::Variant,
    PackedByteArray => TypeTag::Packed(VariantType::PackedByteArray),
    PackedInt32Array => TypeTag::Packed(VariantType::PackedInt32Array),
    PackedInt64Array => TypeTag::Packed(VariantType::PackedInt64Array),
    PackedFloat32Array => TypeTag::Packed(VariantType::PackedFloat32Array),
    PackedFloat64Array => TypeTag::Packed(VariantType::PackedFloat64Array),
    PackedStringArray => TypeTag::Packed(VariantType::PackedStringArray),
    PackedVector2Array => TypeTag::Packed(VariantType::PackedVector2Array),
    PackedVector3Array => TypeTag::Packed(VariantType::PackedVector3Array),
    PackedColorArray => TypeTag::Packed(VariantType::PackedColorArray),
}

// Representable in Rust but rejected at registration.
impl PropertyType for u64 {
    const TAG: TypeTag = TypeTag::U64;

    fn to_property(&self) -> Variant {
        i64::try_from(*self).unwrap_or(i64::MAX).to_variant()
    }

    fn from_property(value: &Variant) -> Option<Self> {
        i64::from_variant(value).and_then(|v| u64::try_from(v).ok())
    }
}

impl PropertyType for usize {
    const TAG: TypeTag = TypeTag::Usize;

    fn to_property(&self) -> Variant {
        i64::try_from(*self).unwrap_or(i64::MAX).to_variant()
    }

    fn from_property(value: &Variant) -> Option<Self> {
        i64::from_variant(value).and_then(|v| usize::try_from(v).ok())
    }
}

impl PropertyType for char {
    const TAG: TypeTag = TypeTag::Char;

    fn to_property(&self) -> Variant {
        self.to_string().to_variant()
    }

    fn from_property(value: &Variant) -> Option<Self> {
        let text = String::from_variant(value)?;
        let mut chars = text.chars();
        let first = chars.next()?;
        chars.next().is_none().then_some(first)
    }
}

impl PropertyType for ObjectRef {
    const TAG: TypeTag = TypeTag::Object;

    fn to_property(&self) -> Variant {
        self.as_ptr().to_variant()
    }

    /// Assignment keeps reference-counted objects alive.
    fn from_property(value: &Variant) -> Option<Self> {
        ObjectPtr::from_variant(value).map(ObjectRef::retained)
    }

    fn release(&self) {
        self.release_reference();
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// One entry of a class's property list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub variant_type: VariantType,
    /// Class of object-typed properties, empty otherwise.
    pub class_name: String,
    pub hint: u32,
    pub hint_string: String,
    pub usage: u32,
}

impl PropertyDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, variant_type: VariantType) -> Self {
        let usage = if variant_type == VariantType::Nil {
            usage::DEFAULT | usage::NIL_IS_VARIANT
        } else {
            usage::DEFAULT
        };
        Self {
            name: name.into(),
            variant_type,
            class_name: String::new(),
            hint: hint::NONE,
            hint_string: String::new(),
            usage,
        }
    }

    #[must_use]
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: u32, hint_string: impl Into<String>) -> Self {
        self.hint = hint;
        self.hint_string = hint_string.into();
        self
    }

    #[must_use]
    pub fn with_usage(mut self, usage: u32) -> Self {
        self.usage = usage;
        self
    }
}

/// A signal and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDescriptor {
    pub name: String,
    pub params: Vec<PropertyDescriptor>,
}

/// Native `PropertyInfo` array plus the strings it points into.
pub(crate) struct InfoList {
    _names: Box<[StringName]>,
    _classes: Box<[StringName]>,
    _hints: Box<[GString]>,
    infos: Box<[PropertyInfo]>,
}

// SAFETY: the raw pointers only reference the boxed strings owned alongside.
unsafe impl Send for InfoList {}
unsafe impl Sync for InfoList {}

impl InfoList {
    pub(crate) fn build(descriptors: &[PropertyDescriptor]) -> Self {
        let mut names: Box<[StringName]> = descriptors
            .iter()
            .map(|d| StringName::new(&d.name))
            .collect();
        let mut classes: Box<[StringName]> = descriptors
            .iter()
            .map(|d| StringName::new(&d.class_name))
            .collect();
        let mut hints: Box<[GString]> = descriptors
            .iter()
            .map(|d| GString::new(&d.hint_string))
            .collect();
        let infos = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| PropertyInfo {
                type_: d.variant_type as u32,
                name: names[i].sys_mut(),
                class_name: classes[i].sys_mut(),
                hint: d.hint,
                hint_string: hints[i].sys_mut(),
                usage: d.usage,
            })
            .collect();
        Self {
            _names: names,
            _classes: classes,
            _hints: hints,
            infos,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const PropertyInfo {
        if self.infos.is_empty() {
            std::ptr::null()
        } else {
            self.infos.as_ptr()
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.infos.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&PropertyInfo> {
        self.infos.get(index)
    }
}

// ============================================================================
// Fields
// ============================================================================

type Getter<T> = Arc<dyn Fn(&T) -> Variant + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, &Variant) -> bool + Send + Sync>;
type Release<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub(crate) type SignalAccess<T> = Arc<dyn for<'a> Fn(&'a mut T) -> &'a mut (dyn SignalSlot + 'static) + Send + Sync>;
pub(crate) type ChildAccess<T> = Arc<dyn for<'a> Fn(&'a mut T) -> &'a mut Child + Send + Sync>;
type Proj<S, T> = Arc<dyn for<'a> Fn(&'a S) -> &'a T + Send + Sync>;
type ProjMut<S, T> = Arc<dyn for<'a> Fn(&'a mut S) -> &'a mut T + Send + Sync>;

// Closures returning borrows need their signature pinned by a bound.
fn signal_access<T, F>(f: F) -> SignalAccess<T>
where
    F: for<'a> Fn(&'a mut T) -> &'a mut (dyn SignalSlot + 'static) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn child_access<T, F>(f: F) -> ChildAccess<T>
where
    F: for<'a> Fn(&'a mut T) -> &'a mut Child + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Type-erased accessors of one leaf property.
pub(crate) struct PropertyAccess<T> {
    pub(crate) get: Getter<T>,
    pub(crate) set: Setter<T>,
    pub(crate) release: Release<T>,
}

impl<T: 'static> PropertyAccess<T> {
    fn lift<S: 'static>(self, proj: &Proj<S, T>, proj_mut: &ProjMut<S, T>) -> PropertyAccess<S> {
        let (get, set, release) = (self.get, self.set, self.release);
        let (read, read_release, write) = (Arc::clone(proj), Arc::clone(proj), Arc::clone(proj_mut));
        PropertyAccess {
            get: Arc::new(move |s: &S| get(read(s))),
            set: Arc::new(move |s: &mut S, value: &Variant| set(write(s), value)),
            release: Arc::new(move |s: &S| release(read_release(s))),
        }
    }
}

struct PropertyField<T> {
    name: String,
    rename: Option<String>,
    skip: bool,
    default: Option<String>,
    hint: u32,
    hint_string: String,
    class_name: String,
    tag: TypeTag,
    type_name: &'static str,
    access: PropertyAccess<T>,
}

struct SignalField<T> {
    declaration: String,
    types: Vec<VariantType>,
    access: SignalAccess<T>,
}

struct NodeField<T> {
    name: String,
    class_name: String,
    node_capable: bool,
    internal: bool,
    access: ChildAccess<T>,
    children: Vec<Field<T>>,
}

enum FieldKind<T> {
    Property(PropertyField<T>),
    Group { name: String, fields: Vec<Field<T>> },
    Signal(SignalField<T>),
    Node(NodeField<T>),
}

/// One exported member of an extension class.
pub struct Field<T> {
    kind: FieldKind<T>,
}

impl<T: 'static> Field<T> {
    /// Leaf property. The exported name is the snake_case form of `name`
    /// unless [`rename`](Self::rename)d.
    pub fn property<V, G, M>(name: &str, get: G, get_mut: M) -> Self
    where
        V: PropertyType,
        G: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let read_release = Arc::clone(&get);
        let access = PropertyAccess {
            get: Arc::new(move |t: &T| get(t).to_property()),
            set: Arc::new(move |t: &mut T, value: &Variant| match V::from_property(value) {
                Some(new) => {
                    let slot = get_mut(t);
                    slot.release();
                    *slot = new;
                    true
                }
                None => false,
            }),
            release: Arc::new(move |t: &T| read_release(t).release()),
        };
        Self {
            kind: FieldKind::Property(PropertyField {
                name: name.to_string(),
                rename: None,
                skip: false,
                default: None,
                hint: hint::NONE,
                hint_string: String::new(),
                class_name: String::new(),
                tag: V::TAG,
                type_name: std::any::type_name::<V>(),
                access,
            }),
        }
    }

    /// Nested struct exported as a property group. Member names get the
    /// group's lowercase name as prefix.
    pub fn group<U, G, M>(name: &str, get: G, get_mut: M, fields: impl IntoIterator<Item = Field<U>>) -> Self
    where
        U: 'static,
        G: for<'a> Fn(&'a T) -> &'a U + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut U + Send + Sync + 'static,
    {
        let proj: Proj<T, U> = Arc::new(get);
        let proj_mut: ProjMut<T, U> = Arc::new(get_mut);
        Self {
            kind: FieldKind::Group {
                name: name.to_string(),
                fields: fields
                    .into_iter()
                    .map(|field| field.lift(&proj, &proj_mut))
                    .collect(),
            },
        }
    }

    /// Signal emitter. `declaration` is `name` or `name(param, ...)` with one
    /// parameter name per element of `A`.
    pub fn signal<A, F>(declaration: &str, access: F) -> Self
    where
        A: SignalArgs,
        F: for<'a> Fn(&'a mut T) -> &'a mut Signal<A> + Send + Sync + 'static,
    {
        Self {
            kind: FieldKind::Signal(SignalField {
                declaration: declaration.to_string(),
                types: A::types(),
                access: signal_access(move |t: &mut T| {
                    let slot: &mut (dyn SignalSlot + 'static) = access(t);
                    slot
                }),
            }),
        }
    }

    /// Child node of native class `C`, created on ready if missing.
    pub fn node<C, F>(name: &str, access: F) -> Self
    where
        C: NativeClass,
        F: for<'a> Fn(&'a mut T) -> &'a mut Child + Send + Sync + 'static,
    {
        Self::node_field(
            name,
            C::CLASS_NAME.to_string(),
            C::CAPABILITIES.contains(Capabilities::NODE),
            child_access(access),
        )
    }

    /// Child node of extension class `E`.
    pub fn extension_node<E, F>(name: &str, access: F) -> Self
    where
        E: ExtensionClass,
        F: for<'a> Fn(&'a mut T) -> &'a mut Child + Send + Sync + 'static,
    {
        Self::node_field(
            name,
            E::class_name(),
            <E::Base as NativeClass>::CAPABILITIES.contains(Capabilities::NODE),
            child_access(access),
        )
    }

    fn node_field(name: &str, class_name: String, node_capable: bool, access: ChildAccess<T>) -> Self {
        Self {
            kind: FieldKind::Node(NodeField {
                name: name.to_string(),
                class_name,
                node_capable,
                internal: false,
                access,
                children: Vec::new(),
            }),
        }
    }

    /// Export under `name` verbatim (properties and nodes).
    #[must_use]
    pub fn rename(mut self, name: &str) -> Self {
        match &mut self.kind {
            FieldKind::Property(p) => p.rename = Some(name.to_string()),
            FieldKind::Node(n) => n.name = name.to_string(),
            FieldKind::Group { .. } | FieldKind::Signal(_) => {}
        }
        self
    }

    /// Literal default, parsed against the property's wire type at
    /// registration; enables revert in the inspector.
    #[must_use]
    pub fn default(mut self, literal: &str) -> Self {
        if let FieldKind::Property(p) = &mut self.kind {
            p.default = Some(literal.to_string());
        }
        self
    }

    /// Editor hint (see [`crate::abi::hint`]).
    #[must_use]
    pub fn hint(mut self, hint: u32, hint_string: &str) -> Self {
        if let FieldKind::Property(p) = &mut self.kind {
            p.hint = hint;
            p.hint_string = hint_string.to_string();
        }
        self
    }

    /// Expected class of an object-typed property.
    #[must_use]
    pub fn class_hint(mut self, class_name: &str) -> Self {
        if let FieldKind::Property(p) = &mut self.kind {
            p.class_name = class_name.to_string();
        }
        self
    }

    /// Keep the field out of the property list.
    #[must_use]
    pub fn skip(mut self) -> Self {
        if let FieldKind::Property(p) = &mut self.kind {
            p.skip = true;
        }
        self
    }

    /// Add a node child as internal (hidden from the scene dock).
    #[must_use]
    pub fn internal(mut self) -> Self {
        if let FieldKind::Node(n) = &mut self.kind {
            n.internal = true;
        }
        self
    }

    /// Nodes assembled under this node instead of the owner. Their accessors
    /// still reach into the owning struct.
    #[must_use]
    pub fn children(mut self, fields: impl IntoIterator<Item = Field<T>>) -> Self {
        if let FieldKind::Node(n) = &mut self.kind {
            n.children.extend(fields);
        }
        self
    }

    /// Re-root this field under an outer struct `S`.
    fn lift<S: 'static>(self, proj: &Proj<S, T>, proj_mut: &ProjMut<S, T>) -> Field<S> {
        let kind = match self.kind {
            FieldKind::Property(p) => FieldKind::Property(PropertyField {
                name: p.name,
                rename: p.rename,
                skip: p.skip,
                default: p.default,
                hint: p.hint,
                hint_string: p.hint_string,
                class_name: p.class_name,
                tag: p.tag,
                type_name: p.type_name,
                access: p.access.lift(proj, proj_mut),
            }),
            FieldKind::Group { name, fields } => FieldKind::Group {
                name,
                fields: fields
                    .into_iter()
                    .map(|field| field.lift(proj, proj_mut))
                    .collect(),
            },
            FieldKind::Signal(s) => {
                let (inner, outer) = (s.access, Arc::clone(proj_mut));
                FieldKind::Signal(SignalField {
                    declaration: s.declaration,
                    types: s.types,
                    access: signal_access(move |o: &mut S| inner(outer(o))),
                })
            }
            FieldKind::Node(n) => {
                let (inner, outer) = (n.access, Arc::clone(proj_mut));
                FieldKind::Node(NodeField {
                    name: n.name,
                    class_name: n.class_name,
                    node_capable: n.node_capable,
                    internal: n.internal,
                    access: child_access(move |o: &mut S| inner(outer(o))),
                    children: n
                        .children
                        .into_iter()
                        .map(|field| field.lift(proj, proj_mut))
                        .collect(),
                })
            }
        };
        Field { kind }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A leaf property after resolution.
pub(crate) struct ResolvedProperty<T> {
    pub(crate) descriptor: PropertyDescriptor,
    pub(crate) default: Option<Literal>,
    pub(crate) access: PropertyAccess<T>,
}

/// Registration order of properties and group markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LayoutItem {
    Group { name: String, prefix: String },
    Subgroup { name: String, prefix: String },
    Property(usize),
    EndGroup,
    EndSubgroup,
}

pub(crate) struct ResolvedSignal<T> {
    pub(crate) descriptor: SignalDescriptor,
    pub(crate) access: SignalAccess<T>,
}

/// A child node after resolution. Parents precede their children.
pub(crate) struct ResolvedNode<T> {
    /// Index of the enclosing node; `None` for direct children of the owner.
    pub(crate) parent: Option<usize>,
    pub(crate) name: String,
    pub(crate) class_name: String,
    pub(crate) internal: bool,
    pub(crate) access: ChildAccess<T>,
}

/// Everything the field list of one class resolves to.
pub(crate) struct Resolved<T> {
    pub(crate) properties: Vec<ResolvedProperty<T>>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) layout: Vec<LayoutItem>,
    pub(crate) signals: Vec<ResolvedSignal<T>>,
    pub(crate) nodes: Vec<ResolvedNode<T>>,
}

impl<T> Resolved<T> {
    pub(crate) fn property(&self, name: &str) -> Option<&ResolvedProperty<T>> {
        self.by_name.get(name).map(|&index| &self.properties[index])
    }

    pub(crate) fn descriptors(&self) -> Vec<PropertyDescriptor> {
        self.properties.iter().map(|p| p.descriptor.clone()).collect()
    }
}

/// Resolve the declared fields of `class`.
pub(crate) fn resolve<T>(class: &str, fields: Vec<Field<T>>) -> Result<Resolved<T>> {
    let mut resolved = Resolved {
        properties: Vec::new(),
        by_name: HashMap::new(),
        layout: Vec::new(),
        signals: Vec::new(),
        nodes: Vec::new(),
    };
    walk(class, fields, "", 0, &mut resolved)?;
    Ok(resolved)
}

fn walk<T>(class: &str, fields: Vec<Field<T>>, prefix: &str, depth: usize, out: &mut Resolved<T>) -> Result<()> {
    for field in fields {
        match field.kind {
            FieldKind::Property(p) => resolve_property(class, p, prefix, out)?,
            FieldKind::Group { name, fields } => {
                let nested = format!("{prefix}{}_", name.to_lowercase());
                out.layout.push(if depth == 0 {
                    LayoutItem::Group {
                        name: name.clone(),
                        prefix: nested.clone(),
                    }
                } else {
                    LayoutItem::Subgroup {
                        name: name.clone(),
                        prefix: nested.clone(),
                    }
                });
                walk(class, fields, &nested, depth + 1, out)?;
                out.layout.push(if depth == 0 {
                    LayoutItem::EndGroup
                } else {
                    LayoutItem::EndSubgroup
                });
            }
            FieldKind::Signal(s) => {
                let descriptor = parse_signal(class, &s.declaration, &s.types)?;
                out.signals.push(ResolvedSignal {
                    descriptor,
                    access: s.access,
                });
            }
            FieldKind::Node(n) => resolve_node(class, n, None, out)?,
        }
    }
    Ok(())
}

fn resolve_node<T>(class: &str, n: NodeField<T>, parent: Option<usize>, out: &mut Resolved<T>) -> Result<()> {
    if !n.node_capable {
        return Err(RegistrationError::NotNodeCapable {
            class: class.to_string(),
            field: n.name,
            child_class: n.class_name,
        });
    }
    let index = out.nodes.len();
    out.nodes.push(ResolvedNode {
        parent,
        name: n.name,
        class_name: n.class_name,
        internal: n.internal,
        access: n.access,
    });
    for child in n.children {
        match child.kind {
            FieldKind::Node(c) => resolve_node(class, c, Some(index), out)?,
            _ => {
                return Err(RegistrationError::NestedNonNode {
                    class: class.to_string(),
                    node: out.nodes[index].name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn resolve_property<T>(class: &str, p: PropertyField<T>, prefix: &str, out: &mut Resolved<T>) -> Result<()> {
    if p.skip {
        return Ok(());
    }
    let Some(variant_type) = wire_type(p.tag) else {
        return Err(RegistrationError::UnsupportedFieldType {
            class: class.to_string(),
            field: p.name,
            type_name: p.type_name,
        });
    };
    let local = p.rename.unwrap_or_else(|| to_snake_case(&p.name));
    let name = format!("{prefix}{local}");

    let default = match p.default {
        Some(literal) => match Literal::parse(variant_type, &literal) {
            Some(parsed) => Some(parsed),
            None => {
                return Err(RegistrationError::InvalidDefault {
                    class: class.to_string(),
                    property: name,
                    literal,
                    expected: default::expected(variant_type),
                })
            }
        },
        None => None,
    };

    if out.by_name.contains_key(&name) {
        return Err(RegistrationError::DuplicateProperty {
            class: class.to_string(),
            property: name,
        });
    }

    let descriptor = PropertyDescriptor::new(name.clone(), variant_type)
        .with_class(p.class_name)
        .with_hint(p.hint, p.hint_string);
    let index = out.properties.len();
    out.properties.push(ResolvedProperty {
        descriptor,
        default,
        access: p.access,
    });
    out.by_name.insert(name, index);
    out.layout.push(LayoutItem::Property(index));
    Ok(())
}

fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Parse `name` or `name(a, b)` against the emitter's argument types.
fn parse_signal(class: &str, declaration: &str, types: &[VariantType]) -> Result<SignalDescriptor> {
    let invalid = |reason: String| RegistrationError::InvalidSignal {
        class: class.to_string(),
        signal: declaration.to_string(),
        reason,
    };

    let declaration = declaration.trim();
    let (name, params) = match declaration.split_once('(') {
        Some((name, rest)) => {
            let Some(inner) = rest.strip_suffix(')') else {
                return Err(invalid("missing closing parenthesis".into()));
            };
            let params: Vec<String> = inner
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            (name.trim(), Some(params))
        }
        None => (declaration, None),
    };

    if !valid_identifier(name) {
        return Err(invalid(format!("`{name}` is not a valid signal name")));
    }
    let params = match params {
        Some(params) => {
            if params.len() != types.len() {
                return Err(invalid(format!(
                    "{} parameter name(s) for {} argument(s)",
                    params.len(),
                    types.len()
                )));
            }
            if let Some(bad) = params.iter().find(|p| !valid_identifier(p)) {
                return Err(invalid(format!("`{bad}` is not a valid parameter name")));
            }
            params
        }
        None => (0..types.len()).map(|i| format!("arg{i}")).collect(),
    };

    Ok(SignalDescriptor {
        name: name.to_string(),
        params: params
            .into_iter()
            .zip(types)
            .map(|(param, ty)| PropertyDescriptor::new(param, *ty))
            .collect(),
    })
}
