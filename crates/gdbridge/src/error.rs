// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the bridge.
//!
//! Only configuration and contract problems get an error type here. Results of
//! individual engine calls keep the engine's own shapes (found flags, nullable
//! handles, [`CallErrorKind`](crate::abi::CallErrorKind)).

use thiserror::Error;

/// Failure to resolve or use the native function table.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("engine does not export `{0}`")]
    MissingSymbol(&'static str),

    #[error("extension ABI has not been loaded")]
    NotLoaded,

    #[error(transparent)]
    FfiString(#[from] std::ffi::NulError),
}

/// Authoring mistakes detected while turning a Rust type into a native class.
///
/// None of these are transient; the entry point treats every one as fatal.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("class `{0}` is already registered")]
    DuplicateClass(String),

    #[error("{class}.{field}: field type `{type_name}` has no native property type")]
    UnsupportedFieldType {
        class: String,
        field: String,
        type_name: &'static str,
    },

    #[error("{class}.{property}: default `{literal}` is not a valid {expected}")]
    InvalidDefault {
        class: String,
        property: String,
        literal: String,
        expected: &'static str,
    },

    #[error("{class}.{property}: property name declared twice")]
    DuplicateProperty { class: String, property: String },

    #[error("{class}.{method} does not match {base}.{virtual_name}\nis {found} want {expected}")]
    VirtualSignatureMismatch {
        class: String,
        method: String,
        base: &'static str,
        virtual_name: String,
        found: String,
        expected: String,
    },

    #[error("{class}.{method}: `{base}` declares no virtual with this name")]
    UnknownVirtual {
        class: String,
        method: String,
        base: &'static str,
    },

    #[error("{class}.{signal}: invalid signal declaration ({reason})")]
    InvalidSignal {
        class: String,
        signal: String,
        reason: String,
    },

    #[error("{class}.{field}: `{child_class}` is not a node class")]
    NotNodeCapable {
        class: String,
        field: String,
        child_class: String,
    },

    #[error("{class}.{node}: only node fields can be nested under a node")]
    NestedNonNode { class: String, node: String },

    #[error(transparent)]
    Abi(#[from] AbiError),
}

pub type Result<T, E = RegistrationError> = std::result::Result<T, E>;
