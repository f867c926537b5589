// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Default-value literals attached to properties.
//!
//! Literals are parsed once at registration against the property's wire type,
//! so a malformed default is a registration error rather than a silent
//! non-revertible property.

use crate::types::{Color, GString, NodePath, StringName, ToVariant, Variant, VariantType, Vector2, Vector3};

/// A parsed default value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Path(String),
    Vector2(Vector2),
    Vector3(Vector3),
    Color(Color),
}

fn components(text: &str) -> Option<Vec<f32>> {
    let inner = text
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    inner
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}

fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Human name of what a literal for `ty` must look like.
#[must_use]
pub fn expected(ty: VariantType) -> &'static str {
    match ty {
        VariantType::Bool => "bool (true/false)",
        VariantType::Int => "integer",
        VariantType::Float => "number",
        VariantType::String | VariantType::StringName | VariantType::NodePath => "string",
        VariantType::Vector2 => "vector (x, y)",
        VariantType::Vector3 => "vector (x, y, z)",
        VariantType::Color => "color (r, g, b[, a])",
        _ => "type with literal defaults",
    }
}

impl Literal {
    /// Parse `text` as a default for a property of type `ty`.
    #[must_use]
    pub fn parse(ty: VariantType, text: &str) -> Option<Self> {
        let trimmed = text.trim();
        match ty {
            VariantType::Bool => match trimmed {
                "true" => Some(Self::Bool(true)),
                "false" => Some(Self::Bool(false)),
                _ => None,
            },
            VariantType::Int => trimmed.parse().ok().map(Self::Int),
            VariantType::Float => trimmed.parse().ok().map(Self::Float),
            VariantType::String => Some(Self::Str(unquote(text).to_string())),
            VariantType::StringName => Some(Self::Name(unquote(text).to_string())),
            VariantType::NodePath => Some(Self::Path(unquote(text).to_string())),
            VariantType::Vector2 => match components(trimmed)?.as_slice() {
                [x, y] => Some(Self::Vector2(Vector2::new(*x, *y))),
                _ => None,
            },
            VariantType::Vector3 => match components(trimmed)?.as_slice() {
                [x, y, z] => Some(Self::Vector3(Vector3::new(*x, *y, *z))),
                _ => None,
            },
            VariantType::Color => match components(trimmed)?.as_slice() {
                [r, g, b] => Some(Self::Color(Color::rgba(*r, *g, *b, 1.0))),
                [r, g, b, a] => Some(Self::Color(Color::rgba(*r, *g, *b, *a))),
                _ => None,
            },
            _ => None,
        }
    }

    /// The literal as an engine value.
    #[must_use]
    pub fn to_variant(&self) -> Variant {
        match self {
            Self::Bool(value) => value.to_variant(),
            Self::Int(value) => value.to_variant(),
            Self::Float(value) => value.to_variant(),
            Self::Str(value) => GString::new(value).to_variant(),
            Self::Name(value) => StringName::new(value).to_variant(),
            Self::Path(value) => NodePath::new(value).to_variant(),
            Self::Vector2(value) => value.to_variant(),
            Self::Vector3(value) => value.to_variant(),
            Self::Color(value) => value.to_variant(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_literals() {
        assert_eq!(Literal::parse(VariantType::Bool, "true"), Some(Literal::Bool(true)));
        assert_eq!(Literal::parse(VariantType::Int, " -12 "), Some(Literal::Int(-12)));
        assert_eq!(Literal::parse(VariantType::Float, "0.25"), Some(Literal::Float(0.25)));
        assert_eq!(Literal::parse(VariantType::Int, "1.5"), None);
        assert_eq!(Literal::parse(VariantType::Bool, "yes"), None);
    }

    #[test]
    fn string_literals_drop_quotes() {
        assert_eq!(
            Literal::parse(VariantType::String, "\"hello\""),
            Some(Literal::Str("hello".into()))
        );
        assert_eq!(
            Literal::parse(VariantType::NodePath, "Player/Sprite"),
            Some(Literal::Path("Player/Sprite".into()))
        );
    }

    #[test]
    fn composite_literals() {
        assert_eq!(
            Literal::parse(VariantType::Vector2, "(1, 2.5)"),
            Some(Literal::Vector2(Vector2::new(1.0, 2.5)))
        );
        assert_eq!(
            Literal::parse(VariantType::Color, "1, 0, 0"),
            Some(Literal::Color(Color::rgba(1.0, 0.0, 0.0, 1.0)))
        );
        assert_eq!(Literal::parse(VariantType::Vector3, "1, 2"), None);
        assert_eq!(Literal::parse(VariantType::Array, "[]"), None);
    }
}
