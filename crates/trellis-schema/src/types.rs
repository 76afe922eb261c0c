//! Type expressions used by declaration fields

use crate::decl::DeclKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Int,
    Float,
    String,
}

impl Primitive {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

/// Field type
///
/// References name other declarations instead of embedding them, so a
/// declaration may mention itself. Serialized adjacently tagged
/// (`{kind: list, of: {kind: primitive, of: int}}`) so nesting stays plain
/// maps in every format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeExpr {
    Primitive(Primitive),
    List(Box<TypeExpr>),
    Ref(DeclKind, String),
}

impl TypeExpr {
    #[inline]
    #[must_use]
    pub fn list(inner: TypeExpr) -> Self {
        Self::List(Box::new(inner))
    }

    #[inline]
    pub fn reference(kind: DeclKind, name: impl Into<String>) -> Self {
        Self::Ref(kind, name.into())
    }

    /// Innermost named reference, if any
    #[must_use]
    pub fn referenced(&self) -> Option<(DeclKind, &str)> {
        match self {
            Self::Primitive(_) => None,
            Self::List(inner) => inner.referenced(),
            Self::Ref(kind, name) => Some((*kind, name)),
        }
    }
}

impl From<Primitive> for TypeExpr {
    fn from(primitive: Primitive) -> Self {
        Self::Primitive(primitive)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => f.write_str(primitive.as_str()),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::Ref(_, name) => f.write_str(name),
        }
    }
}

/// Named, typed member of a struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

impl Field {
    #[inline]
    pub fn new(name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nests_lists() {
        let ty = TypeExpr::list(TypeExpr::list(Primitive::Int.into()));
        assert_eq!(ty.to_string(), "[[int]]");
        assert_eq!(
            TypeExpr::list(TypeExpr::reference(DeclKind::Union, "Shape")).to_string(),
            "[Shape]"
        );
    }

    #[test]
    fn referenced_sees_through_lists() {
        let ty = TypeExpr::list(TypeExpr::reference(DeclKind::Struct, "Point"));
        assert_eq!(ty.referenced(), Some((DeclKind::Struct, "Point")));
        assert_eq!(TypeExpr::from(Primitive::Bool).referenced(), None);
    }

    #[test]
    fn field_serializes_type_key() {
        let field = Field::new("radius", Primitive::Float);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"]["kind"], "primitive");
        assert_eq!(json["type"]["of"], "float");
    }

    #[test]
    fn nested_types_serialize_as_plain_maps() {
        let ty = TypeExpr::list(TypeExpr::reference(DeclKind::Struct, "Point"));
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["kind"], "list");
        assert_eq!(json["of"]["kind"], "ref");
        assert_eq!(json["of"]["of"][0], "struct");
        assert_eq!(json["of"]["of"][1], "Point");

        let yaml = serde_yaml::to_string(&ty).unwrap();
        assert_eq!(serde_yaml::from_str::<TypeExpr>(&yaml).unwrap(), ty);
    }
}
