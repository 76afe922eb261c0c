//! Declarations and their builders
//!
//! Builders accept anything through their setters and report problems
//! (missing name, repeated member) once, from `build()`.

use crate::types::{Field, TypeExpr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use trellis_core::{Builder, Error, Required, Result, Scaffold, ScaffoldKind};

/// Declaration kinds; the registry's key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Struct,
    Union,
    Enum,
}

impl ScaffoldKind for DeclKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionDecl {
    pub name: String,
    pub shapes: Vec<StructDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<String>,
}

/// One named type of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    Struct(StructDecl),
    Union(UnionDecl),
    Enum(EnumDecl),
}

impl Declaration {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(decl) => &decl.name,
            Self::Union(decl) => &decl.name,
            Self::Enum(decl) => &decl.name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeclKind {
        match self {
            Self::Struct(_) => DeclKind::Struct,
            Self::Union(_) => DeclKind::Union,
            Self::Enum(_) => DeclKind::Enum,
        }
    }

    /// Every field type mentioned, union shapes included
    pub fn field_types(&self) -> Box<dyn Iterator<Item = &TypeExpr> + '_> {
        match self {
            Self::Struct(decl) => Box::new(decl.fields.iter().map(|f| &f.ty)),
            Self::Union(decl) => Box::new(
                decl.shapes
                    .iter()
                    .flat_map(|shape| shape.fields.iter().map(|f| &f.ty)),
            ),
            Self::Enum(_) => Box::new(std::iter::empty()),
        }
    }
}

/// Resolved value flowing through schema scaffolds
#[derive(Debug, Clone)]
pub enum SchemaValue {
    Decl(Arc<Declaration>),
    Schema(Arc<crate::schema::Schema>),
}

impl SchemaValue {
    /// Unwrap a declaration
    ///
    /// # Errors
    /// Returns an assembly error for a whole schema.
    pub fn into_decl(self) -> Result<Arc<Declaration>> {
        match self {
            Self::Decl(decl) => Ok(decl),
            Self::Schema(_) => Err(Error::assembly("expected a declaration, found a schema")),
        }
    }

    /// Unwrap a schema
    ///
    /// # Errors
    /// Returns an assembly error for a single declaration.
    pub fn into_schema(self) -> Result<Arc<crate::schema::Schema>> {
        match self {
            Self::Schema(schema) => Ok(schema),
            Self::Decl(decl) => Err(Error::assembly(format!(
                "expected a schema, found declaration {}",
                decl.name()
            ))),
        }
    }
}

pub type DeclScaffold = Scaffold<DeclKind, SchemaValue>;

/// First name seen twice, in insertion order
fn first_duplicate<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

fn declared(decl: Declaration) -> DeclScaffold {
    Scaffold::value(SchemaValue::Decl(Arc::new(decl)))
}

pub struct StructBuilder {
    pub name: Required<String>,
    fields: Vec<Field>,
}

impl Default for StructBuilder {
    fn default() -> Self {
        Self {
            name: Required::new("name"),
            fields: Vec::new(),
        }
    }
}

impl StructBuilder {
    pub fn field(&mut self, name: impl Into<String>, ty: impl Into<TypeExpr>) -> &mut Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    /// Validate into a bare declaration
    ///
    /// # Errors
    /// Missing name, or a field name used twice.
    pub fn finish(self) -> Result<StructDecl> {
        let name = self.name.take("StructBuilder")?;
        if let Some(dup) = first_duplicate(self.fields.iter().map(|f| f.name.as_str())) {
            return Err(Error::invalid_value(
                "fields",
                format!("duplicate field `{dup}` in struct {name}"),
            ));
        }
        Ok(StructDecl {
            name,
            fields: self.fields,
        })
    }
}

impl Builder for StructBuilder {
    type Output = DeclScaffold;

    fn build(self) -> Result<DeclScaffold> {
        Ok(declared(Declaration::Struct(self.finish()?)))
    }
}

/// Union of struct shapes
///
/// Shapes are scaffolds: inline struct declarations or references to
/// structs declared elsewhere in the schema.
pub struct UnionBuilder {
    pub name: Required<String>,
    shapes: Vec<DeclScaffold>,
}

impl Default for UnionBuilder {
    fn default() -> Self {
        Self {
            name: Required::new("name"),
            shapes: Vec::new(),
        }
    }
}

impl UnionBuilder {
    pub fn shape(&mut self, shape: DeclScaffold) -> &mut Self {
        self.shapes.push(shape);
        self
    }
}

impl Builder for UnionBuilder {
    type Output = DeclScaffold;

    fn build(self) -> Result<DeclScaffold> {
        let name = self.name.take("UnionBuilder")?;
        Ok(Scaffold::composite(self.shapes, move |resolved| {
            let shapes = resolved
                .into_iter()
                .map(|value| match value.into_decl()?.as_ref() {
                    Declaration::Struct(shape) => Ok(shape.clone()),
                    other => Err(Error::invalid_value(
                        "shapes",
                        format!("union {name} lists non-struct {}", other.name()),
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            if let Some(dup) = first_duplicate(shapes.iter().map(|s| s.name.as_str())) {
                return Err(Error::invalid_value(
                    "shapes",
                    format!("duplicate shape `{dup}` in union {name}"),
                ));
            }
            Ok(SchemaValue::Decl(Arc::new(Declaration::Union(UnionDecl {
                name,
                shapes,
            }))))
        }))
    }
}

pub struct EnumBuilder {
    pub name: Required<String>,
    values: Vec<String>,
}

impl Default for EnumBuilder {
    fn default() -> Self {
        Self {
            name: Required::new("name"),
            values: Vec::new(),
        }
    }
}

impl EnumBuilder {
    pub fn value(&mut self, value: impl Into<String>) -> &mut Self {
        self.values.push(value.into());
        self
    }
}

impl Builder for EnumBuilder {
    type Output = DeclScaffold;

    fn build(self) -> Result<DeclScaffold> {
        let name = self.name.take("EnumBuilder")?;
        if let Some(dup) = first_duplicate(self.values.iter().map(String::as_str)) {
            return Err(Error::invalid_value(
                "values",
                format!("duplicate value `{dup}` in enum {name}"),
            ));
        }
        Ok(declared(Declaration::Enum(EnumDecl {
            name,
            values: self.values,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    fn decl(scaffold: DeclScaffold) -> Arc<Declaration> {
        scaffold.resolve_local().unwrap().into_decl().unwrap()
    }

    #[test]
    fn struct_keeps_field_order() {
        let mut b = StructBuilder::default();
        b.name.set("Point".into());
        b.field("x", Primitive::Float).field("y", Primitive::Float);
        let point = decl(b.build().unwrap());

        let Declaration::Struct(point) = point.as_ref() else {
            unreachable!()
        };
        let names: Vec<&str> = point.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn struct_rejects_duplicate_field() {
        let mut b = StructBuilder::default();
        b.name.set("Point".into());
        b.field("x", Primitive::Float).field("x", Primitive::Int);
        assert!(matches!(b.build(), Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn unnamed_enum_fails() {
        let mut b = EnumBuilder::default();
        b.value("red");
        assert!(matches!(
            b.build(),
            Err(Error::MissingField {
                builder: "EnumBuilder",
                field: "name"
            })
        ));
    }

    #[test]
    fn enum_rejects_duplicate_value() {
        let mut b = EnumBuilder::default();
        b.name.set("Color".into());
        b.value("red").value("green").value("red");
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("duplicate value `red`"));
    }

    #[test]
    fn union_collects_inline_shapes() {
        let mut circle = StructBuilder::default();
        circle.name.set("Circle".into());
        circle.field("radius", Primitive::Float);

        let mut b = UnionBuilder::default();
        b.name.set("Shape".into());
        b.shape(circle.build().unwrap());
        let shape = decl(b.build().unwrap());

        assert_eq!(shape.kind(), DeclKind::Union);
        assert_eq!(shape.field_types().count(), 1);
    }

    #[test]
    fn union_rejects_enum_shape() {
        let mut color = EnumBuilder::default();
        color.name.set("Color".into());

        let mut b = UnionBuilder::default();
        b.name.set("Bad".into());
        b.shape(color.build().unwrap());
        assert!(b.build().unwrap().resolve_local().is_err());
    }
}
