//! Schema assembly
//!
//! [`SchemaBuilder`] registers every declaration as a named definition and
//! resolves them all as one composite. Declarations that reference each other
//! by type are fine; a declaration that structurally embeds another (a union
//! shape given as a reference) shares the registry entry, so it is built once
//! no matter how many unions list it.

use crate::decl::{DeclKind, DeclScaffold, Declaration, SchemaValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trellis_core::{
    Builder, Definitions, Error, LookupError, Producer, RefKey, Registry, Resolver,
    ResolverConfig, Result, Scaffold, Spec,
};

/// Immutable set of declarations, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    declarations: IndexMap<String, Declaration>,
}

impl Schema {
    /// Index declarations and check every type reference
    ///
    /// # Errors
    /// - [`Error::InvalidValue`] if two declarations share a name
    /// - [`LookupError::Undefined`] for a reference to a missing name, or to
    ///   a name declared with another kind
    pub fn from_declarations(declarations: impl IntoIterator<Item = Declaration>) -> Result<Self> {
        let mut indexed = IndexMap::new();
        for decl in declarations {
            let name = decl.name().to_string();
            if indexed.contains_key(&name) {
                return Err(Error::invalid_value(
                    "declarations",
                    format!("{name} is declared more than once"),
                ));
            }
            indexed.insert(name, decl);
        }

        let schema = Self {
            declarations: indexed,
        };
        schema.check_references()?;
        Ok(schema)
    }

    fn check_references(&self) -> Result<()> {
        for decl in self.declarations.values() {
            for ty in decl.field_types() {
                let Some((kind, name)) = ty.referenced() else {
                    continue;
                };
                let found = self.declarations.get(name).map(Declaration::kind);
                if found != Some(kind) {
                    return Err(LookupError::undefined(RefKey::new(kind, name)).into());
                }
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Collects named declaration specs into a resolvable schema
pub struct SchemaBuilder {
    definitions: Definitions<DeclKind, SchemaValue>,
    order: Vec<RefKey<DeclKind>>,
    config: ResolverConfig,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: Definitions::new(),
            order: Vec::new(),
            config: ResolverConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare `name` with a deferred producer
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDefinition`] if `(kind, name)` is taken.
    pub fn declare(
        &mut self,
        kind: DeclKind,
        name: &str,
        producer: Producer<DeclKind, SchemaValue>,
    ) -> Result<&mut Self> {
        let key = RefKey::new(kind, name);
        self.definitions.define(key.clone(), producer)?;
        self.order.push(key);
        Ok(self)
    }

    /// Declare `name` as `spec` applied to `context`, built on first use
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDefinition`] if `(kind, name)` is taken.
    pub fn declare_spec<C, S>(
        &mut self,
        kind: DeclKind,
        name: &str,
        context: Arc<C>,
        spec: Arc<S>,
    ) -> Result<&mut Self>
    where
        C: Send + Sync + ?Sized + 'static,
        S: Spec<C> + Send + Sync + ?Sized + 'static,
        S::Builder: Builder<Output = DeclScaffold>,
    {
        self.declare(kind, name, Producer::from_spec(context, spec))
    }

    /// Declare an already-built declaration under its own kind and name
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDefinition`] if the name is taken.
    pub fn declare_value(&mut self, decl: Declaration) -> Result<&mut Self> {
        let kind = decl.kind();
        let name = decl.name().to_string();
        let value = SchemaValue::Decl(Arc::new(decl));
        self.declare(
            kind,
            &name,
            Producer::new(move || Ok(Scaffold::value(value.clone()))),
        )
    }

    /// Number of declarations so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Split into the root scaffold and the definitions it resolves through
    #[must_use]
    pub fn into_parts(self) -> (DeclScaffold, Definitions<DeclKind, SchemaValue>, ResolverConfig) {
        let roots: Vec<DeclScaffold> = self.order.into_iter().map(Scaffold::reference).collect();
        let scaffold = Scaffold::composite(roots, |values| {
            let declarations = values
                .into_iter()
                .map(|value| value.into_decl().map(|decl| decl.as_ref().clone()))
                .collect::<Result<Vec<_>>>()?;
            let schema = Schema::from_declarations(declarations)?;
            Ok(SchemaValue::Schema(Arc::new(schema)))
        });
        (scaffold, self.definitions, self.config)
    }

    /// Resolve every declaration against `registry`
    ///
    /// # Errors
    /// Builder, lookup and assembly errors from any declaration.
    pub async fn resolve(
        self,
        registry: Arc<dyn Registry<DeclKind, SchemaValue>>,
    ) -> Result<Arc<Schema>> {
        let (scaffold, definitions, config) = self.into_parts();
        let schema = Resolver::new(registry)
            .with_definitions(definitions)
            .with_config(config)
            .resolve(scaffold)
            .await?
            .into_schema()?;
        tracing::info!("Resolved schema with {} declarations", schema.len());
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{EnumDecl, StructDecl};
    use crate::types::{Field, Primitive, TypeExpr};

    fn node() -> Declaration {
        Declaration::Struct(StructDecl {
            name: "Node".into(),
            fields: vec![
                Field::new("value", Primitive::Int),
                Field::new(
                    "children",
                    TypeExpr::list(TypeExpr::reference(DeclKind::Struct, "Node")),
                ),
            ],
        })
    }

    #[test]
    fn self_referencing_type_is_valid() {
        let schema = Schema::from_declarations([node()]).unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("Node").map(Declaration::kind), Some(DeclKind::Struct));
    }

    #[test]
    fn reference_kind_must_match() {
        let color = Declaration::Enum(EnumDecl {
            name: "Color".into(),
            values: vec!["red".into()],
        });
        let pen = Declaration::Struct(StructDecl {
            name: "Pen".into(),
            fields: vec![Field::new("ink", TypeExpr::reference(DeclKind::Struct, "Color"))],
        });

        let err = Schema::from_declarations([color, pen]).unwrap_err();
        assert_eq!(err, Error::Lookup(LookupError::undefined("struct/Color")));
    }

    #[test]
    fn duplicate_names_across_kinds_rejected() {
        let shadow = Declaration::Enum(EnumDecl {
            name: "Node".into(),
            values: Vec::new(),
        });
        assert!(matches!(
            Schema::from_declarations([node(), shadow]),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn builder_rejects_duplicate_key() {
        let mut builder = SchemaBuilder::new();
        builder.declare_value(node()).unwrap();
        assert!(matches!(
            builder.declare_value(node()),
            Err(Error::DuplicateDefinition { .. })
        ));
        assert_eq!(builder.len(), 1);
    }
}
