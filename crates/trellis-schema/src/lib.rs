//! Trellis Schema - type declarations built on the Trellis engine
//!
//! Declares structs, unions and enums with builders, resolves them through
//! the shared registry into an immutable [`Schema`], and hands the schema to
//! serialization or emission backends.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_core::{spec_fn, SharedRegistry};
//! use trellis_schema::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let point = spec_fn(|_: &(), b: &mut StructBuilder| {
//!     b.name.set("Point".to_string());
//!     b.field("x", Primitive::Float).field("y", Primitive::Float);
//!     Ok(())
//! });
//!
//! let mut schema = SchemaBuilder::new();
//! schema.declare_spec(DeclKind::Struct, "Point", Arc::new(()), Arc::new(point))?;
//!
//! let registry = Arc::new(SharedRegistry::<DeclKind, SchemaValue>::new());
//! let schema = schema.resolve(registry).await?;
//! assert_eq!(schema.names().collect::<Vec<_>>(), ["Point"]);
//!
//! let json = JsonBackend.render(&schema)?;
//! assert!(json.contains("\"Point\""));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod decl;
pub mod error;
pub mod schema;
pub mod types;

// Re-exports for convenience
pub use backend::{EmissionBackend, JsonBackend, SerializationBackend, YamlBackend};
pub use decl::{
    DeclKind, DeclScaffold, Declaration, EnumBuilder, EnumDecl, SchemaValue, StructBuilder,
    StructDecl, UnionBuilder, UnionDecl,
};
pub use error::EmitError;
pub use schema::{Schema, SchemaBuilder};
pub use types::{Field, Primitive, TypeExpr};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring and emitting schemas
    pub use crate::{
        DeclKind, Declaration, EmissionBackend, EnumBuilder, JsonBackend, Primitive, Schema,
        SchemaBuilder, SchemaValue, SerializationBackend, StructBuilder, TypeExpr, UnionBuilder,
        YamlBackend,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
