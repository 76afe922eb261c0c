//! Trellis Core - declarative construction engine
//!
//! Describes values with reusable specs, gathers them into scaffolds and
//! resolves scaffolds concurrently against a shared reference registry:
//! - [`Spec`]: reusable description applied to a context
//! - [`Builder`]: mutable accumulator with required/optional fields
//! - [`Scaffold`]: value, named reference, or composite awaiting assembly
//! - [`Registry`]: at-most-once memoization table for references
//! - [`Resolver`]: concurrent resolution with cycle detection
//! - [`Translator`]: composable pure mappings between representations
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_core::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Shape {
//!     Side,
//! }
//!
//! impl ScaffoldKind for Shape {
//!     fn as_str(&self) -> &'static str {
//!         "side"
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let side = RefKey::new(Shape::Side, "unit");
//! let producer = Producer::new(|| Ok(Scaffold::value(3_u32)));
//! let perimeter = Scaffold::composite(
//!     (0..4)
//!         .map(|_| Scaffold::deferred(side.clone(), producer.clone()))
//!         .collect(),
//!     |sides| Ok(sides.into_iter().sum()),
//! );
//!
//! let registry: Arc<dyn Registry<Shape, u32>> = Arc::new(SharedRegistry::<Shape, u32>::new());
//! assert_eq!(resolve(perimeter, registry).await?, 12);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builder;
pub mod config;
pub mod definitions;
pub mod error;
pub mod key;
pub mod registry;
pub mod resolver;
pub mod scaffold;
pub mod spec;
pub mod translator;

mod wait;

// Re-exports for convenience
pub use builder::{Builder, Optional, Required};
pub use config::{Concurrency, ResolverConfig};
pub use definitions::Definitions;
pub use error::{Error, LookupError, Result};
pub use key::{RefKey, ScaffoldKind};
pub use registry::{
    Claim, CoordinatedRegistry, Pending, Registry, Reservation, SharedRegistry, Waits,
};
pub use resolver::{resolve, Resolver};
pub use scaffold::{Assemble, Composite, Producer, Reference, Scaffold};
pub use spec::{apply, build, spec_fn, translate, FnSpec, Mapped, MappedBuilder, Spec, SpecExt};
pub use translator::{identity, Identity, Pipeline, Translator, TranslatorExt};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing specs and resolving scaffolds
    pub use crate::{
        resolve, spec_fn, translate, Builder, Concurrency, CoordinatedRegistry, Definitions,
        Error, LookupError, Optional, Producer, RefKey, Registry, Required, Resolver,
        ResolverConfig, Result, Scaffold, ScaffoldKind, SharedRegistry, Spec, SpecExt,
        Translator, TranslatorExt,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
