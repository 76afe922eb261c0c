//! Scaffold data model
//!
//! A [`Scaffold`] is the structural result of applying a spec: either an
//! already-known value, a named reference into the registry, or a composite
//! of child scaffolds plus an assembly function.
//!
//! Scaffolds are consumed exactly once by resolution. Anything that must be
//! produced more than once (a definition shared by many references) is held
//! as a [`Producer`], which yields a fresh scaffold per call.

use crate::error::{Error, Result};
use crate::key::{RefKey, ScaffoldKind};
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Assembly function of a composite
pub type Assemble<V> = Box<dyn FnOnce(Vec<V>) -> Result<V> + Send + 'static>;

type ProduceFn<K, V> = dyn Fn() -> BoxFuture<'static, Result<Scaffold<K, V>>> + Send + Sync;

/// Deferred producer for the scaffold behind a key
///
/// Cheap to clone. Invoked at most once per key per registry.
pub struct Producer<K, V> {
    produce: Arc<ProduceFn<K, V>>,
}

impl<K, V> Producer<K, V>
where
    K: ScaffoldKind,
    V: Send + 'static,
{
    /// Create producer from a synchronous function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Scaffold<K, V>> + Send + Sync + 'static,
    {
        Self {
            produce: Arc::new(move || future::ready(f()).boxed()),
        }
    }

    /// Create producer from an asynchronous function
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Scaffold<K, V>>> + Send + 'static,
    {
        Self {
            produce: Arc::new(move || f().boxed()),
        }
    }

    /// Run the producer
    #[inline]
    pub fn produce(&self) -> BoxFuture<'static, Result<Scaffold<K, V>>> {
        (self.produce)()
    }
}

impl<K, V> Clone for Producer<K, V> {
    fn clone(&self) -> Self {
        Self {
            produce: Arc::clone(&self.produce),
        }
    }
}

impl<K, V> fmt::Debug for Producer<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Producer(..)")
    }
}

/// Named pointer into the registry
#[derive(Debug)]
pub struct Reference<K, V> {
    /// Registry key
    pub key: RefKey<K>,
    /// Inline producer; when absent the resolver's definitions are consulted
    pub producer: Option<Producer<K, V>>,
}

/// Children plus assembly function
pub struct Composite<K, V> {
    /// Ordered children
    pub children: Vec<Scaffold<K, V>>,
    /// Runs once all children are resolved, in declaration order
    pub assemble: Assemble<V>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Composite<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Intermediate representation of a value prior to resolution
#[derive(Debug)]
pub enum Scaffold<K, V> {
    /// Already resolved
    Value(V),
    /// Fetch-or-create through the registry
    Ref(Reference<K, V>),
    /// Resolve children, then assemble
    Composite(Composite<K, V>),
}

impl<K, V> Scaffold<K, V>
where
    K: ScaffoldKind,
    V: Send + 'static,
{
    /// Known value
    #[inline]
    #[must_use]
    pub fn value(value: V) -> Self {
        Self::Value(value)
    }

    /// Reference resolved through the resolver's definitions
    #[inline]
    #[must_use]
    pub fn reference(key: RefKey<K>) -> Self {
        Self::Ref(Reference {
            key,
            producer: None,
        })
    }

    /// Reference carrying its own deferred producer
    #[inline]
    #[must_use]
    pub fn deferred(key: RefKey<K>, producer: Producer<K, V>) -> Self {
        Self::Ref(Reference {
            key,
            producer: Some(producer),
        })
    }

    /// Composite of `children`
    pub fn composite<F>(children: Vec<Scaffold<K, V>>, assemble: F) -> Self
    where
        F: FnOnce(Vec<V>) -> Result<V> + Send + 'static,
    {
        Self::Composite(Composite {
            children,
            assemble: Box::new(assemble),
        })
    }

    /// Post-process the resolved value
    ///
    /// Lazy: `f` runs only after this scaffold resolves, and its error is
    /// the error of the mapped scaffold.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(V) -> Result<V> + Send + 'static,
    {
        Self::composite(vec![self], move |mut values| {
            let value = values
                .pop()
                .ok_or_else(|| Error::assembly("mapped scaffold resolved to nothing"))?;
            f(value)
        })
    }

    /// Check if this is a plain value
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Number of reference nodes in this tree (producers not expanded)
    #[must_use]
    pub fn ref_count(&self) -> usize {
        match self {
            Self::Value(_) => 0,
            Self::Ref(_) => 1,
            Self::Composite(composite) => {
                composite.children.iter().map(Scaffold::ref_count).sum()
            }
        }
    }

    /// Resolve synchronously without a registry
    ///
    /// # Errors
    /// - [`Error::UnresolvedReference`] on the first reference node
    /// - Any error returned by an assembly function
    pub fn resolve_local(self) -> Result<V> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Ref(reference) => Err(Error::UnresolvedReference {
                key: reference.key.to_string(),
            }),
            Self::Composite(Composite { children, assemble }) => {
                let values = children
                    .into_iter()
                    .map(Scaffold::resolve_local)
                    .collect::<Result<Vec<_>>>()?;
                assemble(values)
            }
        }
    }
}
