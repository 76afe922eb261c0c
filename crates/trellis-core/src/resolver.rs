//! Scaffold resolution
//!
//! Walks a scaffold tree against a [`Registry`]:
//!
//! - values resolve to themselves
//! - composites resolve every child concurrently, then assemble the results
//!   in declaration order
//! - references claim their key; the first claimer runs the producer and
//!   publishes, everyone else receives or awaits the published value
//!
//! Any failure cancels the sibling work still in flight and becomes the
//! error of the whole resolution. Self-referential definitions fail with
//! [`LookupError::Cycle`] instead of waiting on themselves forever.

use crate::builder::Builder;
use crate::config::{Concurrency, ResolverConfig};
use crate::definitions::Definitions;
use crate::error::{Error, LookupError, Result};
use crate::key::ScaffoldKind;
use crate::registry::{Claim, Registry};
use crate::scaffold::{Composite, Reference, Scaffold};
use crate::spec::{self, Spec};
use crate::wait::{self, Chain};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Resolves scaffolds against a registry
///
/// Cheap to clone; clones share the registry and definitions. Cycle
/// bookkeeping lives in the registry, so separate resolvers over one
/// registry also see each other's waits.
pub struct Resolver<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    registry: Arc<dyn Registry<K, V>>,
    definitions: Arc<Definitions<K, V>>,
    config: ResolverConfig,
}

impl<K, V> Resolver<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    /// Create resolver with no definitions and default configuration
    #[must_use]
    pub fn new(registry: Arc<dyn Registry<K, V>>) -> Self {
        Self {
            registry,
            definitions: Arc::new(Definitions::new()),
            config: ResolverConfig::default(),
        }
    }

    /// With producers for references that carry none
    #[must_use]
    pub fn with_definitions(mut self, definitions: Definitions<K, V>) -> Self {
        self.definitions = Arc::new(definitions);
        self
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Get registry
    #[inline]
    pub fn registry(&self) -> &Arc<dyn Registry<K, V>> {
        &self.registry
    }

    /// Get definitions
    #[inline]
    pub fn definitions(&self) -> &Definitions<K, V> {
        &self.definitions
    }

    /// Get configuration
    #[inline]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `scaffold` to its final value
    ///
    /// # Errors
    /// - [`Error::Lookup`] for undefined or cyclic references
    /// - [`Error::DepthExceeded`] past the configured nesting limit
    /// - the first builder, producer or assembly error encountered
    pub async fn resolve(&self, scaffold: Scaffold<K, V>) -> Result<V> {
        tracing::debug!(
            "Resolving scaffold with {} references via {} registry",
            scaffold.ref_count(),
            self.registry.name()
        );

        let result = self.clone().resolve_node(scaffold, Chain::new(), 0).await;
        match &result {
            Ok(_) => tracing::debug!("Resolution complete"),
            Err(e) => tracing::warn!("Resolution failed: {}", e),
        }
        result
    }

    /// Apply `spec` to `context`, build it and resolve the scaffold
    ///
    /// # Errors
    /// Body and builder errors, then anything [`Resolver::resolve`] returns.
    pub async fn resolve_spec<C, S>(&self, context: &C, spec: &S) -> Result<V>
    where
        C: ?Sized,
        S: Spec<C> + ?Sized,
        S::Builder: Builder<Output = Scaffold<K, V>>,
    {
        let scaffold = spec::build(context, spec)?;
        self.resolve(scaffold).await
    }

    fn resolve_node(
        self,
        scaffold: Scaffold<K, V>,
        chain: Chain<K>,
        depth: usize,
    ) -> BoxFuture<'static, Result<V>> {
        async move {
            if depth > self.config.max_depth {
                return Err(Error::DepthExceeded {
                    limit: self.config.max_depth,
                });
            }
            match scaffold {
                Scaffold::Value(value) => Ok(value),
                Scaffold::Ref(reference) => self.resolve_reference(reference, chain, depth).await,
                Scaffold::Composite(composite) => {
                    self.resolve_composite(composite, chain, depth).await
                }
            }
        }
        .boxed()
    }

    async fn resolve_reference(
        self,
        reference: Reference<K, V>,
        chain: Chain<K>,
        depth: usize,
    ) -> Result<V> {
        let Reference { key, producer } = reference;

        if let Some(cycle) = wait::self_cycle(&chain, &key) {
            return Err(cycle.into());
        }

        let producer = producer.or_else(|| self.definitions.get(&key).cloned());
        loop {
            match self.registry.claim(&key).await? {
                Claim::Ready(value) => {
                    tracing::trace!("Registry hit for {}", key);
                    return Ok(value);
                }
                Claim::Produce(reservation) => {
                    // Dropping the reservation on any early return wakes waiters
                    let Some(producer) = producer else {
                        return Err(LookupError::undefined(&key).into());
                    };

                    tracing::debug!("Producing {}", key);
                    let scaffold = producer.produce().await?;
                    let mut inner = chain;
                    inner.push_back(key.clone());
                    let value = self.clone().resolve_node(scaffold, inner, depth + 1).await?;
                    return reservation.fulfill(value);
                }
                Claim::Wait(pending) => {
                    let outcome = {
                        let _ticket = self.registry.waits().enter(&chain, &key)?;
                        tracing::trace!("Waiting on {}", key);
                        pending.wait().await
                    };
                    match outcome {
                        // The slot is already withdrawn; produce it ourselves
                        Err(Error::Abandoned { .. }) if producer.is_some() => {
                            tracing::debug!("Producer of {} abandoned it, claiming again", key);
                        }
                        outcome => return outcome,
                    }
                }
            }
        }
    }

    async fn resolve_composite(
        self,
        composite: Composite<K, V>,
        chain: Chain<K>,
        depth: usize,
    ) -> Result<V> {
        let Composite { children, assemble } = composite;
        let values = match self.config.concurrency {
            Concurrency::Spawned => self.resolve_spawned(children, &chain, depth).await?,
            Concurrency::Inline => self.resolve_inline(children, &chain, depth).await?,
        };
        assemble(values)
    }

    /// One tokio task per unresolved child; the first error aborts the rest
    async fn resolve_spawned(
        &self,
        children: Vec<Scaffold<K, V>>,
        chain: &Chain<K>,
        depth: usize,
    ) -> Result<Vec<V>> {
        let mut gathered = Gathered::with_capacity(children.len());
        let mut tasks = JoinSet::new();

        for (index, child) in children.into_iter().enumerate() {
            match child {
                Scaffold::Value(value) => gathered.push(Some(value)),
                child => {
                    gathered.push(None);
                    let resolver = self.clone();
                    let chain = chain.clone();
                    tasks.spawn(async move {
                        (index, resolver.resolve_node(child, chain, depth + 1).await)
                    });
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined?;
            if let Err(e) = gathered.record(index, result) {
                tasks.abort_all();
                return Err(e);
            }
        }
        gathered.finish()
    }

    /// Children as futures polled on the current task
    async fn resolve_inline(
        &self,
        children: Vec<Scaffold<K, V>>,
        chain: &Chain<K>,
        depth: usize,
    ) -> Result<Vec<V>> {
        let mut gathered = Gathered::with_capacity(children.len());
        let mut pending: FuturesUnordered<_> = children
            .into_iter()
            .enumerate()
            .map(|(index, child)| {
                gathered.push(None);
                self.clone()
                    .resolve_node(child, chain.clone(), depth + 1)
                    .map(move |result| (index, result))
            })
            .collect();

        while let Some((index, result)) = pending.next().await {
            gathered.record(index, result)?;
        }
        gathered.finish()
    }
}

/// Child results collected back into declaration order
///
/// [`Error::Abandoned`] only ever echoes a failure elsewhere, so it is held
/// back while siblings may still report that failure itself.
struct Gathered<V> {
    slots: Vec<Option<V>>,
    abandoned: Option<Error>,
}

impl<V> Gathered<V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            abandoned: None,
        }
    }

    fn push(&mut self, slot: Option<V>) {
        self.slots.push(slot);
    }

    /// Store one child's outcome; errors that end the composite are returned
    fn record(&mut self, index: usize, result: Result<V>) -> Result<()> {
        match result {
            Ok(value) => {
                self.slots[index] = Some(value);
                Ok(())
            }
            Err(e @ Error::Abandoned { .. }) => {
                self.abandoned.get_or_insert(e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn finish(self) -> Result<Vec<V>> {
        if let Some(e) = self.abandoned {
            return Err(e);
        }
        self.slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::assembly("child resolution produced no value"))
    }
}

impl<K, V> Clone for Resolver<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            definitions: Arc::clone(&self.definitions),
            config: self.config,
        }
    }
}

impl<K, V> fmt::Debug for Resolver<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry.name())
            .field("definitions", &self.definitions.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Resolve `scaffold` against `registry` with default configuration
///
/// # Errors
/// See [`Resolver::resolve`].
pub async fn resolve<K, V>(scaffold: Scaffold<K, V>, registry: Arc<dyn Registry<K, V>>) -> Result<V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    Resolver::new(registry).resolve(scaffold).await
}
