//! Producer definitions
//!
//! Maps registry keys to the deferred producers a bare
//! [`Scaffold::reference`](crate::Scaffold::reference) resolves through.

use crate::error::{Error, Result};
use crate::key::{RefKey, ScaffoldKind};
use crate::scaffold::{Producer, Scaffold};
use std::collections::HashMap;

/// Table of `key -> producer`
///
/// Built up front and then shared read-only by a resolver.
#[derive(Debug)]
pub struct Definitions<K, V> {
    producers: HashMap<RefKey<K>, Producer<K, V>>,
}

impl<K, V> Definitions<K, V>
where
    K: ScaffoldKind,
    V: Send + 'static,
{
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            producers: HashMap::new(),
        }
    }

    /// Register producer for `key`
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDefinition`] if `key` already has a producer.
    pub fn define(&mut self, key: RefKey<K>, producer: Producer<K, V>) -> Result<()> {
        if self.producers.contains_key(&key) {
            return Err(Error::DuplicateDefinition {
                key: key.to_string(),
            });
        }
        self.producers.insert(key, producer);
        Ok(())
    }

    /// Register a synchronous producer for `key`
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDefinition`] if `key` already has a producer.
    pub fn define_with<F>(&mut self, key: RefKey<K>, f: F) -> Result<()>
    where
        F: Fn() -> Result<Scaffold<K, V>> + Send + Sync + 'static,
    {
        self.define(key, Producer::new(f))
    }

    /// Get producer for `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &RefKey<K>) -> Option<&Producer<K, V>> {
        self.producers.get(key)
    }

    /// Check if `key` is defined
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &RefKey<K>) -> bool {
        self.producers.contains_key(key)
    }

    /// Number of definitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Iterate over defined keys
    pub fn keys(&self) -> impl Iterator<Item = &RefKey<K>> {
        self.producers.keys()
    }
}

impl<K, V> Default for Definitions<K, V>
where
    K: ScaffoldKind,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
