//! Shared-map registry
//!
//! Guards the table with per-shard mutual exclusion via DashMap. Every
//! operation completes under one entry lock with no suspension point inside,
//! so a claim can never be split by cancellation.

use super::{Claim, Pending, Registry, Reservation, Slot, SlotStore, Waits};
use crate::error::{Error, Result};
use crate::key::{RefKey, ScaffoldKind};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Registry backed by a concurrent map
///
/// Cloning yields another handle on the same table.
pub struct SharedRegistry<K: ScaffoldKind, V> {
    inner: Arc<SharedInner<K, V>>,
}

struct SharedInner<K: ScaffoldKind, V> {
    slots: DashMap<RefKey<K>, Slot<V>>,
    closed: AtomicBool,
    waits: Waits<K>,
}

impl<K, V> SharedRegistry<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SharedInner {
                slots: DashMap::new(),
                closed: AtomicBool::new(false),
                waits: Waits::new(),
            }),
        }
    }

    /// Check if closed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::RegistryClosed);
        }
        Ok(())
    }
}

impl<K, V> SlotStore<K, V> for SharedInner<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    fn settle(&self, key: &RefKey<K>, outcome: Option<V>) -> Result<()> {
        match outcome {
            Some(value) => {
                if self.closed.load(Ordering::Acquire) {
                    return Err(Error::RegistryClosed);
                }
                self.slots.insert(key.clone(), Slot::Ready(value));
            }
            None => {
                self.slots
                    .remove_if(key, |_, slot| matches!(slot, Slot::Pending(_)));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<K, V> Registry<K, V> for SharedRegistry<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &RefKey<K>) -> Result<Option<V>> {
        self.ensure_open()?;
        Ok(self
            .inner
            .slots
            .get(key)
            .and_then(|slot| slot.ready().cloned()))
    }

    async fn put(&self, key: RefKey<K>, value: V) -> Result<()> {
        self.ensure_open()?;
        match self.inner.slots.entry(key) {
            Entry::Occupied(entry) => Err(Error::DuplicateEntry {
                key: entry.key().to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(Slot::Ready(value));
                Ok(())
            }
        }
    }

    async fn claim(&self, key: &RefKey<K>) -> Result<Claim<K, V>> {
        self.ensure_open()?;
        let claim = match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(value) => Claim::Ready(value.clone()),
                Slot::Pending(progress) => Claim::Wait(Pending::new(key, progress.clone())),
            },
            Entry::Vacant(entry) => {
                let (progress, slot) = Slot::pending();
                entry.insert(slot);
                let store: Arc<dyn SlotStore<K, V>> = self.inner.clone();
                Claim::Produce(Reservation::new(key.clone(), progress, store))
            }
        };
        Ok(claim)
    }

    async fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self
            .inner
            .slots
            .iter()
            .filter(|entry| entry.value().ready().is_some())
            .count())
    }

    async fn close(&self) -> Result<()> {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Closing shared registry with {} slots", self.inner.slots.len());
            self.inner.slots.clear();
        }
        Ok(())
    }

    fn waits(&self) -> &Waits<K> {
        &self.inner.waits
    }

    fn name(&self) -> &'static str {
        "shared"
    }
}

impl<K: ScaffoldKind, V> Clone for SharedRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for SharedRegistry<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ScaffoldKind, V> fmt::Debug for SharedRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("slots", &self.inner.slots.len())
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}
