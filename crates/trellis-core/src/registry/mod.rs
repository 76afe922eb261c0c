//! Reference registry
//!
//! Concurrency-safe memoization table mapping `(kind, name)` to a resolved
//! value, guaranteeing at most one construction per key.
//!
//! # Claim protocol
//!
//! Resolution never calls `get` and `put` back to back (that would race).
//! It calls [`Registry::claim`] instead, which atomically answers one of:
//!
//! - [`Claim::Ready`]: the value exists
//! - [`Claim::Produce`]: the caller is now the only producer for the key and
//!   holds a [`Reservation`]
//! - [`Claim::Wait`]: another task is producing; await the [`Pending`] handle
//!
//! A reservation dropped without [`Reservation::fulfill`] (producer error or
//! task cancellation) withdraws the pending slot and wakes every waiter with
//! [`Error::Abandoned`]. Partially constructed entries are never visible.
//! A waiter that holds a producer of its own claims the key again instead
//! of failing.
//!
//! Each registry also owns the [`Waits`] graph of which keys under
//! production are blocked on which, so cycles are caught across every
//! resolver sharing it.
//!
//! # Realizations
//!
//! - [`CoordinatedRegistry`]: one coordinator task owns the table; all
//!   traffic flows through one ordered channel
//! - [`SharedRegistry`]: a sharded concurrent map with per-entry locking

mod coordinated;
mod shared;

pub use coordinated::CoordinatedRegistry;
pub use shared::SharedRegistry;
pub use crate::wait::Waits;

use crate::error::{Error, Result};
use crate::key::{RefKey, ScaffoldKind};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Memoization table for resolved references
#[async_trait::async_trait]
pub trait Registry<K, V>: Send + Sync
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    /// Get resolved value for `key`
    ///
    /// Returns `None` while the key is absent or still being produced.
    async fn get(&self, key: &RefKey<K>) -> Result<Option<V>>;

    /// Insert value for an absent key
    ///
    /// # Errors
    /// Returns [`Error::DuplicateEntry`] if `key` is resolved or being
    /// produced. Entries are never overwritten.
    async fn put(&self, key: RefKey<K>, value: V) -> Result<()>;

    /// Atomically look up `key` or become its producer
    async fn claim(&self, key: &RefKey<K>) -> Result<Claim<K, V>>;

    /// Number of resolved entries
    async fn len(&self) -> Result<usize>;

    /// Release resources; later operations fail with [`Error::RegistryClosed`]
    async fn close(&self) -> Result<()>;

    /// Wait-for bookkeeping shared by every resolver using this registry
    fn waits(&self) -> &Waits<K>;

    /// Realization name for diagnostics
    fn name(&self) -> &'static str;
}

/// Outcome of [`Registry::claim`]
pub enum Claim<K, V> {
    /// Value already resolved
    Ready(V),
    /// Caller must produce the value
    Produce(Reservation<K, V>),
    /// Another task is producing the value
    Wait(Pending<V>),
}

impl<K, V> fmt::Debug for Claim<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Claim::Ready"),
            Self::Produce(_) => f.write_str("Claim::Produce"),
            Self::Wait(_) => f.write_str("Claim::Wait"),
        }
    }
}

/// State of an in-flight production, broadcast to waiters
#[derive(Debug, Clone)]
pub(crate) enum Progress<V> {
    Running,
    Done(V),
    Abandoned,
}

/// Table entry shared by both realizations
pub(crate) enum Slot<V> {
    Ready(V),
    Pending(watch::Receiver<Progress<V>>),
}

impl<V> Slot<V> {
    /// Fresh pending slot and the sender its producer publishes through
    pub(crate) fn pending() -> (watch::Sender<Progress<V>>, Self) {
        let (tx, rx) = watch::channel(Progress::Running);
        (tx, Self::Pending(rx))
    }

    /// Pending slot whose producer vanished without settling
    pub(crate) fn is_orphaned(&self) -> bool {
        match self {
            Self::Ready(_) => false,
            Self::Pending(rx) => {
                rx.has_changed().is_err() && matches!(*rx.borrow(), Progress::Running)
            }
        }
    }

    pub(crate) fn ready(&self) -> Option<&V> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }
}

/// Write side of a registry, used when a reservation settles
///
/// Synchronous so it can run from `Drop`.
pub(crate) trait SlotStore<K, V>: Send + Sync {
    /// `Some` publishes the value; `None` withdraws the pending slot
    fn settle(&self, key: &RefKey<K>, outcome: Option<V>) -> Result<()>;
}

/// Exclusive right to produce the value for one key
pub struct Reservation<K, V> {
    key: RefKey<K>,
    progress: watch::Sender<Progress<V>>,
    store: Arc<dyn SlotStore<K, V>>,
    settled: bool,
}

impl<K, V> Reservation<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        key: RefKey<K>,
        progress: watch::Sender<Progress<V>>,
        store: Arc<dyn SlotStore<K, V>>,
    ) -> Self {
        Self {
            key,
            progress,
            store,
            settled: false,
        }
    }

    /// Reserved key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &RefKey<K> {
        &self.key
    }

    /// Publish the produced value and wake waiters
    ///
    /// # Errors
    /// Returns [`Error::RegistryClosed`] if the registry shut down meanwhile;
    /// waiters then observe the key as abandoned.
    pub fn fulfill(mut self, value: V) -> Result<V> {
        self.settled = true;
        match self.store.settle(&self.key, Some(value.clone())) {
            Ok(()) => {
                self.progress.send_replace(Progress::Done(value.clone()));
                Ok(value)
            }
            Err(err) => {
                self.progress.send_replace(Progress::Abandoned);
                Err(err)
            }
        }
    }
}

impl<K, V> Drop for Reservation<K, V> {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.store.settle(&self.key, None);
            self.progress.send_replace(Progress::Abandoned);
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Reservation<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("key", &self.key)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}

/// Handle on a value another task is producing
#[derive(Debug)]
pub struct Pending<V> {
    key: String,
    progress: watch::Receiver<Progress<V>>,
}

impl<V: Clone> Pending<V> {
    pub(crate) fn new(key: impl ToString, progress: watch::Receiver<Progress<V>>) -> Self {
        Self {
            key: key.to_string(),
            progress,
        }
    }

    /// Rendered key being waited on
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the producer to publish
    ///
    /// # Errors
    /// Returns [`Error::Abandoned`] if the producer failed or was cancelled.
    pub async fn wait(mut self) -> Result<V> {
        let settled = self
            .progress
            .wait_for(|progress| !matches!(progress, Progress::Running))
            .await
            .map(|progress| progress.clone());
        let outcome = match settled {
            Ok(progress) => progress,
            Err(_) => self.progress.borrow().clone(),
        };
        match outcome {
            Progress::Done(value) => Ok(value),
            Progress::Running | Progress::Abandoned => Err(Error::Abandoned { key: self.key }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pending_slot_is_not_orphaned() {
        let (tx, slot) = Slot::<u8>::pending();
        assert!(!slot.is_orphaned());
        assert!(slot.ready().is_none());
        drop(tx);
        assert!(slot.is_orphaned());
    }

    #[test]
    fn settled_slot_is_not_orphaned() {
        let (tx, slot) = Slot::<u8>::pending();
        tx.send_replace(Progress::Done(3));
        drop(tx);
        assert!(!slot.is_orphaned());
        assert!(!Slot::Ready(1u8).is_orphaned());
    }

    #[tokio::test]
    async fn pending_sees_done() {
        let (tx, slot) = Slot::<u8>::pending();
        let Slot::Pending(rx) = slot else {
            unreachable!()
        };
        let pending = Pending::new("k/a", rx);
        tx.send_replace(Progress::Done(9));
        assert_eq!(pending.wait().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn pending_sees_dropped_sender_as_abandoned() {
        let (tx, slot) = Slot::<u8>::pending();
        let Slot::Pending(rx) = slot else {
            unreachable!()
        };
        let pending = Pending::new("k/a", rx);
        drop(tx);
        assert_eq!(
            pending.wait().await.unwrap_err(),
            Error::Abandoned {
                key: "k/a".to_string()
            }
        );
    }
}
