//! Single-coordinator registry
//!
//! One background task owns the table. Every get, put, claim and settle is a
//! message on one ordered channel, so operations are totally ordered without
//! locks on the table itself.

use super::{Claim, Pending, Progress, Registry, Reservation, Slot, SlotStore, Waits};
use crate::error::{Error, Result};
use crate::key::{RefKey, ScaffoldKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Messages handled by the coordinator
enum Command<K, V> {
    Get {
        key: RefKey<K>,
        reply: oneshot::Sender<Option<V>>,
    },
    Put {
        key: RefKey<K>,
        value: V,
        reply: oneshot::Sender<Result<()>>,
    },
    Claim {
        key: RefKey<K>,
        reply: oneshot::Sender<Grant<V>>,
    },
    Settle {
        key: RefKey<K>,
        outcome: Option<V>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Coordinator's answer to a claim
enum Grant<V> {
    Ready(V),
    Produce(watch::Sender<Progress<V>>),
    Wait(watch::Receiver<Progress<V>>),
}

/// Sending half shared by the registry and its reservations
struct CoordinatorHandle<K, V> {
    commands: mpsc::UnboundedSender<Command<K, V>>,
}

impl<K, V> SlotStore<K, V> for CoordinatorHandle<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    fn settle(&self, key: &RefKey<K>, outcome: Option<V>) -> Result<()> {
        self.commands
            .send(Command::Settle {
                key: key.clone(),
                outcome,
            })
            .map_err(|_| Error::RegistryClosed)
    }
}

/// Registry served by a dedicated coordinator task
///
/// Must be created inside a tokio runtime. Call [`Registry::close`] to stop
/// the coordinator; it also stops once every handle is dropped.
pub struct CoordinatedRegistry<K: ScaffoldKind, V> {
    handle: Arc<CoordinatorHandle<K, V>>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    waits: Waits<K>,
}

impl<K, V> CoordinatedRegistry<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    /// Spawn coordinator and return its registry handle
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_coordinator(receiver));
        Self {
            handle: Arc::new(CoordinatorHandle { commands }),
            task: parking_lot::Mutex::new(Some(task)),
            waits: Waits::new(),
        }
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command<K, V>,
    ) -> Result<R> {
        let (reply, response) = oneshot::channel();
        self.handle
            .commands
            .send(command(reply))
            .map_err(|_| Error::RegistryClosed)?;
        response.await.map_err(|_| Error::RegistryClosed)
    }
}

#[async_trait::async_trait]
impl<K, V> Registry<K, V> for CoordinatedRegistry<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &RefKey<K>) -> Result<Option<V>> {
        let key = key.clone();
        self.request(|reply| Command::Get { key, reply }).await
    }

    async fn put(&self, key: RefKey<K>, value: V) -> Result<()> {
        self.request(|reply| Command::Put { key, value, reply })
            .await?
    }

    async fn claim(&self, key: &RefKey<K>) -> Result<Claim<K, V>> {
        let requested = key.clone();
        let grant = self
            .request(|reply| Command::Claim {
                key: requested,
                reply,
            })
            .await?;
        Ok(match grant {
            Grant::Ready(value) => Claim::Ready(value),
            Grant::Wait(progress) => Claim::Wait(Pending::new(key, progress)),
            Grant::Produce(progress) => {
                let store: Arc<dyn SlotStore<K, V>> = self.handle.clone();
                Claim::Produce(Reservation::new(key.clone(), progress, store))
            }
        })
    }

    async fn len(&self) -> Result<usize> {
        self.request(|reply| Command::Len { reply }).await
    }

    async fn close(&self) -> Result<()> {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = self.handle.commands.send(Command::Shutdown);
            task.await?;
        }
        Ok(())
    }

    fn waits(&self) -> &Waits<K> {
        &self.waits
    }

    fn name(&self) -> &'static str {
        "coordinated"
    }
}

impl<K, V> Default for CoordinatedRegistry<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ScaffoldKind, V> fmt::Debug for CoordinatedRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatedRegistry")
            .field("running", &self.task.lock().is_some())
            .finish()
    }
}

/// Coordinator loop; sole owner of the table
async fn run_coordinator<K, V>(mut commands: mpsc::UnboundedReceiver<Command<K, V>>)
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    let mut slots: HashMap<RefKey<K>, Slot<V>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Get { key, reply } => {
                let _ = reply.send(slots.get(&key).and_then(Slot::ready).cloned());
            }
            Command::Put { key, value, reply } => {
                let occupied = slots.get(&key).is_some_and(|slot| !slot.is_orphaned());
                let result = if occupied {
                    Err(Error::DuplicateEntry {
                        key: key.to_string(),
                    })
                } else {
                    slots.insert(key, Slot::Ready(value));
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Command::Claim { key, reply } => {
                let live = slots.get(&key).filter(|slot| !slot.is_orphaned());
                let grant = match live {
                    Some(Slot::Ready(value)) => Grant::Ready(value.clone()),
                    Some(Slot::Pending(progress)) => Grant::Wait(progress.clone()),
                    None => {
                        let (progress, slot) = Slot::pending();
                        slots.insert(key.clone(), slot);
                        Grant::Produce(progress)
                    }
                };
                // Claimer gone before the grant arrived: nobody will produce
                if let Err(Grant::Produce(_)) = reply.send(grant) {
                    slots.remove(&key);
                }
            }
            Command::Settle { key, outcome } => match outcome {
                Some(value) => {
                    slots.insert(key, Slot::Ready(value));
                }
                None => {
                    if matches!(slots.get(&key), Some(Slot::Pending(_))) {
                        slots.remove(&key);
                    }
                }
            },
            Command::Len { reply } => {
                let _ = reply.send(slots.values().filter(|slot| slot.ready().is_some()).count());
            }
            Command::Shutdown => break,
        }
    }

    tracing::debug!("Registry coordinator stopped with {} slots", slots.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct Layer;

    impl ScaffoldKind for Layer {
        fn as_str(&self) -> &'static str {
            "layer"
        }
    }

    fn key(name: &str) -> RefKey<Layer> {
        RefKey::new(Layer, name)
    }

    #[tokio::test]
    async fn put_get_and_len() {
        let registry: CoordinatedRegistry<Layer, String> = CoordinatedRegistry::new();
        registry.put(key("bg"), "blue".to_string()).await.unwrap();

        assert_eq!(
            registry.get(&key("bg")).await.unwrap().as_deref(),
            Some("blue")
        );
        assert_eq!(registry.len().await.unwrap(), 1);
        assert!(matches!(
            registry.put(key("bg"), "red".to_string()).await,
            Err(Error::DuplicateEntry { .. })
        ));
        registry.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_then_fulfill_wakes_waiter() {
        let registry: CoordinatedRegistry<Layer, u32> = CoordinatedRegistry::new();
        let Claim::Produce(reservation) = registry.claim(&key("fg")).await.unwrap() else {
            unreachable!()
        };
        let Claim::Wait(pending) = registry.claim(&key("fg")).await.unwrap() else {
            unreachable!()
        };

        let waiter = tokio::spawn(pending.wait());
        reservation.fulfill(11).unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), 11);
        assert_eq!(registry.get(&key("fg")).await.unwrap(), Some(11));
        registry.close().await.unwrap();
    }

    #[tokio::test]
    async fn abandoned_claim_can_be_reclaimed() {
        let registry: CoordinatedRegistry<Layer, u32> = CoordinatedRegistry::new();
        let first = registry.claim(&key("fg")).await.unwrap();
        assert!(matches!(first, Claim::Produce(_)));
        drop(first);

        assert!(matches!(
            registry.claim(&key("fg")).await.unwrap(),
            Claim::Produce(_)
        ));
        registry.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_stops_coordinator() {
        let registry: CoordinatedRegistry<Layer, u32> = CoordinatedRegistry::new();
        registry.close().await.unwrap();

        assert_eq!(registry.get(&key("fg")).await, Err(Error::RegistryClosed));
        assert!(matches!(
            registry.claim(&key("fg")).await,
            Err(Error::RegistryClosed)
        ));
        registry.close().await.unwrap();
    }
}
