//! Claim protocol tests, run against both registry realizations

use std::sync::Arc;
use std::time::Duration;
use trellis_core::{Claim, CoordinatedRegistry, Error, RefKey, Registry, SharedRegistry};
use trellis_test_utils::{file_key, EntryKind};

type Table = Arc<dyn Registry<EntryKind, u64>>;

fn realizations() -> Vec<Table> {
    vec![
        Arc::new(SharedRegistry::<EntryKind, u64>::new()),
        Arc::new(CoordinatedRegistry::<EntryKind, u64>::new()),
    ]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_grant_one_producer() {
    for registry in realizations() {
        let key = file_key("contended");
        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                match registry.claim(&key).await.unwrap() {
                    Claim::Produce(reservation) => {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        (true, reservation.fulfill(7).unwrap())
                    }
                    Claim::Wait(pending) => (false, pending.wait().await.unwrap()),
                    Claim::Ready(value) => (false, value),
                }
            }));
        }

        let mut producers = 0;
        for handle in handles {
            let (produced, value) = handle.await.unwrap();
            producers += usize::from(produced);
            assert_eq!(value, 7);
        }
        assert_eq!(producers, 1, "{} granted several producers", registry.name());
        assert_eq!(registry.len().await.unwrap(), 1);
        registry.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_put_never_overwrites() {
    for registry in realizations() {
        let key = file_key("fixed");
        registry.put(key.clone(), 1).await.unwrap();
        assert_eq!(
            registry.put(key.clone(), 2).await,
            Err(Error::DuplicateEntry {
                key: "file/fixed".to_string()
            })
        );
        assert_eq!(registry.get(&key).await.unwrap(), Some(1));
        assert!(matches!(
            registry.claim(&key).await.unwrap(),
            Claim::Ready(1)
        ));
        registry.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_put_rejected_while_pending() {
    for registry in realizations() {
        let key = file_key("busy");
        let claim = registry.claim(&key).await.unwrap();
        assert!(matches!(claim, Claim::Produce(_)));
        assert!(matches!(
            registry.put(key.clone(), 3).await,
            Err(Error::DuplicateEntry { .. })
        ));
        assert_eq!(registry.get(&key).await.unwrap(), None);
        drop(claim);
        registry.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_dropped_reservation_wakes_waiters() {
    for registry in realizations() {
        let key = file_key("flaky");
        let Claim::Produce(reservation) = registry.claim(&key).await.unwrap() else {
            panic!("first claim must produce");
        };
        let Claim::Wait(pending) = registry.claim(&key).await.unwrap() else {
            panic!("second claim must wait");
        };
        assert_eq!(pending.key(), "file/flaky");

        let waiter = tokio::spawn(pending.wait());
        drop(reservation);

        assert_eq!(
            waiter.await.unwrap(),
            Err(Error::Abandoned {
                key: "file/flaky".to_string()
            })
        );
        assert_eq!(registry.len().await.unwrap(), 0);
        assert!(matches!(
            registry.claim(&key).await.unwrap(),
            Claim::Produce(_)
        ));
        registry.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_kinds_partition_keys() {
    for registry in realizations() {
        registry
            .put(RefKey::new(EntryKind::File, "shared"), 1)
            .await
            .unwrap();
        registry
            .put(RefKey::new(EntryKind::Directory, "shared"), 2)
            .await
            .unwrap();
        assert_eq!(
            registry
                .get(&RefKey::new(EntryKind::Directory, "shared"))
                .await
                .unwrap(),
            Some(2)
        );
        assert_eq!(registry.len().await.unwrap(), 2);
        registry.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_closed_registry_rejects_work() {
    for registry in realizations() {
        registry.close().await.unwrap();
        assert_eq!(
            registry.put(file_key("late"), 1).await,
            Err(Error::RegistryClosed)
        );
        assert!(matches!(
            registry.claim(&file_key("late")).await,
            Err(Error::RegistryClosed)
        ));
    }
}
