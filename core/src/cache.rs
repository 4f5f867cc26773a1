//! Keyed cache with single-flight population.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::flight::{self, Flight};
use crate::Result;

enum Slot<V> {
    Ready(V),
    Loading { generation: u64, flight: Flight<V> },
}

struct Inner<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    next_generation: AtomicU64,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Debug,
    V: Clone,
{
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome of load `generation` unless the key was invalidated meanwhile.
    fn complete(&self, key: K, generation: u64, result: &Result<V>) {
        let mut slots = self.lock();
        let current = matches!(
            slots.get(&key),
            Some(Slot::Loading { generation: g, .. }) if *g == generation
        );
        if !current {
            debug!("cache load for {key:?} finished after invalidation, dropping result");
            return;
        }

        match result {
            Ok(v) => {
                slots.insert(key, Slot::Ready(v.clone()));
            }
            Err(err) => {
                debug!("cache load for {key:?} failed: {err}");
                slots.remove(&key);
            }
        }
    }
}

/// KeyedResourceCache maps a key to a lazily loaded value.
///
/// - At most one load per key is in flight; concurrent callers for the same
///   key share its outcome.
/// - Loads run on a spawned task and finish even if the caller that started
///   them goes away.
/// - Failures are handed to every waiter of that load and are not cached.
/// - Entries live until [`KeyedResourceCache::invalidate`]; there is no eviction.
///
/// Cloning the cache is cheap and yields a handle to the same entries.
pub struct KeyedResourceCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for KeyedResourceCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for KeyedResourceCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for KeyedResourceCache<K, V>
where
    K: Eq + Hash + Debug,
    V: Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let slots = self.inner.lock();
        let loading = slots
            .values()
            .filter(|s| matches!(s, Slot::Loading { .. }))
            .count();
        f.debug_struct("KeyedResourceCache")
            .field("entries", &slots.len())
            .field("loading", &loading)
            .finish()
    }
}

impl<K, V> KeyedResourceCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Return the cached value for `key`, loading it with `load` if absent.
    ///
    /// If another caller is already loading `key`, this call waits for that
    /// load instead of calling `load`.
    pub async fn get_or_load<F, Fut>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let flight = {
            let mut slots = self.inner.lock();
            match slots.get(&key) {
                Some(Slot::Ready(v)) => return Ok(v.clone()),
                Some(Slot::Loading { flight, .. }) => {
                    debug!("cache load for {key:?} in flight, waiting");
                    flight.clone()
                }
                None => {
                    debug!("cache miss for {key:?}, loading");
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let inner = self.inner.clone();
                    let k = key.clone();
                    // The slot is registered before the lock is released, so
                    // `complete` always observes it.
                    let flight = flight::spawn(async move {
                        let result = flight::catch_panic(async move { load().await }).await;
                        inner.complete(k, generation, &result);
                        result
                    });
                    slots.insert(
                        key,
                        Slot::Loading {
                            generation,
                            flight: flight.clone(),
                        },
                    );
                    flight
                }
            }
        };

        flight::join(flight).await
    }

    /// Return the cached value for `key` without loading it.
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        match self.inner.lock().get(key) {
            Some(Slot::Ready(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// Drop the entry for `key`.
    ///
    /// A load in flight still completes for its waiters, but its result is
    /// not stored; the next call loads again.
    pub fn invalidate(&self, key: &K) {
        self.inner.lock().remove(key);
    }

    /// Drop all entries.
    pub fn invalidate_all(&self) {
        self.inner.lock().clear();
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }

    /// Returns `true` if no entry is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ErrorKind};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct ZoneAndName {
        zone: String,
        name: String,
    }

    fn key(zone: &str, name: &str) -> ZoneAndName {
        ZoneAndName {
            zone: zone.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight() {
        let cache: KeyedResourceCache<String, String> = KeyedResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_load("sg-web".to_string(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok("sg-123".to_string())
                    })
                    .await
            }));
        }

        // Let every caller attach before the load finishes.
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_one();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "sg-123");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get_if_present(&"sg-web".to_string()).as_deref(), Some("sg-123"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_shares_failure() {
        let cache: KeyedResourceCache<String, String> = KeyedResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_load("kp".to_string(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Err::<String, _>(Error::unauthorized("forbidden").with_code("Forbidden.RAM"))
                    })
                    .await
            }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_one();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthorized);
            assert_eq!(err.code(), Some("Forbidden.RAM"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_no_negative_caching() {
        let cache: KeyedResourceCache<String, u32> = KeyedResourceCache::new();

        let err = cache
            .get_or_load("k".to_string(), || async { Err(Error::transient("boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);

        let v = cache
            .get_or_load("k".to_string(), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);

        // Loaded values are retained.
        let v = cache
            .get_or_load("k".to_string(), || async { Ok(8) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn test_composite_keys_are_structural() {
        let cache: KeyedResourceCache<ZoneAndName, String> = KeyedResourceCache::new();

        cache
            .get_or_load(key("cn-qingdao-b", "web"), || async { Ok("sg-1".to_string()) })
            .await
            .unwrap();
        cache
            .get_or_load(key("cn-hangzhou-a", "web"), || async { Ok("sg-2".to_string()) })
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get_if_present(&key("cn-qingdao-b", "web")).as_deref(),
            Some("sg-1")
        );
        assert_eq!(
            cache.get_if_present(&key("cn-hangzhou-a", "web")).as_deref(),
            Some("sg-2")
        );
        assert_eq!(cache.get_if_present(&key("cn-qingdao-b", "db")), None);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache: KeyedResourceCache<String, u32> = KeyedResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in [1, 1] {
            let calls = calls.clone();
            let v = cache
                .get_or_load("k".to_string(), move || async move {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) as u32 + 1)
                })
                .await
                .unwrap();
            assert_eq!(v, expected);
        }

        cache.invalidate(&"k".to_string());
        assert!(cache.get_if_present(&"k".to_string()).is_none());

        let calls2 = calls.clone();
        let v = cache
            .get_or_load("k".to_string(), move || async move {
                Ok(calls2.fetch_add(1, Ordering::SeqCst) as u32 + 1)
            })
            .await
            .unwrap();
        assert_eq!(v, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_waiter_does_not_abort_load() {
        let cache: KeyedResourceCache<String, String> = KeyedResourceCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let first = {
            let cache = cache.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load("kp-node-1".to_string(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok("created".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        gate.notify_one();

        let v = cache
            .get_or_load("kp-node-1".to_string(), || async {
                Ok("created twice".to_string())
            })
            .await
            .unwrap();
        assert_eq!(v, "created");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    async fn explode() -> Result<u32> {
        panic!("loader bug")
    }

    #[tokio::test]
    async fn test_panicking_load_is_not_cached() {
        let _ = env_logger::builder().is_test(true).try_init();
        let cache: KeyedResourceCache<String, u32> = KeyedResourceCache::new();

        let err = cache
            .get_or_load("k".to_string(), explode)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.message().contains("loader bug"));
        assert!(cache.is_empty());

        let v = cache
            .get_or_load("k".to_string(), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalidate_during_load_discards_result() {
        let _ = env_logger::builder().is_test(true).try_init();
        let cache: KeyedResourceCache<String, String> = KeyedResourceCache::new();
        let gate = Arc::new(Notify::new());

        let first = {
            let cache = cache.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load("sg-web".to_string(), move || async move {
                        gate.notified().await;
                        Ok("stale".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.invalidate(&"sg-web".to_string());
        gate.notify_one();

        // The waiter still gets the outcome of the load it joined.
        assert_eq!(first.await.unwrap().unwrap(), "stale");
        assert_eq!(cache.get_if_present(&"sg-web".to_string()), None);

        let v = cache
            .get_or_load("sg-web".to_string(), || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(v, "fresh");
    }
}
