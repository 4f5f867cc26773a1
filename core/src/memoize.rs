//! Time-bounded memoization of a single expensive lookup.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use log::debug;
use tokio::time::Instant;

use crate::flight::{self, Flight};
use crate::{Result, RetryPolicy};

type Lookup<V> = Box<dyn Fn() -> BoxFuture<'static, Result<V>> + Send + Sync>;

enum State<V> {
    Empty,
    Ready { value: V, computed_at: Instant },
    Loading { generation: u64, flight: Flight<V> },
}

struct Inner<V> {
    name: String,
    ttl: Duration,
    retry: RetryPolicy,
    lookup: Lookup<V>,
    state: Mutex<State<V>>,
    next_generation: AtomicU64,
}

impl<V: Clone> Inner<V> {
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, generation: u64, result: &Result<V>) {
        let mut state = self.lock();
        if !matches!(&*state, State::Loading { generation: g, .. } if *g == generation) {
            return;
        }

        *state = match result {
            Ok(value) => State::Ready {
                value: value.clone(),
                computed_at: Instant::now(),
            },
            Err(err) => {
                debug!("{} lookup failed, not memoizing: {err}", self.name);
                State::Empty
            }
        };
    }
}

/// MemoizedSupplier caches the result of one lookup for a fixed period.
///
/// - A value computed at `T` is served until `T + ttl`; the first call at or
///   after that recomputes it.
/// - Concurrent callers during a recomputation share a single attempt.
/// - Retryable failures are retried by the supplier's [`RetryPolicy`];
///   authorization failures surface at once.
/// - Failures are never memoized.
///
/// Typical use is session-level data such as the list of regions visible to
/// the current credential.
pub struct MemoizedSupplier<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for MemoizedSupplier<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Debug for MemoizedSupplier<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoizedSupplier")
            .field("name", &self.inner.name)
            .field("ttl", &self.inner.ttl)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl<V> MemoizedSupplier<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a supplier named `name` (used in logs) around `lookup`.
    pub fn new<F, Fut>(name: impl Into<String>, ttl: Duration, retry: RetryPolicy, lookup: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                ttl,
                retry,
                lookup: Box::new(move || lookup().boxed()),
                state: Mutex::new(State::Empty),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Period during which a computed value is served.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the memoized value, computing it if absent or expired.
    pub async fn get(&self) -> Result<V> {
        let flight = {
            let mut state = self.inner.lock();
            match &*state {
                State::Ready { value, computed_at } if computed_at.elapsed() < self.inner.ttl => {
                    return Ok(value.clone());
                }
                State::Loading { flight, .. } => flight.clone(),
                _ => {
                    debug!("{} is empty or expired, computing", self.inner.name);
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let inner = self.inner.clone();
                    let flight = flight::spawn(async move {
                        let result = flight::catch_panic(
                            inner.retry.retry(&inner.name, || (inner.lookup)()),
                        )
                        .await;
                        inner.complete(generation, &result);
                        result
                    });
                    *state = State::Loading {
                        generation,
                        flight: flight.clone(),
                    };
                    flight
                }
            }
        };

        flight::join(flight).await
    }

    /// Forget the memoized value; the next call recomputes it.
    pub fn invalidate(&self) {
        *self.inner.lock() = State::Empty;
    }
}
