//! Single-flight execution shared by [`crate::KeyedResourceCache`] and
//! [`crate::MemoizedSupplier`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::{Error, Result};

/// A load in progress that any number of waiters can attach to.
pub(crate) type Flight<V> = Shared<BoxFuture<'static, std::result::Result<V, Arc<Error>>>>;

/// Spawn `fut` on the runtime and return a handle every waiter can await.
///
/// The task runs to completion even if every waiter is dropped.
pub(crate) fn spawn<V, Fut>(fut: Fut) -> Flight<V>
where
    V: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<V>> + Send + 'static,
{
    let handle = tokio::spawn(fut);
    async move {
        match handle.await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(err)) => Err(Arc::new(err)),
            Err(err) => Err(Arc::new(Error::from(err))),
        }
    }
    .boxed()
    .shared()
}

/// Wait for the flight, turning a shared failure into an owned error.
pub(crate) async fn join<V: Clone>(flight: Flight<V>) -> Result<V> {
    flight.await.map_err(Error::from)
}

/// Run `fut`, turning a panic into `ErrorKind::Unexpected`.
///
/// Loads are wrapped in this before their outcome is recorded, so a
/// panicking load frees its slot like any other failure.
pub(crate) async fn catch_panic<V, Fut>(fut: Fut) -> Result<V>
where
    Fut: Future<Output = Result<V>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::unexpected(format!(
            "load panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
