//! Core components of the cloudrt control-plane runtime.
//!
//! This crate provides the provider-independent building blocks used by the
//! service crates:
//!
//! - **Context**: holds the HTTP transport, environment access and clock.
//! - **Signing**: [`ProvideCredential`] loads credentials, [`SignRequest`]
//!   turns an [`UnsignedRequest`] into a [`SignedRequest`], and [`Signer`]
//!   ties both together.
//! - **Async jobs**: [`JobWaiter`] polls a [`PollJob`] until the remote job
//!   reaches a terminal state.
//! - **Caching**: [`KeyedResourceCache`] deduplicates concurrent loads of the
//!   same resource, [`MemoizedSupplier`] memoizes one lookup for a fixed
//!   period.
//! - **Errors**: every operation reports an [`Error`] with an [`ErrorKind`]
//!   callers can branch on.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cloudrt_core::{Context, KeyedResourceCache, MemoizedSupplier, Result, RetryPolicy};
//!
//! # async fn example() -> Result<()> {
//! // One security group per zone, created at most once even under contention.
//! let groups: KeyedResourceCache<String, String> = KeyedResourceCache::new();
//! let id = groups
//!     .get_or_load("cn-hangzhou-b".to_string(), || async {
//!         Ok("sg-bp1234".to_string())
//!     })
//!     .await?;
//!
//! // Regions visible to the credential, refreshed every minute.
//! let regions = MemoizedSupplier::new(
//!     "regions",
//!     Duration::from_secs(60),
//!     RetryPolicy::default(),
//!     || async { Ok(vec!["cn-hangzhou".to_string()]) },
//! );
//! let _ = regions.get().await?;
//! # let _ = (id, Context::new());
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: HMAC and base64 helpers
//! - [`time`]: timestamp formatting
//! - [`utils`]: redaction of secrets in debug output

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{
    Clock, Context, Env, HttpSend, NoopEnv, NoopHttpSend, OsEnv, StaticClock, StaticEnv,
    SystemClock,
};
mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{PollJob, ProvideCredential, SignRequest, SigningCredential};
mod request;
pub use request::{
    ensure_unique_keys, percent_encode, SignedRequest, UnsignedRequest, QUERY_ENCODE_SET,
};
mod signer;
pub use signer::Signer;

mod retry;
pub use retry::RetryPolicy;
mod flight;
mod cache;
pub use cache::KeyedResourceCache;
mod memoize;
pub use memoize::MemoizedSupplier;
mod job;
pub use job::{poll_fn, JobHandle, JobStatus, JobWaiter, PollFn};
