//! Signing, job polling and caching runtime for cloud control-plane APIs.
//!
//! This crate bundles [`cloudrt_core`] with the service crates behind
//! features:
//!
//! - `default-context` (default): [`default_context`] backed by reqwest and the process env.
//! - `aliyun` (default): Aliyun ECS support under [`aliyun`].
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> cloudrt::Result<()> {
//! let client = cloudrt::aliyun::default_client()?;
//! let regions = client.session_regions().get().await?;
//! println!("{} regions", regions.len());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use cloudrt_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::default_context;

#[cfg(feature = "aliyun")]
pub mod aliyun;
