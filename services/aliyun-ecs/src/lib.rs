//! Aliyun ECS support for cloudrt.
//!
//! This crate signs RPC calls to the Elastic Compute Service API with the
//! `HMAC-SHA1` signature (version `1.0`), sends them through the transport
//! configured on [`cloudrt_core::Context`], and classifies failures into the
//! cloudrt error kinds.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cloudrt_aliyun_ecs::{Client, Config};
//! use cloudrt_core::{Context, OsEnv, Result};
//! use cloudrt_http_send_reqwest::ReqwestHttpSend;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     let config = Config::default().from_env(&ctx)?;
//!     let client = Client::new(ctx, config)?;
//!
//!     // Regions are fetched once and reused for the session interval.
//!     let regions = client.session_regions();
//!     for region in regions.get().await? {
//!         println!("{}", region.region_id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Credential Sources
//!
//! [`DefaultCredentialProvider`] takes the access key pair from [`Config`]
//! first and falls back to env:
//!
//! ```bash
//! export ALIBABA_CLOUD_ACCESS_KEY_ID=your-access-key-id
//! export ALIBABA_CLOUD_ACCESS_KEY_SECRET=your-access-key-secret
//! export ALIBABA_CLOUD_SECURITY_TOKEN=your-sts-token  # Optional, for STS
//! ```
//!
//! ## Resources
//!
//! Resources unique by name, such as security groups and key pairs, are
//! keyed by [`ZoneAndName`] and found or created at most once per client:
//!
//! ```no_run
//! # use cloudrt_aliyun_ecs::{Client, ZoneAndName};
//! # use cloudrt_core::Result;
//! # async fn example(client: Client) -> Result<()> {
//! let sg = client
//!     .security_group(ZoneAndName::new("cn-hangzhou", "web"))
//!     .await?;
//! # let _ = sg;
//! # Ok(())
//! # }
//! ```
//!
//! ## Async Tasks
//!
//! Long running operations return a task id. [`TaskStatusPoller`] polls it
//! with `DescribeTaskAttribute`, and [`Client::wait_for_task`] drives the
//! poller with the configured budget:
//!
//! ```no_run
//! # use cloudrt_aliyun_ecs::Client;
//! # use cloudrt_core::{JobHandle, Result};
//! # async fn example(client: Client) -> Result<()> {
//! let body = client
//!     .wait_for_task("cn-hangzhou", &JobHandle::new("t-bp1dm1n7q5ak1aj3k0vq"))
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;

mod api_error;

mod client;
pub use client::Client;

mod task;
pub use task::TaskStatusPoller;

mod region;
pub use region::{Region, Zone, ZoneAndName};

mod resource;
pub use resource::KeyPair;
