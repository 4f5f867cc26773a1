//! [`HttpSend`] implemented with reqwest.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cloudrt_core::Context;
//! use cloudrt_http_send_reqwest::ReqwestHttpSend;
//!
//! let client = reqwest::Client::builder()
//!     .timeout(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use cloudrt_core::{Error, HttpSend, Result};
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};

/// ReqwestHttpSend sends requests with a [`reqwest::Client`].
///
/// Transport failures are mapped so callers can tell what to retry:
///
/// - timeouts become `ErrorKind::Timeout`
/// - connection, request and body failures become `ErrorKind::Transient`
/// - requests reqwest refuses to build become `ErrorKind::MalformedRequest`
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req).map_err(|e| {
            Error::malformed_request("request can't be converted for reqwest").with_source(e)
        })?;
        debug!("sending {} {}", req.method(), req.url().path());

        let resp: http::Response<_> = self.client.execute(req).await.map_err(map_err)?.into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(map_err)?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

fn map_err(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::timeout("http request timed out").with_source(err)
    } else if err.is_builder() {
        Error::malformed_request("http request is invalid").with_source(err)
    } else {
        Error::transient(format!("http request failed: {err}")).with_source(err)
    }
}
