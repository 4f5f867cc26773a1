use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cloudrt_core::{
    Context, Error, JobHandle, JobWaiter, KeyedResourceCache, MemoizedSupplier, Result,
    RetryPolicy, Signer, UnsignedRequest,
};
use http::{Method, Uri};
use log::debug;
use serde::de::DeserializeOwned;

use crate::api_error::classify;
use crate::constants::*;
use crate::region::{DescribeRegionsResponse, DescribeZonesResponse};
use crate::resource::{CreateSecurityGroupResponse, DescribeSecurityGroupsResponse};
use crate::{
    Config, Credential, DefaultCredentialProvider, KeyPair, Region, RequestSigner,
    TaskStatusPoller, Zone, ZoneAndName,
};

/// Client signs RPC calls and sends them through the context's transport.
///
/// Cloning is cheap; clones share the signer, its cached credential and the
/// security group and key pair caches.
#[derive(Clone, Debug)]
pub struct Client {
    endpoint: Uri,
    method: Method,
    poll_policy: RetryPolicy,
    session_interval: Duration,
    signer: Signer<Credential>,
    security_groups: KeyedResourceCache<ZoneAndName, String>,
    key_pairs: KeyedResourceCache<ZoneAndName, KeyPair>,
}

impl Client {
    /// Create a client from config, loading credentials with
    /// [`DefaultCredentialProvider`].
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        let endpoint: Uri = config.endpoint().parse().map_err(|e| {
            Error::config_invalid(format!("endpoint {} is not a valid uri", config.endpoint()))
                .with_source(e)
        })?;
        let builder = RequestSigner::new()
            .with_version(config.api_version())
            .with_format(config.format());
        let poll_policy = config.poll_policy();
        let session_interval = config.session_interval();
        let loader = DefaultCredentialProvider::new(Arc::new(config));

        Ok(Self {
            endpoint,
            method: Method::GET,
            poll_policy,
            session_interval,
            signer: Signer::new(ctx, loader, builder),
            security_groups: KeyedResourceCache::new(),
            key_pairs: KeyedResourceCache::new(),
        })
    }

    /// Create a client around an existing signer.
    pub fn with_signer(endpoint: Uri, signer: Signer<Credential>) -> Self {
        let config = Config::default();
        Self {
            endpoint,
            method: Method::GET,
            poll_policy: config.poll_policy(),
            session_interval: config.session_interval(),
            signer,
            security_groups: KeyedResourceCache::new(),
            key_pairs: KeyedResourceCache::new(),
        }
    }

    /// Send calls with `method`: `GET` puts parameters into the query
    /// string, `POST` into a form body.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Start a request for `action` against this client's endpoint.
    pub fn request(&self, action: &str) -> UnsignedRequest {
        UnsignedRequest::new(self.method.clone(), self.endpoint.clone()).param(ACTION, action)
    }

    /// Sign and send the request, returning the raw response body.
    ///
    /// Failed responses are classified by their error code and status:
    /// credential problems are `Unauthenticated`, permission problems
    /// `Unauthorized`, throttling and server errors `Transient`.
    pub async fn call(&self, req: UnsignedRequest) -> Result<Bytes> {
        let action = req.get_param(ACTION).unwrap_or("request").to_string();

        let signed = self.signer.sign(req).await?;
        debug!("sending signed {action}: {signed:?}");

        let resp = self
            .signer
            .context()
            .http_send(signed.into_http_request()?)
            .await?;
        let (parts, body) = resp.into_parts();
        if parts.status.is_success() {
            return Ok(body);
        }

        let err = classify(&action, parts.status, &body);
        debug!("{action} failed: {err}");
        Err(err)
    }

    /// Like [`Client::call`], decoding the body as JSON.
    pub async fn call_json<T: DeserializeOwned>(&self, req: UnsignedRequest) -> Result<T> {
        let action = req.get_param(ACTION).unwrap_or("request").to_string();
        let body = self.call(req).await?;

        serde_json::from_slice(&body).map_err(|e| {
            Error::unexpected(format!("decode response of {action} failed")).with_source(e)
        })
    }

    /// List the regions visible to the current credential.
    pub async fn describe_regions(&self) -> Result<Vec<Region>> {
        let resp: DescribeRegionsResponse = self.call_json(self.request("DescribeRegions")).await?;
        Ok(resp.regions.region)
    }

    /// Memoize [`Client::describe_regions`] for `ttl`.
    pub fn regions_supplier(&self, ttl: Duration, retry: RetryPolicy) -> MemoizedSupplier<Vec<Region>> {
        let client = self.clone();
        MemoizedSupplier::new("regions", ttl, retry, move || {
            let client = client.clone();
            async move { client.describe_regions().await }
        })
    }

    /// Memoize [`Client::describe_regions`] for the configured session interval.
    pub fn session_regions(&self) -> MemoizedSupplier<Vec<Region>> {
        self.regions_supplier(self.session_interval, RetryPolicy::default())
    }

    /// List the zones of `region_id`.
    pub async fn describe_zones(&self, region_id: &str) -> Result<Vec<Zone>> {
        let req = self.request("DescribeZones").param(REGION_ID, region_id);
        let resp: DescribeZonesResponse = self.call_json(req).await?;
        Ok(resp.zones.zone)
    }

    /// Memoize [`Client::describe_zones`] of `region_id` for `ttl`.
    pub fn zones_supplier(
        &self,
        region_id: impl Into<String>,
        ttl: Duration,
        retry: RetryPolicy,
    ) -> MemoizedSupplier<Vec<Zone>> {
        let client = self.clone();
        let region_id = region_id.into();
        MemoizedSupplier::new(format!("zones of {region_id}"), ttl, retry, move || {
            let client = client.clone();
            let region_id = region_id.clone();
            async move { client.describe_zones(&region_id).await }
        })
    }

    /// Memoize [`Client::describe_zones`] of `region_id` for the configured
    /// session interval.
    pub fn session_zones(&self, region_id: impl Into<String>) -> MemoizedSupplier<Vec<Zone>> {
        self.zones_supplier(region_id, self.session_interval, RetryPolicy::default())
    }

    /// Look up the security group named `key.name` in region `key.zone_id`.
    pub async fn find_security_group(&self, key: &ZoneAndName) -> Result<Option<String>> {
        let req = self
            .request("DescribeSecurityGroups")
            .param(REGION_ID, key.zone_id.as_str())
            .param(SECURITY_GROUP_NAME, key.name.as_str());
        let resp: DescribeSecurityGroupsResponse = self.call_json(req).await?;

        Ok(resp
            .security_groups
            .security_group
            .into_iter()
            .find(|g| g.security_group_name == key.name)
            .map(|g| g.security_group_id))
    }

    /// Create the security group named `key.name` in region `key.zone_id`.
    pub async fn create_security_group(&self, key: &ZoneAndName) -> Result<String> {
        let req = self
            .request("CreateSecurityGroup")
            .param(REGION_ID, key.zone_id.as_str())
            .param(SECURITY_GROUP_NAME, key.name.as_str());
        let resp: CreateSecurityGroupResponse = self.call_json(req).await?;
        Ok(resp.security_group_id)
    }

    /// Id of the security group for `key`, finding or creating it once.
    ///
    /// Concurrent calls for the same key share one lookup, so the group is
    /// created at most once. Failures are not cached.
    pub async fn security_group(&self, key: ZoneAndName) -> Result<String> {
        let client = self.clone();
        self.security_groups
            .get_or_load(key.clone(), move || async move {
                if let Some(id) = client.find_security_group(&key).await? {
                    debug!("found security group {id} for {key}");
                    return Ok(id);
                }
                let id = client.create_security_group(&key).await?;
                debug!("created security group {id} for {key}");
                Ok(id)
            })
            .await
    }

    /// Forget the cached security group for `key`, e.g. after deleting it.
    pub fn forget_security_group(&self, key: &ZoneAndName) {
        self.security_groups.invalidate(key);
    }

    /// Key pair named `key.name` in region `key.zone_id`, created once.
    ///
    /// The private key is only available from the call that created it, so
    /// the created key pair is cached for the lifetime of the client.
    pub async fn key_pair(&self, key: ZoneAndName) -> Result<KeyPair> {
        let client = self.clone();
        self.key_pairs
            .get_or_load(key.clone(), move || async move {
                let req = client
                    .request("CreateKeyPair")
                    .param(REGION_ID, key.zone_id.as_str())
                    .param(KEY_PAIR_NAME, key.name.as_str());
                let kp: KeyPair = client.call_json(req).await?;
                debug!("created key pair {} for {key}", kp.key_pair_name);
                Ok(kp)
            })
            .await
    }

    /// Forget the cached key pair for `key`.
    pub fn forget_key_pair(&self, key: &ZoneAndName) {
        self.key_pairs.invalidate(key);
    }

    /// A waiter using the configured poll budget.
    pub fn job_waiter(&self) -> JobWaiter {
        JobWaiter::new(self.poll_policy)
    }

    /// A poller for tasks in `region_id`.
    pub fn task_poller(&self, region_id: impl Into<String>) -> TaskStatusPoller {
        TaskStatusPoller::new(self.clone(), region_id)
    }

    /// Wait for the task `handle` in `region_id` to finish, returning the
    /// final `DescribeTaskAttribute` body.
    pub async fn wait_for_task(&self, region_id: &str, handle: &JobHandle) -> Result<Bytes> {
        self.job_waiter()
            .wait(handle, &self.task_poller(region_id))
            .await
    }
}
