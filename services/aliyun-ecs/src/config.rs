use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use cloudrt_core::utils::Redact;
use cloudrt_core::{Context, Error, Result, RetryPolicy};

use super::constants::*;

/// Config for the aliyun ecs client.
///
/// Every field left as `None` falls back to its env value (see
/// [`Config::from_env`]) and then to the built-in default.
#[derive(Clone, Default)]
pub struct Config {
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ALIBABA_CLOUD_ACCESS_KEY_ID`]
    pub access_key_id: Option<String>,
    /// `access_key_secret` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ALIBABA_CLOUD_ACCESS_KEY_SECRET`]
    pub access_key_secret: Option<String>,
    /// `security_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ALIBABA_CLOUD_SECURITY_TOKEN`]
    pub security_token: Option<String>,
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`ALIBABA_CLOUD_ECS_ENDPOINT`]
    /// - default to `https://ecs.aliyuncs.com/`
    pub endpoint: Option<String>,
    /// API version sent with every request, default to `2014-05-26`.
    pub api_version: Option<String>,
    /// Response format sent with every request, default to `JSON`.
    pub format: Option<String>,
    /// `session_interval` is how long session data such as the region list
    /// is reused. It will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`CLOUDRT_SESSION_INTERVAL`] in seconds
    /// - default to 60s
    pub session_interval: Option<Duration>,
    /// `poll_interval` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`CLOUDRT_POLL_INTERVAL`] in seconds
    /// - default to 5s
    pub poll_interval: Option<Duration>,
    /// `poll_max_attempts` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`CLOUDRT_POLL_MAX_ATTEMPTS`]
    /// - default to 1200
    pub poll_max_attempts: Option<u32>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &Redact::from(&self.access_key_secret))
            .field("security_token", &Redact::from(&self.security_token))
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("format", &self.format)
            .field("session_interval", &self.session_interval)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Fields that are already set win over env values. Numeric env values
    /// that don't parse yield `ErrorKind::ConfigInvalid`.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        if let Some(v) = ctx.env_var(ALIBABA_CLOUD_ACCESS_KEY_ID) {
            self.access_key_id.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(ALIBABA_CLOUD_ACCESS_KEY_SECRET) {
            self.access_key_secret.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(ALIBABA_CLOUD_SECURITY_TOKEN) {
            self.security_token.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(ALIBABA_CLOUD_ECS_ENDPOINT) {
            self.endpoint.get_or_insert(v);
        }
        if self.session_interval.is_none() {
            if let Some(v) = ctx.env_var(CLOUDRT_SESSION_INTERVAL) {
                self.session_interval = Some(Duration::from_secs(parse_env(
                    CLOUDRT_SESSION_INTERVAL,
                    &v,
                )?));
            }
        }
        if self.poll_interval.is_none() {
            if let Some(v) = ctx.env_var(CLOUDRT_POLL_INTERVAL) {
                self.poll_interval =
                    Some(Duration::from_secs(parse_env(CLOUDRT_POLL_INTERVAL, &v)?));
            }
        }
        if self.poll_max_attempts.is_none() {
            if let Some(v) = ctx.env_var(CLOUDRT_POLL_MAX_ATTEMPTS) {
                self.poll_max_attempts = Some(parse_env(CLOUDRT_POLL_MAX_ATTEMPTS, &v)?);
            }
        }

        Ok(self)
    }

    /// Endpoint in effect.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// API version in effect.
    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }

    /// Response format in effect.
    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_FORMAT)
    }

    /// Session interval in effect.
    pub fn session_interval(&self) -> Duration {
        self.session_interval
            .unwrap_or(Duration::from_secs(DEFAULT_SESSION_INTERVAL_SECS))
    }

    /// Poll budget for async jobs: a fixed interval and a max attempt count.
    pub fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.poll_interval
                .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
            self.poll_max_attempts.unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS),
        )
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().map_err(|e| {
        Error::config_invalid(format!("env {key} has invalid value {value:?}")).with_source(e)
    })
}
