use crate::provide_credential::{ConfigCredentialProvider, EnvCredentialProvider};
use crate::{Config, Credential};
use async_trait::async_trait;
use cloudrt_core::{Context, ProvideCredential, Result};
use log::debug;
use std::sync::Arc;

/// DefaultCredentialProvider tries, in order:
///
/// - the access key pair set on [`Config`]
/// - env values, see [`EnvCredentialProvider`]
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    config: ConfigCredentialProvider,
    env: EnvCredentialProvider,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new(Arc::new(Config::default()))
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config: ConfigCredentialProvider::new(config),
            env: EnvCredentialProvider::new(),
        }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if let Some(cred) = self.config.provide_credential(ctx).await? {
            debug!("loaded credential from config");
            return Ok(Some(cred));
        }
        if let Some(cred) = self.env.provide_credential(ctx).await? {
            debug!("loaded credential from env");
            return Ok(Some(cred));
        }

        debug!("no credential found in config or env");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use cloudrt_core::StaticEnv;
    use std::collections::HashMap;

    fn env_ctx() -> Context {
        Context::new().with_env(StaticEnv {
            envs: HashMap::from_iter([
                (
                    ALIBABA_CLOUD_ACCESS_KEY_ID.to_string(),
                    "access_key_id".to_string(),
                ),
                (
                    ALIBABA_CLOUD_ACCESS_KEY_SECRET.to_string(),
                    "secret_access_key".to_string(),
                ),
            ]),
        })
    }

    #[tokio::test]
    async fn test_default_loader_without_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        let loader = DefaultCredentialProvider::default();
        let credential = loader.provide_credential(&Context::new()).await.unwrap();

        assert!(credential.is_none());
    }

    #[tokio::test]
    async fn test_default_loader_with_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        let loader = DefaultCredentialProvider::default();
        let credential = loader.provide_credential(&env_ctx()).await.unwrap().unwrap();

        assert_eq!("access_key_id", credential.access_key_id);
        assert_eq!("secret_access_key", credential.access_key_secret);
    }

    #[tokio::test]
    async fn test_default_loader_prefers_config() {
        let _ = env_logger::builder().is_test(true).try_init();

        let loader = DefaultCredentialProvider::new(Arc::new(Config {
            access_key_id: Some("config_access_key_id".to_string()),
            access_key_secret: Some("config_secret".to_string()),
            ..Default::default()
        }));
        let credential = loader.provide_credential(&env_ctx()).await.unwrap().unwrap();

        assert_eq!("config_access_key_id", credential.access_key_id);
    }
}
