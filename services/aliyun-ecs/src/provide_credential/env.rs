use crate::{constants::*, Credential};
use async_trait::async_trait;
use cloudrt_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider loads the access key pair from env.
///
/// - [`ALIBABA_CLOUD_ACCESS_KEY_ID`]
/// - [`ALIBABA_CLOUD_ACCESS_KEY_SECRET`]
/// - [`ALIBABA_CLOUD_SECURITY_TOKEN`] (optional)
#[derive(Debug, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let access_key_id = ctx.env_var(ALIBABA_CLOUD_ACCESS_KEY_ID);
        let access_key_secret = ctx.env_var(ALIBABA_CLOUD_ACCESS_KEY_SECRET);

        match (access_key_id, access_key_secret) {
            (Some(ak), Some(sk)) => Ok(Some(Credential {
                access_key_id: ak,
                access_key_secret: sk,
                security_token: ctx.env_var(ALIBABA_CLOUD_SECURITY_TOKEN),
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudrt_core::StaticEnv;
    use std::collections::HashMap;
    use test_case::test_case;

    fn ctx(envs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_env_credential_provider_with_security_token() -> anyhow::Result<()> {
        let ctx = ctx(&[
            (ALIBABA_CLOUD_ACCESS_KEY_ID, "test_access_key"),
            (ALIBABA_CLOUD_ACCESS_KEY_SECRET, "test_secret_key"),
            (ALIBABA_CLOUD_SECURITY_TOKEN, "test_security_token"),
        ]);

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .unwrap();
        assert_eq!(cred.access_key_id, "test_access_key");
        assert_eq!(cred.access_key_secret, "test_secret_key");
        assert_eq!(cred.security_token.as_deref(), Some("test_security_token"));

        Ok(())
    }

    #[test_case(&[] ; "missing")]
    #[test_case(&[(ALIBABA_CLOUD_ACCESS_KEY_ID, "test_access_key")] ; "only access key id")]
    #[test_case(&[(ALIBABA_CLOUD_ACCESS_KEY_SECRET, "test_secret_key")] ; "only access key secret")]
    #[tokio::test]
    async fn test_env_credential_provider_incomplete(envs: &[(&str, &str)]) {
        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx(envs))
            .await
            .unwrap();
        assert!(cred.is_none());
    }
}
