use crate::flight::{self, Flight};
use crate::{
    Context, Error, ProvideCredential, Result, SignRequest, SignedRequest, SigningCredential,
    UnsignedRequest,
};
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum CredentialSlot<K> {
    Empty,
    Ready(K),
    Loading(Flight<Option<K>>),
}

impl<K: Debug> Debug for CredentialSlot<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSlot::Empty => f.write_str("Empty"),
            CredentialSlot::Ready(k) => f.debug_tuple("Ready").field(k).finish(),
            CredentialSlot::Loading(_) => f.write_str("Loading"),
        }
    }
}

/// Signer is the main struct used to sign requests.
///
/// It loads the credential through its [`ProvideCredential`], keeps it until
/// it is no longer valid, and hands it to its [`SignRequest`]. Concurrent
/// calls that find no valid credential share a single load.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<CredentialSlot<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(CredentialSlot::Empty)),
        }
    }

    /// The context used for credential loading and timestamps.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Sign the request.
    ///
    /// Fails with `ErrorKind::Unauthenticated` when no credential can be loaded.
    pub async fn sign(&self, req: UnsignedRequest) -> Result<SignedRequest> {
        let credential = self.credential().await?;

        if credential.is_none() {
            return Err(Error::unauthenticated(
                "no credential available to sign the request",
            ));
        }

        self.builder
            .sign_request(&self.ctx, req, credential.as_ref())
    }

    async fn credential(&self) -> Result<Option<K>> {
        let flight = {
            let mut slot = lock(&self.credential);
            match &*slot {
                CredentialSlot::Ready(cred) if cred.is_valid() => return Ok(Some(cred.clone())),
                CredentialSlot::Loading(flight) => flight.clone(),
                _ => {
                    debug!("no valid cached credential, loading");
                    let loader = self.loader.clone();
                    let ctx = self.ctx.clone();
                    let credential = self.credential.clone();
                    // The slot is marked as loading before the lock is
                    // released, so the task below always finds it.
                    let flight = flight::spawn(async move {
                        let result = flight::catch_panic(async move {
                            loader.provide_credential(&ctx).await
                        })
                        .await;
                        *lock(&credential) = match &result {
                            Ok(Some(cred)) => CredentialSlot::Ready(cred.clone()),
                            _ => CredentialSlot::Empty,
                        };
                        result
                    });
                    *slot = CredentialSlot::Loading(flight.clone());
                    flight
                }
            }
        };

        flight::join(flight).await
    }
}

fn lock<K>(slot: &Mutex<CredentialSlot<K>>) -> MutexGuard<'_, CredentialSlot<K>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use http::{Method, Uri};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct Token(String);

    impl SigningCredential for Token {
        fn is_valid(&self) -> bool {
            !self.0.is_empty()
        }
    }

    #[derive(Debug, Default)]
    struct CountingLoader {
        token: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ProvideCredential for CountingLoader {
        type Credential = Token;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.token.clone().map(Token))
        }
    }

    #[derive(Debug)]
    struct EchoSigner;

    impl SignRequest for EchoSigner {
        type Credential = Token;

        fn sign_request(
            &self,
            _: &Context,
            req: UnsignedRequest,
            credential: Option<&Token>,
        ) -> Result<SignedRequest> {
            let token = credential.ok_or_else(|| Error::unauthenticated("missing"))?;
            let (method, endpoint, params, _) = req.into_parts();
            Ok(SignedRequest {
                method,
                endpoint,
                params,
                timestamp: String::new(),
                nonce: String::new(),
                signature_version: "test".to_string(),
                signature: token.0.clone(),
            })
        }
    }

    fn request() -> UnsignedRequest {
        UnsignedRequest::new(Method::GET, Uri::from_static("https://ecs.aliyuncs.com/"))
            .param("Action", "DescribeRegions")
    }

    #[tokio::test]
    async fn test_credential_is_loaded_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let signer = Signer::new(
            Context::new(),
            CountingLoader {
                token: Some("secret".to_string()),
                calls: calls.clone(),
            },
            EchoSigner,
        );

        for _ in 0..3 {
            let signed = signer.sign(request()).await.unwrap();
            assert_eq!(signed.signature, "secret");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_is_unauthenticated() {
        let signer = Signer::new(Context::new(), CountingLoader::default(), EchoSigner);

        let err = signer.sign(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_first_calls_share_one_load() {
        #[derive(Debug)]
        struct SlowLoader(Arc<AtomicUsize>);

        #[async_trait::async_trait]
        impl ProvideCredential for SlowLoader {
            type Credential = Token;

            async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                Ok(Some(Token("secret".to_string())))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let signer = Signer::new(Context::new(), SlowLoader(calls.clone()), EchoSigner);

        let results = futures::future::join_all((0..8).map(|_| signer.sign(request()))).await;
        for r in results {
            assert_eq!(r.unwrap().signature, "secret");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        #[derive(Debug)]
        struct FlakyLoader(Arc<AtomicUsize>);

        #[async_trait::async_trait]
        impl ProvideCredential for FlakyLoader {
            type Credential = Token;

            async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(Error::transient("metadata server unreachable"));
                }
                Ok(Some(Token("secret".to_string())))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let signer = Signer::new(Context::new(), FlakyLoader(calls.clone()), EchoSigner);

        let err = signer.sign(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(signer.sign(request()).await.unwrap().signature, "secret");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
