use crate::{Context, JobHandle, JobStatus, Result, SignedRequest, UnsignedRequest};
use std::fmt::Debug;

/// SigningCredential is the trait used by signer as the signing key.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is the trait used by signer to load the credential from the environment.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this loader.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    ///
    /// Returns `Ok(None)` if this provider has nothing to offer.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign an unsigned request.
///
/// Signing is pure: implementations must not perform I/O and must not retry.
/// Given the same request, credential, clock reading and nonce, the output is
/// byte-identical.
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request.
    ///
    /// ## Credential
    ///
    /// Implementations must fail with `ErrorKind::Unauthenticated` when the
    /// credential is `None` or unusable.
    fn sign_request(
        &self,
        ctx: &Context,
        req: UnsignedRequest,
        credential: Option<&Self::Credential>,
    ) -> Result<SignedRequest>;
}

/// PollJob checks the status of a remote asynchronous job once.
///
/// Implementations usually wrap a signed status-check call. Errors returned
/// here are interpreted by [`crate::JobWaiter`]: retryable errors consume an
/// attempt, anything else aborts the wait.
#[async_trait::async_trait]
pub trait PollJob: Send + Sync {
    /// Payload of a successfully finished job.
    type Output: Send;

    /// Poll the job once.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus<Self::Output>>;
}
