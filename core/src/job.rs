//! Waiting for remote asynchronous jobs.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;

use crate::{Error, PollJob, Result, RetryPolicy};

/// Opaque identifier of a remote job, such as a task id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    /// Create a new handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Status of a remote job as reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus<T> {
    /// The job has not reached a terminal state.
    Pending,
    /// The job finished successfully.
    Succeeded(T),
    /// The job finished with a failure reported by the service.
    Failed {
        /// Error code reported by the service.
        code: String,
        /// Human readable message reported by the service.
        message: String,
    },
}

/// Adapt a closure into a [`PollJob`].
///
/// The returned future must not borrow the handle; clone what it needs.
///
/// ```
/// use cloudrt_core::{poll_fn, JobHandle, JobStatus};
///
/// let poll = poll_fn(|_: &JobHandle| async { Ok::<_, cloudrt_core::Error>(JobStatus::Succeeded(())) });
/// ```
pub fn poll_fn<F, Fut, T>(f: F) -> PollFn<F>
where
    F: Fn(&JobHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<JobStatus<T>>> + Send + 'static,
    T: Send + 'static,
{
    PollFn(f)
}

/// PollJob built from a closure, see [`poll_fn`].
#[derive(Debug, Clone, Copy)]
pub struct PollFn<F>(F);

#[async_trait::async_trait]
impl<F, Fut, T> PollJob for PollFn<F>
where
    F: Fn(&JobHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<JobStatus<T>>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus<T>> {
        (self.0)(handle).await
    }
}

/// JobWaiter polls a remote job until it reaches a terminal state.
///
/// Every poll, successful or not, consumes one attempt of the policy. The
/// wait ends with:
///
/// - the job's output when it succeeds,
/// - `ErrorKind::JobFailed` carrying the service's code when it fails,
/// - `ErrorKind::Timeout` when the attempts run out; the job may still be
///   running server-side,
/// - the poll error itself when it is not retryable,
/// - `ErrorKind::Cancelled` when the caller cancels the wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobWaiter {
    policy: RetryPolicy,
}

impl Default for JobWaiter {
    /// Poll every 5 seconds, up to 1200 times.
    fn default() -> Self {
        Self::new(RetryPolicy::fixed(Duration::from_secs(5), 1200))
    }
}

impl JobWaiter {
    /// Create a waiter with the given poll budget.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Poll budget of this waiter.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wait for the job to finish.
    pub async fn wait<P>(&self, handle: &JobHandle, poll: &P) -> Result<P::Output>
    where
        P: PollJob + ?Sized,
    {
        self.run(handle, poll, None).await
    }

    /// Wait for the job to finish, giving up once `cancel` turns `true`.
    ///
    /// Cancellation only stops the wait; the remote job keeps running.
    pub async fn wait_with_cancel<P>(
        &self,
        handle: &JobHandle,
        poll: &P,
        cancel: watch::Receiver<bool>,
    ) -> Result<P::Output>
    where
        P: PollJob + ?Sized,
    {
        self.run(handle, poll, Some(cancel)).await
    }

    async fn run<P>(
        &self,
        handle: &JobHandle,
        poll: &P,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<P::Output>
    where
        P: PollJob + ?Sized,
    {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if is_cancelled(&cancel) {
                return Err(cancelled(handle));
            }

            match poll.poll(handle).await {
                Ok(JobStatus::Succeeded(output)) => {
                    debug!("job {handle} succeeded after {} polls", attempt + 1);
                    return Ok(output);
                }
                Ok(JobStatus::Failed { code, message }) => {
                    debug!("job {handle} failed with {code}: {message}");
                    return Err(Error::job_failed(code, message));
                }
                Ok(JobStatus::Pending) => {
                    last_error = None;
                }
                Err(err) if err.is_retryable() => {
                    debug!("polling job {handle} failed, will poll again: {err}");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }

            if attempt + 1 < max_attempts {
                let delay = self.policy.delay_for_attempt(attempt);
                if !sleep_unless_cancelled(&mut cancel, delay).await {
                    return Err(cancelled(handle));
                }
            }
        }

        warn!("job {handle} not finished after {max_attempts} polls, giving up");
        match last_error {
            Some(err) => Err(Error::timeout(format!(
                "job {handle} state unknown after {max_attempts} polls"
            ))
            .with_source(err)),
            None => Err(Error::timeout(format!(
                "job {handle} still pending after {max_attempts} polls"
            ))),
        }
    }
}

fn cancelled(handle: &JobHandle) -> Error {
    debug!("wait for job {handle} cancelled");
    Error::cancelled(format!("wait for job {handle} cancelled"))
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Sleep for `delay`, returning `false` if cancelled first.
async fn sleep_unless_cancelled(cancel: &mut Option<watch::Receiver<bool>>, delay: Duration) -> bool {
    let Some(rx) = cancel else {
        tokio::time::sleep(delay).await;
        return true;
    };

    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = wait_cancelled(rx) => false,
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    // A dropped sender can never cancel.
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
