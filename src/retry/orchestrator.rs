//! Drives one unit of work through the key-rotating retry loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{KeyRotorError, Result};
use crate::keys::{ExhaustionReporter, KeyProvisioner, Lease};
use crate::provider::{ProviderError, DEFAULT_BASE_URL};
use crate::registry::KeyRegistry;

use super::{AttemptState, RotationPolicy, Transition};

/// Per-call options.
#[derive(Debug, Clone, Default, Builder)]
pub struct RunOptions {
    /// Job row to link each leased key to.
    #[builder(into)]
    pub job_id: Option<String>,
    /// Checked before every attempt and raced against every suspension point.
    pub cancel: Option<CancellationToken>,
    /// Overrides the policy's attempt budget for this call.
    pub max_attempts: Option<u32>,
}

impl RunOptions {
    pub fn for_job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Default::default()
        }
    }
}

/// Wraps provider calls with key leasing, rotation, and backoff.
///
/// Attempts within one call are strictly sequential. Concurrent calls share
/// nothing but the registry.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<dyn KeyRegistry>,
    provisioner: KeyProvisioner,
    reporter: ExhaustionReporter,
    policy: RotationPolicy,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provisioner", &self.provisioner)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(registry: Arc<dyn KeyRegistry>) -> Self {
        Self {
            provisioner: KeyProvisioner::new(registry.clone(), DEFAULT_BASE_URL),
            reporter: ExhaustionReporter::new(registry.clone()),
            registry,
            policy: RotationPolicy::default(),
        }
    }

    /// Point per-attempt clients at a different provider endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.provisioner = KeyProvisioner::new(self.registry.clone(), base_url);
        self
    }

    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Run `work` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `work` receives a client bound to a freshly leased key on every attempt.
    /// Billing restrictions are returned as [`KeyRotorError::BillingRestricted`]
    /// on the first occurrence without reporting the key.
    pub async fn run<T, F, Fut>(&self, options: &RunOptions, mut work: F) -> Result<T>
    where
        F: FnMut(Lease) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let cancel = options.cancel.clone().unwrap_or_default();
        let max_attempts = options.max_attempts.unwrap_or(self.policy.max_attempts);
        let job_id = options.job_id.as_deref();
        let mut state = AttemptState::new();

        while state.has_attempts_left(max_attempts) {
            if cancel.is_cancelled() {
                return Err(KeyRotorError::Cancelled);
            }

            let lease = match guard(&cancel, self.provisioner.acquire(job_id)).await? {
                Ok(lease) => lease,
                Err(busy) => {
                    let transition = state.on_busy(&self.policy, busy.reason);
                    warn!(
                        attempt = state.attempt(),
                        max_attempts,
                        "No API key available, backing off"
                    );
                    if let Transition::Backoff(delay) = transition {
                        self.pause(&state, max_attempts, delay, &cancel).await?;
                    }
                    continue;
                }
            };

            if state.is_excluded(&lease.key) {
                debug!(key = %lease.key, "Registry returned an excluded key, skipping");
                state.on_excluded_key();
                continue;
            }

            let key = lease.key.clone();
            debug!(
                attempt = state.attempt() + 1,
                max_attempts,
                key = %key,
                job_id = job_id.unwrap_or(""),
                "Attempting provider call"
            );

            let error = match guard(&cancel, work(lease)).await? {
                Ok(value) => {
                    if state.attempt() > 0 {
                        info!(attempts = state.attempt() + 1, key = %key, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let normalized = error.classify();
            match state.on_failure(&normalized, &self.policy) {
                Transition::Rotate { throttle, delay } => {
                    warn!(
                        attempt = state.attempt(),
                        max_attempts,
                        key = %key,
                        consecutive = state.consecutive_quota_errors(),
                        message = %normalized.message,
                        "Quota exhausted, rotating key"
                    );
                    if let Some(throttle) = throttle {
                        if state.has_attempts_left(max_attempts) {
                            warn!(
                                pause_ms = throttle.as_millis() as u64,
                                "Repeated quota errors, suspected IP throttling"
                            );
                            sleep(&cancel, throttle).await?;
                        }
                    }
                    guard(&cancel, self.reporter.report_exhausted(&key)).await?;
                    state.exclude(key);
                    self.pause(&state, max_attempts, delay, &cancel).await?;
                }
                Transition::Backoff(delay) => {
                    warn!(
                        attempt = state.attempt(),
                        max_attempts,
                        key = %key,
                        status = ?normalized.status_code,
                        message = %normalized.message,
                        "Provider call failed, backing off"
                    );
                    self.pause(&state, max_attempts, delay, &cancel).await?;
                }
                Transition::Escalate => {
                    info!(key = %key, message = %normalized.message, "Billing restriction");
                    return Err(KeyRotorError::BillingRestricted {
                        message: normalized.message,
                    });
                }
                Transition::Fail => {
                    warn!(
                        key = %key,
                        status = ?normalized.status_code,
                        message = %normalized.message,
                        "Permanent provider failure"
                    );
                    return Err(KeyRotorError::from_normalized(
                        normalized,
                        state.attempt() + 1,
                    ));
                }
            }
        }

        Err(state.into_error())
    }

    /// Sleep only when another attempt will follow.
    async fn pause(
        &self,
        state: &AttemptState,
        max_attempts: u32,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if state.has_attempts_left(max_attempts) {
            sleep(cancel, delay).await?;
        }
        Ok(())
    }
}

/// Cancellable sleep.
pub(crate) async fn sleep(cancel: &CancellationToken, delay: Duration) -> Result<()> {
    guard(cancel, tokio::time::sleep(delay)).await
}

async fn guard<F: Future>(cancel: &CancellationToken, future: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(KeyRotorError::Cancelled),
        output = future => Ok(output),
    }
}
