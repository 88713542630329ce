//! Leases one key per attempt and binds a fresh provider client to it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::GeminiClient;
use crate::registry::KeyRegistry;

use super::ApiKey;

/// The registry had no key to hand out, or could not be reached.
///
/// The orchestrator answers this by waiting, never by rotating or failing.
#[derive(Debug, Error)]
#[error("No API key available: {reason}")]
pub struct SystemBusy {
    pub reason: String,
}

/// A client bound to exactly one leased key.
#[derive(Debug, Clone)]
pub struct Lease {
    pub client: GeminiClient,
    pub key: ApiKey,
}

/// Requests keys from the shared registry.
#[derive(Clone)]
pub struct KeyProvisioner {
    registry: Arc<dyn KeyRegistry>,
    base_url: String,
}

impl std::fmt::Debug for KeyProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvisioner")
            .field("registry", &"..")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl KeyProvisioner {
    pub fn new(registry: Arc<dyn KeyRegistry>, base_url: impl Into<String>) -> Self {
        Self {
            registry,
            base_url: base_url.into(),
        }
    }

    /// Lease a key and, when a job id is given, record the linkage for audit.
    ///
    /// Audit failures are logged and ignored.
    pub async fn acquire(&self, job_id: Option<&str>) -> Result<Lease, SystemBusy> {
        let raw = match self.registry.acquire_available_key().await {
            Ok(Some(key)) if !key.trim().is_empty() => key,
            Ok(_) => {
                return Err(SystemBusy {
                    reason: "key pool is empty".to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Key registry lease failed");
                return Err(SystemBusy {
                    reason: e.to_string(),
                });
            }
        };

        let key = ApiKey::new(raw);
        debug!(key = %key, job_id = job_id.unwrap_or(""), "Leased API key");

        if let Some(job_id) = job_id {
            if let Err(e) = self
                .registry
                .record_key_for_job(job_id, key.expose())
                .await
            {
                warn!(job_id, key = %key, error = %e, "Failed to record key for job");
            }
        }

        Ok(Lease {
            client: GeminiClient::new(key.clone(), self.base_url.as_str()),
            key,
        })
    }
}
