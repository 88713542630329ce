//! Best-effort exhaustion reporting.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::registry::KeyRegistry;

use super::ApiKey;

/// Flags keys as exhausted in the shared registry so other workers skip them.
#[derive(Clone)]
pub struct ExhaustionReporter {
    registry: Arc<dyn KeyRegistry>,
}

impl std::fmt::Debug for ExhaustionReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExhaustionReporter").finish_non_exhaustive()
    }
}

impl ExhaustionReporter {
    pub fn new(registry: Arc<dyn KeyRegistry>) -> Self {
        Self { registry }
    }

    /// Report a key as exhausted. Empty keys are ignored; registry failures are
    /// logged and swallowed.
    pub async fn report_exhausted(&self, key: &ApiKey) {
        if key.expose().trim().is_empty() {
            return;
        }
        match self.registry.report_key_exhausted(key.expose()).await {
            Ok(()) => debug!(key = %key, "Reported key exhausted"),
            Err(e) => warn!(key = %key, error = %e, "Failed to report exhausted key"),
        }
    }
}
