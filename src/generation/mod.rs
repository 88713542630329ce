//! Generation operations.
//!
//! Each operation builds its provider payload, wraps exactly one provider
//! interaction as a unit of work, and submits it to the [`Orchestrator`].
//! Only primary image generation has a fallback path.

pub mod convenience;
pub mod image;
pub mod text;
pub mod video;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{KeyRotorError, Result};
use crate::models::ModelSettings;
use crate::retry::{Orchestrator, RunOptions};

/// Default poll interval for long-running video jobs.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Entry point for every generation operation.
#[derive(Debug, Clone)]
pub struct Generator {
    orchestrator: Orchestrator,
    models: ModelSettings,
    poll_interval: Duration,
    cancel: Option<CancellationToken>,
}

impl Generator {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            models: ModelSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }

    pub fn with_models(mut self, models: ModelSettings) -> Self {
        self.models = models;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Abort in-flight and future operations of this generator when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn models(&self) -> &ModelSettings {
        &self.models
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    fn run_options(&self, job_id: Option<&str>) -> RunOptions {
        RunOptions {
            job_id: job_id.map(str::to_string),
            cancel: self.cancel.clone(),
            max_attempts: None,
        }
    }
}

fn require_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(KeyRotorError::InvalidArgument("prompt must not be empty".into()));
    }
    Ok(())
}
