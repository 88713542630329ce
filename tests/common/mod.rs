//! Shared test helpers: registries that record what the orchestrator does.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use keyrotor::registry::{InMemoryKeyRegistry, KeyRegistry, RegistryError};
use keyrotor::retry::RotationPolicy;

/// Wraps an in-memory pool and records every call made against it.
#[derive(Clone, Default)]
pub struct RecordingRegistry {
    pub pool: InMemoryKeyRegistry,
    acquires: Arc<AtomicUsize>,
    reports: Arc<Mutex<Vec<String>>>,
}

impl RecordingRegistry {
    pub fn with_keys(keys: &[&str]) -> Self {
        Self {
            pool: InMemoryKeyRegistry::new(keys.iter().copied()),
            ..Default::default()
        }
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }

    pub fn shared(&self) -> Arc<dyn KeyRegistry> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl KeyRegistry for RecordingRegistry {
    async fn acquire_available_key(&self) -> Result<Option<String>, RegistryError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.pool.acquire_available_key().await
    }

    async fn report_key_exhausted(&self, key: &str) -> Result<(), RegistryError> {
        self.reports.lock().unwrap().push(key.to_string());
        self.pool.report_key_exhausted(key).await
    }

    async fn record_key_for_job(&self, job_id: &str, key: &str) -> Result<(), RegistryError> {
        self.pool.record_key_for_job(job_id, key).await
    }
}

/// Hands out a fixed sequence of lease results, ignoring exhaustion reports.
///
/// Models a racing registry that keeps returning a key another worker has
/// not yet seen marked exhausted.
#[derive(Clone, Default)]
pub struct ScriptedRegistry {
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    reports: Arc<Mutex<Vec<String>>>,
    fail_writes: bool,
    report_delay: Option<Duration>,
}

impl ScriptedRegistry {
    pub fn new(script: &[Option<&str>]) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                script.iter().map(|k| k.map(str::to_string)).collect(),
            )),
            ..Default::default()
        }
    }

    /// Every report and audit write fails.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Every exhaustion report takes `delay` before it returns.
    pub fn slow_reports(mut self, delay: Duration) -> Self {
        self.report_delay = Some(delay);
        self
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }

    pub fn shared(&self) -> Arc<dyn KeyRegistry> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl KeyRegistry for ScriptedRegistry {
    async fn acquire_available_key(&self) -> Result<Option<String>, RegistryError> {
        Ok(self.script.lock().unwrap().pop_front().flatten())
    }

    async fn report_key_exhausted(&self, key: &str) -> Result<(), RegistryError> {
        self.reports.lock().unwrap().push(key.to_string());
        if let Some(delay) = self.report_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes {
            return Err(RegistryError::Unavailable("registry offline".into()));
        }
        Ok(())
    }

    async fn record_key_for_job(&self, _job_id: &str, _key: &str) -> Result<(), RegistryError> {
        if self.fail_writes {
            return Err(RegistryError::Http {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(())
    }
}

/// Policy with millisecond pauses for tests that talk to a mock server.
pub fn fast_policy(max_attempts: u32) -> RotationPolicy {
    RotationPolicy {
        max_attempts,
        busy_delay: Duration::from_millis(1),
        rotation_delay: Duration::from_millis(1),
        throttle_delay: Duration::from_millis(1),
        throttle_threshold: 3,
        server_error_delay: Duration::from_millis(1),
        unknown_delay: Duration::from_millis(1),
    }
}
