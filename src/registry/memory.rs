//! In-process key pool.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{KeyRegistry, RegistryError};

#[derive(Debug, Default)]
struct PoolState {
    keys: Vec<String>,
    cursor: usize,
    exhausted: HashSet<String>,
    jobs: HashMap<String, String>,
}

/// Round-robin key pool held in memory.
///
/// Suitable for a single process sharing a handful of keys, and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyRegistry {
    state: Arc<Mutex<PoolState>>,
}

impl InMemoryKeyRegistry {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        Self {
            state: Arc::new(Mutex::new(PoolState {
                keys,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>, RegistryError> {
        self.state
            .lock()
            .map_err(|_| RegistryError::Unavailable("key pool lock poisoned".into()))
    }

    /// Add a key to the pool. Re-adding a key clears its exhausted flag.
    pub fn add_key(&self, key: impl Into<String>) {
        let key = key.into();
        if let Ok(mut state) = self.state.lock() {
            state.exhausted.remove(&key);
            if !state.keys.contains(&key) {
                state.keys.push(key);
            }
        }
    }

    /// Keys flagged as exhausted, in pool order.
    pub fn exhausted_keys(&self) -> Vec<String> {
        match self.state.lock() {
            Ok(state) => state
                .keys
                .iter()
                .filter(|k| state.exhausted.contains(*k))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of keys that can still be leased.
    pub fn available(&self) -> usize {
        match self.state.lock() {
            Ok(state) => state
                .keys
                .iter()
                .filter(|k| !state.exhausted.contains(*k))
                .count(),
            Err(_) => 0,
        }
    }

    /// The key last recorded for a job.
    pub fn key_for_job(&self, job_id: &str) -> Option<String> {
        self.state.lock().ok()?.jobs.get(job_id).cloned()
    }

    /// Clear every exhausted flag, e.g. after a daily quota reset.
    pub fn reset_exhausted(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.exhausted.clear();
        }
    }
}

#[async_trait]
impl KeyRegistry for InMemoryKeyRegistry {
    async fn acquire_available_key(&self) -> Result<Option<String>, RegistryError> {
        let mut state = self.lock()?;
        let len = state.keys.len();
        for offset in 0..len {
            let index = (state.cursor + offset) % len;
            if !state.exhausted.contains(&state.keys[index]) {
                state.cursor = (index + 1) % len;
                return Ok(Some(state.keys[index].clone()));
            }
        }
        Ok(None)
    }

    async fn report_key_exhausted(&self, key: &str) -> Result<(), RegistryError> {
        self.lock()?.exhausted.insert(key.to_string());
        Ok(())
    }

    async fn record_key_for_job(&self, job_id: &str, key: &str) -> Result<(), RegistryError> {
        self.lock()?
            .jobs
            .insert(job_id.to_string(), key.to_string());
        Ok(())
    }
}
