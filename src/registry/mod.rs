//! Shared API-key registry seam.
//!
//! The registry owns the key pool. This crate only leases keys from it, flags
//! keys as exhausted, and links keys to jobs for auditing. Atomic leasing across
//! concurrent workers is the registry's responsibility.

pub mod memory;
pub mod rpc;

pub use memory::InMemoryKeyRegistry;
pub use rpc::{RpcKeyRegistry, RpcRegistryConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by registry adapters.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid registry response: {0}")]
    Decode(String),
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

/// Operations the orchestrator needs from the external key pool.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Lease one currently usable key, or `None` when the pool is drained.
    async fn acquire_available_key(&self) -> Result<Option<String>, RegistryError>;

    /// Flag a key as exhausted. Marking an already exhausted key is a no-op.
    async fn report_key_exhausted(&self, key: &str) -> Result<(), RegistryError>;

    /// Record which key served a job.
    async fn record_key_for_job(&self, job_id: &str, key: &str) -> Result<(), RegistryError>;
}
