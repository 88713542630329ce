//! Caller-facing error classes and recovery hints.

use serde::{Deserialize, Serialize};

/// Broad error class for routing recovery logic and user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// No key could be leased from the registry.
    SystemBusy,
    /// Every key tried hit its quota within the attempt budget.
    Quota,
    /// The account or tier cannot use the requested model.
    Billing,
    /// Upstream 500/503 that outlasted the attempt budget.
    Server,
    Cancelled,
    Configuration,
    Unclassified,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryLater,
    AddKeys,
    UseFallbackModel,
    CheckConfiguration,
    ContactSupport,
    None,
}
