//! Error types for keyrotor.

pub mod unified;

pub use unified::{ErrorClass, RecoverySuggestion};

use thiserror::Error;

use crate::classify::{self, NormalizedError};

/// Primary error type surfaced by orchestrated operations.
#[derive(Error, Debug)]
pub enum KeyRotorError {
    #[error("System busy: {0}")]
    SystemBusy(String),

    #[error("Quota exceeded on every key after {attempts} attempts: {message}")]
    QuotaExceededRetriesExhausted { attempts: u32, message: String },

    #[error("Billing restricted: {message}")]
    BillingRestricted { message: String },

    #[error("Provider server error (status {status}) after {attempts} attempts: {message}")]
    ProviderServerError {
        status: u16,
        attempts: u32,
        message: String,
    },

    #[error("Provider error (status {}): {message}", display_status(.status))]
    Unclassified {
        status: Option<u16>,
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

impl KeyRotorError {
    /// Map a normalized provider failure onto the caller-facing taxonomy.
    ///
    /// `attempts` is the number of attempts spent when the orchestrator gave up.
    pub fn from_normalized(error: NormalizedError, attempts: u32) -> Self {
        if classify::is_billing(&error) {
            return Self::BillingRestricted {
                message: error.message,
            };
        }
        if classify::is_quota(&error) {
            return Self::QuotaExceededRetriesExhausted {
                attempts,
                message: error.message,
            };
        }
        match error.status_code {
            Some(status) if classify::is_server_error(&error) => Self::ProviderServerError {
                status,
                attempts,
                message: error.message,
            },
            status => Self::Unclassified {
                status,
                message: error.message,
            },
        }
    }

    /// The provider failure behind this error, for re-classification at call sites.
    pub fn normalized(&self) -> Option<NormalizedError> {
        match self {
            Self::QuotaExceededRetriesExhausted { message, .. } => {
                Some(NormalizedError::new(Some(429), message.clone()))
            }
            Self::BillingRestricted { message } => {
                Some(NormalizedError::new(Some(400), message.clone()))
            }
            Self::ProviderServerError {
                status, message, ..
            } => Some(NormalizedError::new(Some(*status), message.clone())),
            Self::Unclassified { status, message } => {
                Some(NormalizedError::new(*status, message.clone()))
            }
            _ => None,
        }
    }

    /// Whether a fallback model should be tried for this failure.
    pub fn is_billing(&self) -> bool {
        self.normalized()
            .map(|n| classify::is_billing(&n))
            .unwrap_or(false)
    }

    /// Classify this error into a class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SystemBusy(_) => ErrorClass::SystemBusy,
            Self::QuotaExceededRetriesExhausted { .. } => ErrorClass::Quota,
            Self::BillingRestricted { .. } => ErrorClass::Billing,
            Self::ProviderServerError { .. } => ErrorClass::Server,
            Self::Cancelled => ErrorClass::Cancelled,
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorClass::Configuration,
            Self::Unclassified { .. } | Self::Io(_) | Self::Serialization(_) => {
                ErrorClass::Unclassified
            }
        }
    }

    /// Whether a later retry of the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::SystemBusy | ErrorClass::Quota | ErrorClass::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.class() {
            ErrorClass::SystemBusy | ErrorClass::Server => RecoverySuggestion::RetryLater,
            ErrorClass::Quota => RecoverySuggestion::AddKeys,
            ErrorClass::Billing => RecoverySuggestion::UseFallbackModel,
            ErrorClass::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorClass::Cancelled => RecoverySuggestion::None,
            ErrorClass::Unclassified => RecoverySuggestion::ContactSupport,
        }
    }

    /// Single end-user message shown once the retry and fallback budget is spent.
    pub fn user_message(&self) -> &'static str {
        match self.class() {
            ErrorClass::SystemBusy | ErrorClass::Server => {
                "The service is temporarily unavailable. Please try again in a moment."
            }
            ErrorClass::Quota => {
                "The service is handling too many requests right now. Please try again later."
            }
            ErrorClass::Billing => "This feature is not available on the current plan.",
            ErrorClass::Cancelled => "The request was cancelled.",
            ErrorClass::Configuration => "The request could not be processed.",
            ErrorClass::Unclassified => "Generation failed. Please try again.",
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KeyRotorError>;
