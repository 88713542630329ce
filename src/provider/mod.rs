//! Provider client bound to a single leased key.

pub mod gemini;
pub mod http;

pub use gemini::{GeminiClient, Operation, DEFAULT_BASE_URL};

use thiserror::Error;

use crate::classify::{classify, NormalizedError, RawError};

/// Failure of one provider interaction inside a unit of work.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Provider error (code {code:?}): {message:?}")]
    Envelope {
        code: Option<u16>,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Project this failure onto the classifier's raw shapes.
    pub fn to_raw(&self) -> RawError {
        match self {
            Self::Http { status, body } => RawError::Http {
                status: *status,
                body: body.clone(),
            },
            Self::Envelope { code, message } => RawError::Envelope {
                code: *code,
                message: message.clone(),
            },
            Self::Network(e) => match e.status() {
                Some(status) => RawError::Http {
                    status: status.as_u16(),
                    body: e.to_string(),
                },
                None => RawError::Message(e.to_string()),
            },
            Self::InvalidResponse(message) => RawError::Message(message.clone()),
        }
    }

    pub fn classify(&self) -> NormalizedError {
        classify(&self.to_raw())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}
