//! Provider error classification.
//!
//! Every failure coming out of a unit of work is reduced to a
//! [`NormalizedError`] before the orchestrator looks at it. Extraction runs in a
//! fixed order and later steps only fill in what earlier steps left empty:
//!
//! 1. a status carried directly by the failure (HTTP status, response status),
//! 2. a decoded provider envelope (`{"error": {"code", "message"}}`),
//! 3. a response body holding that envelope as a JSON string,
//! 4. a message that is itself a JSON object or array,
//! 5. status inference from message substrings.
//!
//! Malformed JSON at steps 3 and 4 is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw failure shapes a provider interaction can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawError {
    /// Non-success HTTP response with its status and raw body text.
    Http { status: u16, body: String },
    /// An already-decoded provider envelope, e.g. a failed long-running operation.
    Envelope {
        code: Option<u16>,
        message: Option<String>,
    },
    /// A body without a known status (SDK wrappers, proxies).
    Body(String),
    /// Free-form text: transport failures, empty responses, wrapped SDK messages.
    Message(String),
}

/// Status/message pair every retry decision is made from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub status_code: Option<u16>,
    pub message: String,
}

impl NormalizedError {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

/// Reduce a raw failure to a [`NormalizedError`]. Never fails.
pub fn classify(raw: &RawError) -> NormalizedError {
    let mut status: Option<u16> = None;
    let mut message = String::new();
    let mut body: Option<&str> = None;

    match raw {
        RawError::Http { status: s, body: b } => {
            status = Some(*s);
            message = b.clone();
            body = Some(b);
        }
        RawError::Envelope { code, message: m } => {
            status = *code;
            if let Some(m) = m {
                message = m.clone();
            }
        }
        RawError::Body(b) => {
            message = b.clone();
            body = Some(b);
        }
        RawError::Message(m) => message = m.clone(),
    }

    if let Some(envelope) = body.and_then(parse_envelope) {
        status = status.or(envelope.code);
        if let Some(m) = envelope.message {
            message = m;
        }
    }

    // Envelope messages are sometimes a second JSON-encoded envelope.
    if looks_like_json(&message) {
        if let Some(envelope) = parse_envelope(&message) {
            status = status.or(envelope.code);
            if let Some(m) = envelope.message {
                message = m;
            }
        }
    }

    if status.is_none() {
        status = infer_status(&message);
    }

    NormalizedError {
        status_code: status,
        message,
    }
}

/// Rate limit or quota exhaustion tied to the key that was used.
pub fn is_quota(error: &NormalizedError) -> bool {
    if error.status_code == Some(429) {
        return true;
    }
    let lower = error.message.to_lowercase();
    lower.contains("quota") || lower.contains("exhausted") || lower.contains("429")
}

/// Account or tier cannot use the requested model.
pub fn is_billing(error: &NormalizedError) -> bool {
    if error.status_code != Some(400) {
        return false;
    }
    let lower = error.message.to_lowercase();
    lower.contains("billed users") || lower.contains("billing") || lower.contains("credits")
}

/// Transient upstream failure.
pub fn is_server_error(error: &NormalizedError) -> bool {
    matches!(error.status_code, Some(500) | Some(503))
}

fn infer_status(message: &str) -> Option<u16> {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("quota") || lower.contains("exhausted") {
        Some(429)
    } else if lower.contains("400") || lower.contains("billing") {
        Some(400)
    } else if lower.contains("503") || lower.contains("overloaded") {
        Some(503)
    } else {
        None
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

struct Envelope {
    code: Option<u16>,
    message: Option<String>,
}

fn parse_envelope(text: &str) -> Option<Envelope> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    // Batch endpoints wrap the envelope in a single-element array.
    let value = match value {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    let error = value.get("error")?;
    let code = error
        .get("code")
        .and_then(|c| match c {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .and_then(|c| u16::try_from(c).ok());
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    if code.is_none() && message.is_none() {
        return None;
    }
    Some(Envelope { code, message })
}
