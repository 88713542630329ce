//! API keys leased from the shared pool, and the two narrow registry
//! interactions built on top of them: provisioning and exhaustion reporting.

pub mod provisioner;
pub mod reporter;

pub use provisioner::{KeyProvisioner, Lease, SystemBusy};
pub use reporter::ExhaustionReporter;

use std::fmt;

/// An opaque provider credential.
///
/// `Debug` and `Display` only ever show the last four characters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for request signing only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Redacted form suitable for logs and UI.
    pub fn redacted(&self) -> String {
        redact(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Keep only the last four characters of a secret.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "…".repeat(usize::from(!chars.is_empty()));
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("…{tail}")
}
