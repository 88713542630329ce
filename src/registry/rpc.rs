//! Key registry backed by database RPC functions exposed over HTTP.
//!
//! Targets a PostgREST-style backend: functions live under `/rest/v1/rpc/` and
//! tables under `/rest/v1/`. Leasing and exhaustion marking must be atomic in
//! the database functions themselves.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keys::redact;
use crate::provider::http::shared_client;

use super::{KeyRegistry, RegistryError};

fn default_acquire_fn() -> String {
    "get_available_key".to_string()
}

fn default_exhaust_fn() -> String {
    "mark_key_exhausted".to_string()
}

fn default_key_column() -> String {
    "key_value".to_string()
}

fn default_jobs_table() -> String {
    "generation_jobs".to_string()
}

fn default_job_key_column() -> String {
    "api_key_used".to_string()
}

/// Connection settings for [`RpcKeyRegistry`].
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcRegistryConfig {
    pub url: String,
    pub service_key: String,
    #[serde(default = "default_acquire_fn")]
    pub acquire_fn: String,
    #[serde(default = "default_exhaust_fn")]
    pub exhaust_fn: String,
    /// Column holding the key when the lease function returns a row.
    #[serde(default = "default_key_column")]
    pub key_column: String,
    #[serde(default = "default_jobs_table")]
    pub jobs_table: String,
    #[serde(default = "default_job_key_column")]
    pub job_key_column: String,
}

impl std::fmt::Debug for RpcRegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcRegistryConfig")
            .field("url", &self.url)
            .field("service_key", &redact(&self.service_key))
            .field("acquire_fn", &self.acquire_fn)
            .field("exhaust_fn", &self.exhaust_fn)
            .field("key_column", &self.key_column)
            .field("jobs_table", &self.jobs_table)
            .field("job_key_column", &self.job_key_column)
            .finish()
    }
}

impl RpcRegistryConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_key: service_key.into(),
            acquire_fn: default_acquire_fn(),
            exhaust_fn: default_exhaust_fn(),
            key_column: default_key_column(),
            jobs_table: default_jobs_table(),
            job_key_column: default_job_key_column(),
        }
    }
}

/// HTTP adapter for a database-hosted key pool.
#[derive(Debug, Clone)]
pub struct RpcKeyRegistry {
    config: RpcRegistryConfig,
}

impl RpcKeyRegistry {
    pub fn new(config: RpcRegistryConfig) -> Self {
        Self { config }
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(val) = HeaderValue::from_str(&self.config.service_key) {
            headers.insert("apikey", val);
        }
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", self.config.service_key)) {
            headers.insert(AUTHORIZATION, val);
        }
        headers
    }

    async fn call_rpc(
        &self,
        function: &str,
        args: serde_json::Value,
    ) -> Result<String, RegistryError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base(), function);
        let resp = shared_client()
            .post(&url)
            .headers(self.headers())
            .json(&args)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        if !(200..300).contains(&status) {
            return Err(RegistryError::Http { status, body });
        }
        Ok(body)
    }
}

/// Decode an RPC result that is either a bare JSON string, `null`, or a
/// single-row result set such as `[{"key_value": "...", "id": 7}]`.
///
/// Rows are read by `key_column`. A row without that column is accepted only
/// when it has exactly one string field.
fn decode_key(body: &str, key_column: &str) -> Result<Option<String>, RegistryError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| RegistryError::Decode(e.to_string()))?;
    let key = match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(rows) => match rows.into_iter().next() {
            Some(row) => key_from_row(row, key_column)?,
            None => None,
        },
        row @ serde_json::Value::Object(_) => key_from_row(row, key_column)?,
        other => {
            return Err(RegistryError::Decode(format!(
                "unexpected key payload: {other}"
            )))
        }
    };
    Ok(key.filter(|k| !k.trim().is_empty()))
}

fn key_from_row(row: serde_json::Value, key_column: &str) -> Result<Option<String>, RegistryError> {
    let map = match row {
        serde_json::Value::String(s) => return Ok(Some(s)),
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Object(map) => map,
        other => {
            return Err(RegistryError::Decode(format!(
                "unexpected key row: {other}"
            )))
        }
    };

    if let Some(value) = map.get(key_column) {
        return match value {
            serde_json::Value::String(s) => Ok(Some(s.clone())),
            serde_json::Value::Null => Ok(None),
            other => Err(RegistryError::Decode(format!(
                "column {key_column} is not a string: {other}"
            ))),
        };
    }

    let mut strings = map.values().filter_map(serde_json::Value::as_str);
    match (strings.next(), strings.next()) {
        (Some(only), None) => Ok(Some(only.to_string())),
        (None, _) => Ok(None),
        (Some(_), Some(_)) => Err(RegistryError::Decode(format!(
            "row has no {key_column} column and several string columns"
        ))),
    }
}

#[async_trait]
impl KeyRegistry for RpcKeyRegistry {
    async fn acquire_available_key(&self) -> Result<Option<String>, RegistryError> {
        let body = self
            .call_rpc(&self.config.acquire_fn, serde_json::json!({}))
            .await?;
        let key = decode_key(&body, &self.config.key_column)?;
        debug!(
            function = %self.config.acquire_fn,
            key = %key.as_deref().map(redact).unwrap_or_default(),
            "Leased key from registry"
        );
        Ok(key)
    }

    async fn report_key_exhausted(&self, key: &str) -> Result<(), RegistryError> {
        self.call_rpc(
            &self.config.exhaust_fn,
            serde_json::json!({ "key_value": key }),
        )
        .await?;
        Ok(())
    }

    async fn record_key_for_job(&self, job_id: &str, key: &str) -> Result<(), RegistryError> {
        let url = format!("{}/rest/v1/{}", self.base(), self.config.jobs_table);
        let mut body = serde_json::Map::new();
        body.insert(self.config.job_key_column.clone(), key.into());

        let resp = shared_client()
            .patch(&url)
            .headers(self.headers())
            .query(&[("id", format!("eq.{job_id}"))])
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Http { status, body });
        }
        Ok(())
    }
}
