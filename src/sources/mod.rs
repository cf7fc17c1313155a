//! Data Source Chain
//!
//! Ownership model:
//! - `RecordSource` is one stage of the chain (remote query or static file).
//! - `CredentialProvider` hands out the bearer token gating remote stages.
//! - `DataSourceChain` walks the stages in order and stops at first success.

pub mod bigquery;
pub mod chain;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::errors::LoadError;
use crate::models::{SourceOrigin, TokenRecord};
use crate::normalize::normalize_all;

pub use bigquery::{
    BigQueryClient, BigQueryConfig, BigQueryJsonSource, BigQueryStructuredSource, ExportRow,
};
pub use chain::{DataSourceChain, LoadOutcome};
pub use local::{LocalFileSource, LocalLocation};

/// A complete record set produced by one stage.
#[derive(Debug, Clone)]
pub struct SourcePayload {
    pub records: Vec<TokenRecord>,
    /// Timestamp declared by the payload, if any.
    pub as_of: Option<DateTime<Utc>>,
    pub origin: SourceOrigin,
}

/// One stage of the loading chain.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether the stage is skipped when no access token is available.
    fn requires_credential(&self) -> bool;

    /// Fetch a complete record set.
    ///
    /// `Ok(None)` means the stage ran but had nothing usable.
    async fn fetch(&self, credential: Option<&str>) -> Result<Option<SourcePayload>, LoadError>;
}

/// Supplies the bearer token for remote queries.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Fixed token (or none), mostly for tests and the sync command.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(pub Option<String>);

impl CredentialProvider for StaticCredential {
    fn access_token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.trim().is_empty())
    }
}

/// Reads the token from an environment variable on every load, so a token
/// rotated by an external helper is picked up by the next refresh.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn access_token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Accept a bare array of records or `{success, data, lastUpdated?}`.
///
/// An envelope explicitly marked `success: false`, or one without a `data`
/// array, is rejected.
pub fn parse_envelope(
    source_name: &'static str,
    value: Value,
) -> Result<(Vec<TokenRecord>, Option<DateTime<Utc>>), LoadError> {
    match value {
        Value::Array(items) => Ok((normalize_all(&items), None)),
        Value::Object(mut object) => {
            if object.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(LoadError::invalid(source_name, "envelope reports success=false"));
            }
            let Some(Value::Array(items)) = object.remove("data") else {
                return Err(LoadError::invalid(source_name, "envelope has no data array"));
            };
            let as_of = object.get("lastUpdated").and_then(parse_timestamp);
            Ok((normalize_all(&items), as_of))
        }
        other => Err(LoadError::invalid(
            source_name,
            format!("expected array or envelope, got {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a declared freshness timestamp.
///
/// Accepts RFC 3339, BigQuery's `YYYY-MM-DD HH:MM:SS[.f] UTC` text form and
/// epoch seconds (BigQuery REST renders TIMESTAMP cells as `"1.7E9"`-style
/// strings). Values above 1e12 are read as epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let bare = s.trim_end_matches(" UTC");
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(bare, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    s.parse::<f64>().ok().and_then(from_epoch)
}

fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() > 1e12 { raw } else { raw * 1000.0 };
    Utc.timestamp_millis_opt(millis as i64).single()
}
