//! Local Static Source
//!
//! Last stage of the chain. Unlike the remote stages its failures reach the
//! caller, so a missing file is reported separately from other failures.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::errors::LoadError;
use crate::models::SourceOrigin;
use crate::sources::{parse_envelope, RecordSource, SourcePayload};

const NAME: &str = "local";

/// Where the static export lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalLocation {
    Url(String),
    File(PathBuf),
}

impl LocalLocation {
    /// `http(s)://` locations are fetched, anything else is a path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            LocalLocation::Url(raw.to_string())
        } else {
            LocalLocation::File(PathBuf::from(raw))
        }
    }

    pub fn display(&self) -> String {
        match self {
            LocalLocation::Url(url) => url.clone(),
            LocalLocation::File(path) => path.display().to_string(),
        }
    }
}

pub struct LocalFileSource {
    location: LocalLocation,
    client: Client,
}

impl LocalFileSource {
    pub fn new(location: LocalLocation, client: Client) -> Self {
        Self { location, client }
    }

    pub fn location(&self) -> &LocalLocation {
        &self.location
    }

    fn unavailable(&self) -> LoadError {
        LoadError::LocalSourceUnavailable {
            location: self.location.display(),
        }
    }

    async fn read_body(&self) -> Result<String, LoadError> {
        match &self.location {
            LocalLocation::Url(url) => {
                let resp = self
                    .client
                    .get(url)
                    .header(header::CACHE_CONTROL, "no-cache")
                    .header(header::CONTENT_TYPE, "application/json")
                    .send()
                    .await
                    .map_err(|e| LoadError::transport(NAME, e.to_string()))?;

                let status = resp.status();
                if status.is_client_error() {
                    return Err(self.unavailable());
                }
                if !status.is_success() {
                    return Err(LoadError::Transport {
                        source_name: NAME,
                        status: Some(status.as_u16()),
                        message: format!(
                            "Local file error: {}",
                            status.canonical_reason().unwrap_or("unexpected status")
                        ),
                    });
                }

                resp.text()
                    .await
                    .map_err(|e| LoadError::transport(NAME, e.to_string()))
            }
            LocalLocation::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(body) => Ok(body),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(self.unavailable()),
                Err(e) => Err(LoadError::transport(NAME, e.to_string())),
            },
        }
    }
}

#[async_trait]
impl RecordSource for LocalFileSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn fetch(&self, _credential: Option<&str>) -> Result<Option<SourcePayload>, LoadError> {
        info!("📁 Loading data from {}", self.location.display());

        let body = self.read_body().await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| LoadError::invalid(NAME, format!("malformed JSON: {e}")))?;
        let (records, as_of) = parse_envelope(NAME, value)?;

        info!("📄 Data loaded from local source: {} records", records.len());

        Ok(Some(SourcePayload {
            records,
            as_of,
            origin: SourceOrigin::Local,
        }))
    }
}
