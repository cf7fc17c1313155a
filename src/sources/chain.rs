use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::errors::LoadError;
use crate::models::{SourceOrigin, TokenRecord};
use crate::sources::{CredentialProvider, RecordSource, SourcePayload};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a successful chain run.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub records: Vec<TokenRecord>,
    /// Payload-declared timestamp, or the load time when none was declared.
    pub as_of: DateTime<Utc>,
    pub origin: SourceOrigin,
}

/// Remote stages in order, then an optional fallback stage.
///
/// Remote failures are logged and swallowed; only the fallback's error
/// reaches the caller.
pub struct DataSourceChain {
    remotes: Vec<Arc<dyn RecordSource>>,
    fallback: Option<Arc<dyn RecordSource>>,
    credentials: Arc<dyn CredentialProvider>,
    remote_timeout: Duration,
}

impl DataSourceChain {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            remotes: Vec::new(),
            fallback: None,
            credentials,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn with_remote(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.remotes.push(source);
        self
    }

    pub fn with_fallback(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.fallback = Some(source);
        self
    }

    pub fn with_remote_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    /// Run the chain top to bottom, stopping at the first usable payload.
    pub async fn load(&self) -> Result<LoadOutcome, LoadError> {
        info!("🔄 Starting data load process...");
        let credential = self.credentials.access_token();

        for source in &self.remotes {
            if source.requires_credential() && credential.is_none() {
                info!(
                    source = source.name(),
                    "📝 No authentication available, skipping"
                );
                continue;
            }

            if let Some(payload) = self.try_remote(source.as_ref(), credential.as_deref()).await {
                return Ok(Self::finish(payload));
            }
        }

        let Some(fallback) = &self.fallback else {
            warn!("❌ Every remote source failed and no fallback is configured");
            return Err(LoadError::NoDataAvailable);
        };

        info!(source = fallback.name(), "📁 Falling back to local data...");
        match fallback.fetch(credential.as_deref()).await {
            Ok(Some(payload)) => Ok(Self::finish(payload)),
            Ok(None) => Err(LoadError::NoDataAvailable),
            Err(e) => {
                warn!(source = fallback.name(), error = %e, "❌ Error loading local data");
                Err(e)
            }
        }
    }

    async fn try_remote(
        &self,
        source: &dyn RecordSource,
        credential: Option<&str>,
    ) -> Option<SourcePayload> {
        let start = Instant::now();
        info!(source = source.name(), "🔍 Attempting remote data load...");

        match timeout(self.remote_timeout, source.fetch(credential)).await {
            Ok(Ok(Some(payload))) => {
                info!(
                    source = source.name(),
                    records = payload.records.len(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "✅ Remote load succeeded"
                );
                Some(payload)
            }
            Ok(Ok(None)) => {
                info!(source = source.name(), "⚠️ Remote source returned no usable payload");
                None
            }
            Ok(Err(e)) => {
                warn!(
                    source = source.name(),
                    error = %e,
                    "⚠️ Remote load failed (non-critical)"
                );
                None
            }
            Err(_) => {
                let err = LoadError::Timeout {
                    source_name: source.name(),
                    seconds: self.remote_timeout.as_secs(),
                };
                warn!(source = source.name(), error = %err, "⚠️ Remote load timed out");
                None
            }
        }
    }

    fn finish(payload: SourcePayload) -> LoadOutcome {
        LoadOutcome {
            records: payload.records,
            as_of: payload.as_of.unwrap_or_else(Utc::now),
            origin: payload.origin,
        }
    }
}
