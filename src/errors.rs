//! Load Error Taxonomy
//! Mission: Keep remote failures quiet and local failures actionable

use thiserror::Error;

/// Instructions shown to the user when the static data file is missing.
pub const LOCAL_SOURCE_REMEDIATION: &str = "Local data file not found. \
Refresh the dashboard data: \
1. Run `sds-dashboard sync` (or export the sheet with exportForDashboard), \
2. Replace data/tokens-data.json with the exported JSON, \
3. Redeploy or press Retry.";

/// Errors produced while loading token records.
///
/// Remote stages swallow these after logging; only the final (local) stage
/// hands them back to the caller.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{source_name} transport error{}: {message}", status_suffix(.status))]
    Transport {
        source_name: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("invalid data format from {source_name}: {details}")]
    InvalidDataFormat {
        source_name: &'static str,
        details: String,
    },

    #[error("local data source unavailable at {location}")]
    LocalSourceUnavailable { location: String },

    #[error("{source_name} timed out after {seconds}s")]
    Timeout {
        source_name: &'static str,
        seconds: u64,
    },

    #[error("no data available from any source")]
    NoDataAvailable,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl LoadError {
    pub fn transport(source_name: &'static str, message: impl Into<String>) -> Self {
        LoadError::Transport {
            source_name,
            status: None,
            message: message.into(),
        }
    }

    pub fn invalid(source_name: &'static str, details: impl Into<String>) -> Self {
        LoadError::InvalidDataFormat {
            source_name,
            details: details.into(),
        }
    }

    /// User-facing remediation text, if this error has one.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            LoadError::LocalSourceUnavailable { .. } => Some(LOCAL_SOURCE_REMEDIATION),
            _ => None,
        }
    }

    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::Transport { .. } => "transport_error",
            LoadError::InvalidDataFormat { .. } => "invalid_data_format",
            LoadError::LocalSourceUnavailable { .. } => "local_source_unavailable",
            LoadError::Timeout { .. } => "timeout",
            LoadError::NoDataAvailable => "no_data_available",
        }
    }
}
