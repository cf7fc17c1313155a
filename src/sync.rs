//! Local Export Sync
//! Mission: Pull the latest export blob and refresh the static data file

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::sources::{parse_timestamp, BigQueryClient, ExportRow};

pub const DEFAULT_OUTPUT: &str = "./data/tokens-data.json";
const SYNC_SOURCE: &str = "sds-dashboard sync";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub output: PathBuf,
    pub verify: bool,
    pub quiet: bool,
}

/// Age bucket of the export's declared timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAge {
    Fresh,
    OverAnHour,
    OverADay,
}

impl DataAge {
    pub fn from_hours(hours: f64) -> Self {
        if hours > 24.0 {
            DataAge::OverADay
        } else if hours > 1.0 {
            DataAge::OverAnHour
        } else {
            DataAge::Fresh
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DataAge::Fresh => "✅ Data is fresh",
            DataAge::OverAnHour => "⚠️ Warning: Data is more than 1 hour old",
            DataAge::OverADay => "⚠️ Warning: Data is more than 24 hours old",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
    pub record_count: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub age: Option<(f64, DataAge)>,
}

/// Attach the `bigquerySync` block describing where the blob came from.
pub fn add_sync_metadata(
    blob: &mut Value,
    export: &ExportRow,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    let Some(object) = blob.as_object_mut() else {
        bail!("export blob is not a JSON object");
    };
    object.insert(
        "bigquerySync".to_string(),
        json!({
            "syncedAt": synced_at.to_rfc3339(),
            "source": SYNC_SOURCE,
            "bigqueryUpdated": export.last_updated.map(|t| t.to_rfc3339()),
            "exportTimestamp": export.export_timestamp.map(|t| t.to_rfc3339()),
        }),
    );
    Ok(())
}

/// Hours since the blob's `lastUpdated`, with its bucket.
pub fn data_age(blob: &Value, now: DateTime<Utc>) -> Option<(f64, DataAge)> {
    let last_updated = blob.get("lastUpdated").and_then(parse_timestamp)?;
    let hours = (now - last_updated).num_seconds() as f64 / 3600.0;
    Some((hours, DataAge::from_hours(hours)))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Move any existing file aside to `<path>.backup`, then write pretty JSON.
pub async fn write_output(path: &Path, blob: &Value) -> Result<Option<PathBuf>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let backup = if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let backup = backup_path(path);
        tokio::fs::rename(path, &backup)
            .await
            .with_context(|| format!("Failed to back up {}", path.display()))?;
        info!("📁 Backed up existing file to: {}", backup.display());
        Some(backup)
    } else {
        None
    };

    let body = serde_json::to_string_pretty(blob).context("Failed to serialize export")?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(backup)
}

/// Fetch the newest export and write it to `options.output`.
pub async fn run_sync(
    client: &BigQueryClient,
    token: Option<String>,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let Some(token) = token else {
        bail!("No BigQuery access token configured (set BIGQUERY_ACCESS_TOKEN)");
    };

    let config = client.config();
    info!(
        "🔍 Querying BigQuery: {}.{}.{}",
        config.project_id, config.dataset_id, config.json_table_id
    );

    let Some(export) = client
        .latest_export(&token)
        .await
        .context("BigQuery query failed")?
    else {
        bail!("No data found in BigQuery table");
    };

    let record_count = export
        .record_count
        .or_else(|| export.blob.get("recordCount").and_then(Value::as_u64));
    let last_updated = export
        .blob
        .get("lastUpdated")
        .and_then(parse_timestamp)
        .or(export.last_updated);

    let mut blob = export.blob.clone();
    add_sync_metadata(&mut blob, &export, Utc::now())?;

    let age = if options.verify {
        let age = data_age(&blob, Utc::now());
        match age {
            Some((hours, bucket)) => {
                if !options.quiet {
                    println!("📅 Data age: {hours:.1} hours");
                    println!("{}", bucket.message());
                }
            }
            None => warn!("⚠️ Could not verify data freshness: no lastUpdated"),
        }
        age
    } else {
        None
    };

    let backup = write_output(&options.output, &blob).await?;
    info!("✅ Updated local file: {}", options.output.display());

    Ok(SyncReport {
        output: options.output.clone(),
        backup,
        record_count,
        last_updated,
        age,
    })
}
