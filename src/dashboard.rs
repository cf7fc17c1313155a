//! Dashboard Controller
//! Mission: Own the current record set and keep it fresh
//!
//! Every successful load replaces the snapshot wholesale. Loads are
//! serialized: a manual refresh waits for an in-flight load, the timer skips.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::errors::LoadError;
use crate::filters::{filter_menus, ActiveFilter, FilterMenu};
use crate::models::{SourceOrigin, TokenRecord};
use crate::sources::DataSourceChain;
use crate::views::{
    group_details, overview_view, table_rows, Freshness, GroupDetails, OverviewView, TableRow,
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Last load failure, kept for the UI after the error itself is gone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFailure {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<&'static str>,
    pub at: DateTime<Utc>,
}

impl LoadFailure {
    fn from_error(err: &LoadError, at: DateTime<Utc>) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            remediation: err.remediation(),
            at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub records: Arc<Vec<TokenRecord>>,
    pub as_of: Option<DateTime<Utc>>,
    pub origin: Option<SourceOrigin>,
    /// Set once the first load succeeds.
    pub loaded_at: Option<DateTime<Utc>>,
    pub last_error: Option<LoadFailure>,
}

impl DashboardSnapshot {
    pub fn has_data(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn freshness(&self) -> Freshness {
        Freshness {
            last_updated: self.as_of,
            origin: self.origin,
            record_count: self.records.len(),
        }
    }
}

/// Summary of a completed load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub records: usize,
    pub origin: SourceOrigin,
    pub as_of: DateTime<Utc>,
}

pub struct DashboardController {
    chain: DataSourceChain,
    state: RwLock<DashboardSnapshot>,
    in_flight: Mutex<()>,
}

impl DashboardController {
    pub fn new(chain: DataSourceChain) -> Self {
        Self {
            chain,
            state: RwLock::new(DashboardSnapshot::default()),
            in_flight: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().clone()
    }

    /// Load now, waiting for any load already running.
    ///
    /// On failure the previous records stay in place and the error is
    /// remembered in `last_error`.
    pub async fn refresh(&self) -> Result<RefreshSummary, LoadError> {
        let _guard = self.in_flight.lock().await;
        self.load_locked().await
    }

    /// Load unless another load is running. `None` when skipped.
    pub async fn refresh_if_idle(&self) -> Option<Result<RefreshSummary, LoadError>> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Refresh already in flight, skipping tick");
            return None;
        };
        Some(self.load_locked().await)
    }

    async fn load_locked(&self) -> Result<RefreshSummary, LoadError> {
        match self.chain.load().await {
            Ok(outcome) => {
                let summary = RefreshSummary {
                    records: outcome.records.len(),
                    origin: outcome.origin,
                    as_of: outcome.as_of,
                };
                *self.state.write() = DashboardSnapshot {
                    records: Arc::new(outcome.records),
                    as_of: Some(outcome.as_of),
                    origin: Some(outcome.origin),
                    loaded_at: Some(Utc::now()),
                    last_error: None,
                };
                info!(
                    "✅ Dashboard loaded {} records from {}",
                    summary.records,
                    summary.origin.as_str()
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "❌ Dashboard load failed");
                self.state.write().last_error = Some(LoadFailure::from_error(&e, Utc::now()));
                Err(e)
            }
        }
    }

    fn filtered(&self, filter: Option<&ActiveFilter>) -> (DashboardSnapshot, Vec<TokenRecord>) {
        let snapshot = self.snapshot();
        let records = match filter {
            Some(f) if !f.is_cleared() => f.apply(&snapshot.records),
            _ => snapshot.records.as_ref().clone(),
        };
        (snapshot, records)
    }

    /// Overview cards for the visible groups of the (filtered) record set.
    pub fn overview(&self, filter: Option<&ActiveFilter>, now: DateTime<Utc>) -> OverviewView {
        let (snapshot, records) = self.filtered(filter);
        overview_view(&records, now, snapshot.freshness())
    }

    /// Details-table rows of the (filtered) record set.
    pub fn table(&self, filter: Option<&ActiveFilter>) -> Vec<TableRow> {
        let (_, records) = self.filtered(filter);
        table_rows(&records)
    }

    /// Menus are always built from the full, unfiltered set.
    pub fn filter_menus(&self) -> Vec<FilterMenu> {
        filter_menus(&self.snapshot().records)
    }

    pub fn group_details(&self, name: &str, filter: Option<&ActiveFilter>) -> Option<GroupDetails> {
        let (_, records) = self.filtered(filter);
        group_details(&records, name)
    }
}

/// Periodic refresh until `shutdown` flips to true.
///
/// The first tick fires after one full interval; the startup load is the
/// caller's job.
pub fn spawn_refresh_loop(
    controller: Arc<DashboardController>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("⏱️  Auto-refresh every {}s", every.as_secs());
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(Err(e)) = controller.refresh_if_idle().await {
                        warn!(error = %e, "⚠️ Scheduled refresh failed, keeping previous data");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("🛑 Auto-refresh stopped");
                        break;
                    }
                }
            }
        }
    })
}
