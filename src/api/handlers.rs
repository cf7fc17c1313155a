use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::api::{ApiError, FilterQuery};
use crate::dashboard::{DashboardController, RefreshSummary};
use crate::filters::FilterMenu;
use crate::views::{GroupDetails, OverviewView, TableRow};

pub type DashboardState = Arc<DashboardController>;

fn require_data(controller: &DashboardController) -> Result<(), ApiError> {
    let snapshot = controller.snapshot();
    if snapshot.has_data() {
        Ok(())
    } else {
        Err(ApiError::Unavailable(snapshot.last_error))
    }
}

pub async fn health_check(State(controller): State<DashboardState>) -> Json<Value> {
    let snapshot = controller.snapshot();
    Json(json!({
        "status": "ok",
        "loaded": snapshot.has_data(),
        "records": snapshot.records.len(),
        "origin": snapshot.origin,
        "lastUpdated": snapshot.as_of,
    }))
}

pub async fn get_overview(
    State(controller): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<OverviewView>, ApiError> {
    let filter = query.active_filter()?;
    require_data(&controller)?;
    Ok(Json(controller.overview(filter.as_ref(), Utc::now())))
}

pub async fn get_records(
    State(controller): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<TableRow>>, ApiError> {
    let filter = query.active_filter()?;
    require_data(&controller)?;
    Ok(Json(controller.table(filter.as_ref())))
}

pub async fn get_filters(
    State(controller): State<DashboardState>,
) -> Result<Json<Vec<FilterMenu>>, ApiError> {
    require_data(&controller)?;
    Ok(Json(controller.filter_menus()))
}

pub async fn get_group(
    State(controller): State<DashboardState>,
    Path(name): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<GroupDetails>, ApiError> {
    let filter = query.active_filter()?;
    require_data(&controller)?;
    controller
        .group_details(&name, filter.as_ref())
        .map(Json)
        .ok_or(ApiError::GroupNotFound(name))
}

/// Manual retry of the whole chain.
pub async fn post_refresh(
    State(controller): State<DashboardState>,
) -> Result<Json<RefreshSummary>, ApiError> {
    info!("🔄 Manual refresh requested");
    Ok(Json(controller.refresh().await?))
}
