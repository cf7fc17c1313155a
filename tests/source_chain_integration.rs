//! Integration tests for the source chain
//!
//! A throwaway axum server on 127.0.0.1:0 plays both the BigQuery
//! `jobs.query` endpoint and the static export host, so the real reqwest
//! sources run end to end.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use sds_tokens_dashboard::{
    grouping::visible_groups,
    models::{ImpactLevel, SegmentState, SourceOrigin},
    sources::{
        BigQueryClient, BigQueryConfig, BigQueryJsonSource, BigQueryStructuredSource,
        DataSourceChain, LocalFileSource, LocalLocation, RecordSource, StaticCredential,
    },
    sync::{run_sync, SyncOptions},
    LoadError,
};

#[derive(Clone)]
struct Fake {
    json_table: Arc<Mutex<(StatusCode, Value)>>,
    structured_table: Arc<Mutex<(StatusCode, Value)>>,
    local: Arc<Mutex<Option<Value>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl Fake {
    fn new() -> Self {
        Self {
            json_table: Arc::new(Mutex::new((StatusCode::OK, json!({"rows": []})))),
            structured_table: Arc::new(Mutex::new((StatusCode::OK, json!({"rows": []})))),
            local: Arc::new(Mutex::new(None)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn queries(State(fake): State<Fake>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let sql = body["query"].as_str().unwrap_or_default().to_string();
    fake.queries.lock().push(sql.clone());
    let (status, value) = if sql.contains("token_launches_json") {
        fake.json_table.lock().clone()
    } else {
        fake.structured_table.lock().clone()
    };
    (status, Json(value))
}

async fn local_export(State(fake): State<Fake>) -> Result<Json<Value>, StatusCode> {
    fake.local.lock().clone().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn start(fake: Fake) -> String {
    let app = Router::new()
        .route("/projects/:project/queries", post(queries))
        .route("/data/tokens-data.json", get(local_export))
        .route("/data/forbidden.json", get(|| async { StatusCode::FORBIDDEN }))
        .route("/data/broken.json", get(|| async { StatusCode::BAD_GATEWAY }))
        .with_state(fake);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn bigquery(base: &str) -> BigQueryClient {
    BigQueryClient::new(
        reqwest::Client::new(),
        BigQueryConfig {
            api_base: base.to_string(),
            ..BigQueryConfig::default()
        },
    )
}

fn chain(base: &str, token: Option<&str>) -> DataSourceChain {
    let client = bigquery(base);
    DataSourceChain::new(Arc::new(StaticCredential(token.map(str::to_string))))
        .with_remote(Arc::new(BigQueryJsonSource::new(client.clone())))
        .with_remote(Arc::new(BigQueryStructuredSource::new(client)))
        .with_fallback(Arc::new(LocalFileSource::new(
            LocalLocation::Url(format!("{base}/data/tokens-data.json")),
            reqwest::Client::new(),
        )))
}

fn json_table_row(json_data: &str) -> Value {
    json!({
        "schema": {"fields": [
            {"name": "json_data"}, {"name": "record_count"},
            {"name": "last_updated"}, {"name": "export_timestamp"}
        ]},
        "rows": [{"f": [
            {"v": json_data}, {"v": "2"},
            {"v": "1746093600.0"}, {"v": "1746093600.0"}
        ]}],
    })
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn test_local_only_single_record() {
    let fake = Fake::new();
    *fake.local.lock() = Some(json!([{
        "sdsToken": "a.b.c",
        "surface": "Search",
        "tokenType": "Color",
        "affStatus": "LE Planning",
    }]));
    let base = start(fake.clone()).await;

    let outcome = chain(&base, None).load().await.unwrap();
    assert_eq!(outcome.origin, SourceOrigin::Local);
    assert!(fake.queries.lock().is_empty());

    let overview = visible_groups(&outcome.records, now());
    assert_eq!(overview.groups.len(), 1);
    let group = &overview.groups[0];
    assert_eq!(group.name, "Color Changes - c (Search)");
    assert_eq!(group.impact_level(), ImpactLevel::Low);
    assert_eq!(
        group.status_segments(),
        [
            SegmentState::Planning,
            SegmentState::Inactive,
            SegmentState::Inactive,
            SegmentState::Inactive
        ]
    );
}

#[tokio::test]
async fn test_primary_blob_status_history() {
    let fake = Fake::new();
    let blob = json!({
        "success": true,
        "data": [
            {"leName": "Project X", "affStatus": "LE in Progress"},
            {"leName": "Project X", "affStatus": "Recently launched"},
        ],
    });
    *fake.json_table.lock() = (StatusCode::OK, json_table_row(&blob.to_string()));
    let base = start(fake.clone()).await;

    let outcome = chain(&base, Some("token")).load().await.unwrap();
    assert_eq!(outcome.origin, SourceOrigin::BigqueryJson);
    assert_eq!(fake.queries.lock().len(), 1);
    // No lastUpdated in the blob, so the row's timestamp is used.
    assert_eq!(outcome.as_of, Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap());

    let overview = visible_groups(&outcome.records, now());
    let group = &overview.groups[0];
    assert_eq!(group.name, "Project X");
    assert_eq!(
        group.status_segments(),
        [
            SegmentState::Inactive,
            SegmentState::Progress,
            SegmentState::Inactive,
            SegmentState::Launched
        ]
    );
    assert_eq!(group.priority(), 2);
}

#[tokio::test]
async fn test_malformed_primary_falls_through() {
    let fake = Fake::new();
    *fake.json_table.lock() = (StatusCode::OK, json_table_row("{not json"));
    *fake.structured_table.lock() = (
        StatusCode::OK,
        json!({
            "schema": {"fields": [
                {"name": "tokenType"}, {"name": "surface"}, {"name": "lastUpdated"}
            ]},
            "rows": [{"f": [{"v": "Font"}, {"v": "Display"}, {"v": "1746093600.0"}]}],
        }),
    );
    let base = start(fake.clone()).await;

    let outcome = chain(&base, Some("token")).load().await.unwrap();
    assert_eq!(outcome.origin, SourceOrigin::BigqueryStructured);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(fake.queries.lock().len(), 2);

    // Structured table empty too: local wins.
    *fake.structured_table.lock() = (StatusCode::OK, json!({"rows": []}));
    *fake.local.lock() = Some(json!({"success": true, "data": [{"tokenType": "Color"}]}));
    let outcome = chain(&base, Some("token")).load().await.unwrap();
    assert_eq!(outcome.origin, SourceOrigin::Local);
}

#[tokio::test]
async fn test_remote_errors_then_missing_local() {
    let fake = Fake::new();
    *fake.json_table.lock() = (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": {"message": "backend error"}}),
    );
    *fake.structured_table.lock() = (
        StatusCode::FORBIDDEN,
        json!({"error": {"message": "denied"}}),
    );
    let base = start(fake).await;

    let err = chain(&base, Some("token")).load().await.unwrap_err();
    assert!(matches!(err, LoadError::LocalSourceUnavailable { .. }));
    assert!(err.remediation().unwrap().contains("tokens-data.json"));
}

#[tokio::test]
async fn test_local_client_errors_are_unavailable() {
    let base = start(Fake::new()).await;
    let source = |path: &str| {
        LocalFileSource::new(LocalLocation::Url(format!("{base}{path}")), reqwest::Client::new())
    };

    let err = source("/data/forbidden.json").fetch(None).await.unwrap_err();
    assert!(matches!(err, LoadError::LocalSourceUnavailable { .. }));

    let err = source("/data/broken.json").fetch(None).await.unwrap_err();
    assert!(matches!(err, LoadError::Transport { status: Some(502), .. }));
}

#[tokio::test]
async fn test_sync_writes_export() {
    let fake = Fake::new();
    let blob = json!({"success": true, "data": [], "lastUpdated": "2025-05-01T10:00:00Z"});
    *fake.json_table.lock() = (StatusCode::OK, json_table_row(&blob.to_string()));
    let base = start(fake).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("tokens-data.json");
    std::fs::write(&output, "[]").unwrap();

    let options = SyncOptions {
        output: output.clone(),
        verify: true,
        quiet: true,
    };
    let report = run_sync(&bigquery(&base), Some("token".to_string()), &options)
        .await
        .unwrap();

    assert_eq!(report.record_count, Some(2));
    assert!(report.backup.is_some());
    assert!(report.age.is_some());

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["success"], true);
    assert_eq!(written["bigquerySync"]["source"], "sds-dashboard sync");
}
