//! BigQuery REST Sources
//!
//! Two remote stages share one client:
//! - the JSON table holds a pre-aggregated export blob, one row per export
//! - the structured table holds one row per token record

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::LoadError;
use crate::models::SourceOrigin;
use crate::normalize::normalize_object;
use crate::sources::{parse_envelope, parse_timestamp, RecordSource, SourcePayload};

pub const BIGQUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const STRUCTURED_ROW_LIMIT: u32 = 1000;
static NULL: Value = Value::Null;

/// Columns selected from the structured table.
const STRUCTURED_COLUMNS: &[&str] = &[
    "tokenType",
    "sageTeam",
    "srpAdUseCase",
    "textAdComponents",
    "tokenCategory",
    "sdsToken",
    "surface",
    "theme",
    "currentSdsValue",
    "upcomingSdsValue",
    "sdsLaunchTarget",
    "sdsStatus",
    "sdsPoc",
    "sdsLaunchDoc",
    "affStatus",
    "leName",
    "leTargetLaunchQuarter",
    "impactLevel",
    "recordCount",
    "lastUpdated",
    "uniqueKey",
];

#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub api_base: String,
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    pub json_table_id: String,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            api_base: BIGQUERY_API_BASE.to_string(),
            project_id: "aff-2025-fe-14wnaz".to_string(),
            dataset_id: "sds_tokens".to_string(),
            table_id: "token_launches".to_string(),
            json_table_id: "token_launches_json".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
}

/// Subset of the `jobs.query` response we read.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<QuerySchema>,
    #[serde(default)]
    pub rows: Option<Vec<QueryRow>>,
    #[serde(default)]
    pub error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
pub struct QuerySchema {
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRow {
    pub f: Vec<QueryCell>,
}

#[derive(Debug, Deserialize)]
pub struct QueryCell {
    #[serde(default)]
    pub v: Value,
}

#[derive(Debug, Deserialize)]
pub struct QueryError {
    #[serde(default)]
    pub message: String,
}

/// One row of the JSON export table.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub blob: Value,
    pub record_count: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub export_timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct BigQueryClient {
    client: Client,
    config: BigQueryConfig,
}

impl BigQueryClient {
    pub fn new(client: Client, config: BigQueryConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &BigQueryConfig {
        &self.config
    }

    #[inline]
    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.config.api_base.trim_end_matches('/'),
            self.config.project_id
        )
    }

    fn table_ref(&self, table: &str) -> String {
        format!(
            "`{}.{}.{}`",
            self.config.project_id, self.config.dataset_id, table
        )
    }

    pub fn json_table_sql(&self) -> String {
        format!(
            "SELECT json_data, record_count, last_updated, export_timestamp FROM {} \
             ORDER BY export_timestamp DESC LIMIT 1",
            self.table_ref(&self.config.json_table_id)
        )
    }

    pub fn structured_table_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY lastUpdated DESC LIMIT {}",
            STRUCTURED_COLUMNS.join(", "),
            self.table_ref(&self.config.table_id),
            STRUCTURED_ROW_LIMIT
        )
    }

    /// Run a standard-SQL query with a bearer token.
    pub async fn run_query(
        &self,
        source_name: &'static str,
        token: &str,
        sql: &str,
    ) -> Result<QueryResponse, LoadError> {
        debug!(source = source_name, "Running BigQuery query");

        let resp = self
            .client
            .post(self.queries_url())
            .bearer_auth(token)
            .json(&QueryRequest {
                query: sql,
                use_legacy_sql: false,
            })
            .send()
            .await
            .map_err(|e| LoadError::transport(source_name, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LoadError::Transport {
                source_name,
                status: Some(status.as_u16()),
                message: format!("BigQuery API error: {}", text.trim()),
            });
        }

        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| LoadError::invalid(source_name, format!("query response: {e}")))?;

        if let Some(err) = &body.error {
            return Err(LoadError::invalid(
                source_name,
                format!("BigQuery query error: {}", err.message),
            ));
        }

        Ok(body)
    }

    /// Latest export row from the JSON table, blob decoded from its string cell.
    pub async fn latest_export(&self, token: &str) -> Result<Option<ExportRow>, LoadError> {
        const NAME: &str = "bigquery-json";
        let response = self.run_query(NAME, token, &self.json_table_sql()).await?;

        let Some(row) = response.rows.as_ref().and_then(|rows| rows.first()) else {
            return Ok(None);
        };
        let cell = |i: usize| row.f.get(i).map(|c| &c.v).unwrap_or(&NULL);

        let Value::String(raw) = cell(0) else {
            return Err(LoadError::invalid(NAME, "json_data cell is not a string"));
        };
        let blob = serde_json::from_str(raw)
            .map_err(|e| LoadError::invalid(NAME, format!("json_data is not valid JSON: {e}")))?;

        Ok(Some(ExportRow {
            blob,
            record_count: cell(1).as_str().and_then(|c| c.parse().ok()),
            last_updated: parse_timestamp(cell(2)),
            export_timestamp: parse_timestamp(cell(3)),
        }))
    }

    /// Structured rows zipped with schema field names, values verbatim.
    pub async fn structured_rows(&self, token: &str) -> Result<Vec<Map<String, Value>>, LoadError> {
        const NAME: &str = "bigquery-structured";
        let response = self
            .run_query(NAME, token, &self.structured_table_sql())
            .await?;

        let (Some(schema), Some(rows)) = (response.schema, response.rows) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                schema
                    .fields
                    .iter()
                    .zip(row.f)
                    .map(|(field, cell)| (field.name.clone(), cell.v))
                    .collect()
            })
            .collect())
    }
}

/// Primary stage: the pre-aggregated export blob.
pub struct BigQueryJsonSource {
    client: BigQueryClient,
}

impl BigQueryJsonSource {
    pub fn new(client: BigQueryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for BigQueryJsonSource {
    fn name(&self) -> &'static str {
        "bigquery-json"
    }

    fn requires_credential(&self) -> bool {
        true
    }

    async fn fetch(&self, credential: Option<&str>) -> Result<Option<SourcePayload>, LoadError> {
        let Some(token) = credential else {
            return Ok(None);
        };
        let Some(export) = self.client.latest_export(token).await? else {
            return Ok(None);
        };

        let (records, declared) = parse_envelope(self.name(), export.blob)?;
        let as_of = declared.or(export.last_updated);
        info!("✅ Loaded {} records from BigQuery JSON table", records.len());

        Ok(Some(SourcePayload {
            records,
            as_of,
            origin: SourceOrigin::BigqueryJson,
        }))
    }
}

/// Secondary stage: row-oriented structured table.
pub struct BigQueryStructuredSource {
    client: BigQueryClient,
}

impl BigQueryStructuredSource {
    pub fn new(client: BigQueryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for BigQueryStructuredSource {
    fn name(&self) -> &'static str {
        "bigquery-structured"
    }

    fn requires_credential(&self) -> bool {
        true
    }

    async fn fetch(&self, credential: Option<&str>) -> Result<Option<SourcePayload>, LoadError> {
        let Some(token) = credential else {
            return Ok(None);
        };
        let rows = self.client.structured_rows(token).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let as_of = rows
            .first()
            .and_then(|row| row.get("lastUpdated"))
            .and_then(parse_timestamp);
        let records: Vec<_> = rows.iter().map(normalize_object).collect();
        info!(
            "✅ Loaded {} records from BigQuery structured table",
            records.len()
        );

        Ok(Some(SourcePayload {
            records,
            as_of,
            origin: SourceOrigin::BigqueryStructured,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> BigQueryClient {
        BigQueryClient::new(Client::new(), BigQueryConfig::default())
    }

    #[test]
    fn test_query_text() {
        let c = client();
        assert_eq!(
            c.json_table_sql(),
            "SELECT json_data, record_count, last_updated, export_timestamp \
             FROM `aff-2025-fe-14wnaz.sds_tokens.token_launches_json` \
             ORDER BY export_timestamp DESC LIMIT 1"
        );
        let structured = c.structured_table_sql();
        assert!(structured.starts_with("SELECT tokenType, sageTeam, "));
        assert!(structured.ends_with("ORDER BY lastUpdated DESC LIMIT 1000"));
        assert_eq!(
            c.queries_url(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/aff-2025-fe-14wnaz/queries"
        );
    }

    #[test]
    fn test_query_response_shapes() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "schema": {"fields": [{"name": "tokenType", "type": "STRING"}]},
            "rows": [{"f": [{"v": "Color"}]}, {"f": [{"v": null}]}],
            "totalRows": "2",
        }))
        .unwrap();
        assert_eq!(resp.rows.unwrap().len(), 2);
        assert!(resp.error.is_none());

        let resp: QueryResponse =
            serde_json::from_value(json!({"error": {"message": "Not found: Table"}})).unwrap();
        assert_eq!(resp.error.unwrap().message, "Not found: Table");
    }

    #[tokio::test]
    async fn test_missing_credential_is_skip() {
        let json = BigQueryJsonSource::new(client());
        assert!(json.fetch(None).await.unwrap().is_none());
        let structured = BigQueryStructuredSource::new(client());
        assert!(structured.fetch(None).await.unwrap().is_none());
    }
}
