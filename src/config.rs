//! Application configuration, read from the environment (and `.env`).

use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::{
    BigQueryClient, BigQueryConfig, BigQueryJsonSource, BigQueryStructuredSource, DataSourceChain,
    EnvCredential, LocalFileSource, LocalLocation,
};

pub const DEFAULT_LOCAL_DATA_SOURCE: &str = "./data/tokens-data.json";
pub const DEFAULT_ADMIN_EMAIL: &str = "lopezlozano@google.com";
pub const ACCESS_TOKEN_VAR: &str = "BIGQUERY_ACCESS_TOKEN";
const DEV_SESSION_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub local_data_source: String,
    pub refresh_interval_secs: u64,
    pub remote_timeout_secs: u64,
    pub bigquery: BigQueryConfig,
    pub admin_email: String,
    pub auth_db_path: String,
    pub session_secret: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = BigQueryConfig::default();

        let port = env_or("PORT", "3000").parse().unwrap_or(3000);
        let refresh_interval_secs = env_or("REFRESH_INTERVAL_SECS", "300")
            .parse()
            .unwrap_or(300);
        let remote_timeout_secs = env_or("REMOTE_TIMEOUT_SECS", "10").parse().unwrap_or(10);

        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0"),
            port,
            local_data_source: env_or("LOCAL_DATA_SOURCE", DEFAULT_LOCAL_DATA_SOURCE),
            refresh_interval_secs,
            remote_timeout_secs,
            bigquery: BigQueryConfig {
                api_base: env_or("BIGQUERY_API_BASE", &defaults.api_base),
                project_id: env_or("BIGQUERY_PROJECT_ID", &defaults.project_id),
                dataset_id: env_or("BIGQUERY_DATASET_ID", &defaults.dataset_id),
                table_id: env_or("BIGQUERY_TABLE_ID", &defaults.table_id),
                json_table_id: env_or("BIGQUERY_JSON_TABLE_ID", &defaults.json_table_id),
            },
            admin_email: env_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            auth_db_path: env_or("AUTH_DB_PATH", "./sds_dashboard_auth.db"),
            session_secret: env_or("SESSION_SECRET", DEV_SESSION_SECRET),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }

    pub fn local_location(&self) -> LocalLocation {
        LocalLocation::parse(&self.local_data_source)
    }

    /// JSON table, then structured table, then the static export.
    pub fn source_chain(&self, client: Client) -> DataSourceChain {
        let bigquery = BigQueryClient::new(client.clone(), self.bigquery.clone());
        DataSourceChain::new(Arc::new(EnvCredential::new(ACCESS_TOKEN_VAR)))
            .with_remote(Arc::new(BigQueryJsonSource::new(bigquery.clone())))
            .with_remote(Arc::new(BigQueryStructuredSource::new(bigquery)))
            .with_fallback(Arc::new(LocalFileSource::new(self.local_location(), client)))
            .with_remote_timeout(self.remote_timeout())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }
}

/// Load `.env` from the working directory, then from the crate root.
pub fn load_env() {
    let _ = dotenv::dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
