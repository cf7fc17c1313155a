//! SDS Tokens Dashboard Backend Library
//!
//! Loads token-change records through the BigQuery/local source chain,
//! groups them into launch entities and serves dashboard view models.

pub mod access;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fields;
pub mod filters;
pub mod grouping;
pub mod middleware;
pub mod models;
pub mod normalize;
pub mod sources;
pub mod sync;
pub mod views;

pub use config::Config;
pub use dashboard::DashboardController;
pub use errors::LoadError;
pub use models::TokenRecord;
