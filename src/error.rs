//! Error types for the pricing engine

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced to callers of the pricing engine.
///
/// Guard holds and missing optional metrics are never errors; they come back
/// as regular [`Decision`](crate::Decision) values.
#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No log entry for {sku} at {recorded_at}")]
    EntryNotFound {
        sku: String,
        recorded_at: DateTime<Utc>,
    },

    #[error("Config source error: {0}")]
    Source(String),

    #[error("Evaluation task failed: {0}")]
    TaskFailed(String),
}

impl From<serde_yaml::Error> for PricingError {
    fn from(e: serde_yaml::Error) -> Self {
        PricingError::ConfigParse(format!("YAML: {}", e))
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::ConfigParse(format!("JSON: {}", e))
    }
}

pub type PricingResult<T> = std::result::Result<T, PricingError>;
