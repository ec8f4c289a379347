use crate::domain::models::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid interval for {subject}: end {end} is not after start {start}")]
    InvalidInterval {
        subject: String,
        start: Instant,
        end: Instant,
    },
    #[error("invalid view parameter {parameter}: {value}")]
    InvalidViewParameters {
        parameter: &'static str,
        value: String,
    },
    #[error("date out of range: {0}")]
    DateOutOfRange(String),
    #[error("invalid event record: {0}")]
    InvalidEventRecord(String),
    #[error("event snapshot unavailable: {0}")]
    SnapshotUnavailable(String),
    #[error("upstream event source error: {message}")]
    Upstream { message: String, retryable: bool },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub(crate) fn view_parameter(parameter: &'static str, value: impl ToString) -> Self {
        Self::InvalidViewParameters {
            parameter,
            value: value.to_string(),
        }
    }
}
