// src/errors.rs
use thiserror::Error;

/// Internal failure classification. Public operations in the services layer
/// never surface these to callers; each one is converted into the operation's
/// structured result type at the point it occurs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Response parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON parsing error: {}", err))
    }
}

impl AppError {
    pub fn gateway(msg: impl Into<String>) -> Self {
        AppError::Gateway(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
