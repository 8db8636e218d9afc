//! Computation backend abstraction

mod http;

pub use http::HttpBackend;

use crate::payload::RequestOutcome;
use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failures talking to the backend.
///
/// An explicit backend error arrives as [`RequestOutcome::Error`] instead.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Trait for computation backends
#[async_trait]
pub trait CalcBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Run one computation
    async fn calc(&self, mode: &str, expr: &str) -> Result<RequestOutcome, ClientError>;
}

/// Request path for `(mode, expr)`. Both segments are percent-encoded so
/// reserved characters (`/`, `+`, `%`, `&`, `?`, `#`) survive the trip.
pub fn calc_path(mode: &str, expr: &str) -> String {
    format!(
        "/calc/{}/{}",
        urlencoding::encode(mode),
        urlencoding::encode(expr)
    )
}
