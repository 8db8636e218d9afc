//! HTTP backend client

use super::{calc_path, CalcBackend, ClientError};
use crate::payload::RequestOutcome;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// Backend reached over HTTP at `{base_url}/calc/{mode}/{expr}`
pub struct HttpBackend {
    client: Client,
    base_url: String,
    name: String,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let name = format!("http:{}", base_url);

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            name,
        })
    }

    pub fn from_config(config: &crate::ViewConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Full URL for `(mode, expr)`
    pub fn url(&self, mode: &str, expr: &str) -> String {
        format!("{}{}", self.base_url, calc_path(mode, expr))
    }
}

#[async_trait]
impl CalcBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn calc(&self, mode: &str, expr: &str) -> Result<RequestOutcome, ClientError> {
        let url = self.url(mode, expr);
        let start = Instant::now();

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Backend responded"
        );

        // Some backends pair `{"Error":..}` with a non-2xx status
        match serde_json::from_str::<RequestOutcome>(&body) {
            Ok(outcome) => Ok(outcome),
            Err(_) if !status.is_success() => Err(ClientError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ResultPayload;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Echoes the decoded path segments back as plain text
    async fn echo(Path((mode, expr)): Path<(String, String)>) -> Json<RequestOutcome> {
        Json(RequestOutcome::ok(vec![ResultPayload::PlainText {
            title: mode,
            text: expr,
        }]))
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.url("ski", "S K"), "http://localhost:8080/calc/ski/S%20K");
        assert_eq!(backend.name(), "http:http://localhost:8080");
    }

    #[tokio::test]
    async fn test_expression_round_trips_through_server() {
        let base = serve(Router::new().route("/calc/{mode}/{expr}", get(echo))).await;
        let backend = HttpBackend::new(base, Duration::from_secs(5)).unwrap();

        for expr in ["a+b/c", "100% & more", "x?y#z", "λx. x", "  spaced  "] {
            let outcome = backend.calc("lambda", expr).await.unwrap();
            assert_eq!(
                outcome,
                RequestOutcome::ok(vec![ResultPayload::PlainText {
                    title: "lambda".to_string(),
                    text: expr.to_string(),
                }])
            );
        }
    }

    #[tokio::test]
    async fn test_error_outcome_with_error_status() {
        let router = Router::new().route(
            "/calc/{mode}/{expr}",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(RequestOutcome::error("unbound variable y")),
                )
            }),
        );
        let backend = HttpBackend::new(serve(router).await, Duration::from_secs(5)).unwrap();

        let outcome = backend.calc("lambda", "y").await.unwrap();
        assert_eq!(outcome, RequestOutcome::error("unbound variable y"));
    }

    #[tokio::test]
    async fn test_non_json_error_status() {
        let router = Router::new().route(
            "/calc/{mode}/{expr}",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let backend = HttpBackend::new(serve(router).await, Duration::from_secs(5)).unwrap();

        let err = backend.calc("lambda", "x").await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let router = Router::new().route("/calc/{mode}/{expr}", get(|| async { "not json" }));
        let backend = HttpBackend::new(serve(router).await, Duration::from_secs(5)).unwrap();

        let err = backend.calc("lambda", "x").await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend =
            HttpBackend::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let err = backend.calc("lambda", "x").await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
