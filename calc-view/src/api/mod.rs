//! REST/HTML surface for the result view

use crate::controller::{ControllerError, Phase, ResultController, UiState};
use crate::record::{DisplayRecord, RecordState};
use crate::renderer::{smoke_test, DiagramRenderer};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// API state
pub struct ApiState {
    pub controller: Arc<ResultController>,
    pub renderer: Arc<dyn DiagramRenderer>,
}

/// Request to show a calculation
#[derive(Debug, Deserialize)]
pub struct ShowRequest {
    /// Selected mode
    pub mode: String,
    /// Free-text expression
    pub expr: String,
}

/// Current view state
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub phase: Phase,
    #[serde(flatten)]
    pub state: UiState,
}

impl From<UiState> for StateResponse {
    fn from(state: UiState) -> Self {
        Self {
            phase: state.phase(),
            state,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub renderer: String,
    pub renderer_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer_error: Option<String>,
}

/// Create the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/state", get(current_state))
        .route("/show", post(show))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint, renders the sample graph
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let (renderer_ok, renderer_error) = match smoke_test(state.renderer.as_ref()).await {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        renderer: state.renderer.name().to_string(),
        renderer_ok,
        renderer_error,
    })
}

async fn current_state(State(state): State<Arc<ApiState>>) -> Json<StateResponse> {
    Json(state.controller.snapshot().await.into())
}

/// Trigger a request. Responds after the placeholders are in place.
async fn show(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ShowRequest>,
) -> Result<Json<StateResponse>, (StatusCode, String)> {
    match state.controller.trigger(&request.mode, &request.expr).await {
        Ok(_) => Ok(Json(state.controller.snapshot().await.into())),
        Err(ControllerError::InvalidInput(msg)) => Err((StatusCode::BAD_REQUEST, msg)),
    }
}

/// Form submission on the index page
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub mode: Option<String>,
    pub expr: Option<String>,
}

/// Index page. With `mode` and `expr` it runs the request and waits for
/// every record before rendering.
async fn index_page(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, (StatusCode, String)> {
    if let (Some(mode), Some(expr)) = (&query.mode, &query.expr) {
        match state.controller.trigger(mode, expr).await {
            Ok(pending) => pending.settle().await,
            Err(ControllerError::InvalidInput(msg)) => {
                return Err((StatusCode::BAD_REQUEST, msg));
            }
        }
    }

    let snapshot = state.controller.snapshot().await;
    Ok(Html(render_page(&snapshot, state.controller.modes())))
}

/// Render the whole page for a state
pub fn render_page(state: &UiState, modes: &[String]) -> String {
    let mut body = String::new();

    body.push_str(r#"<form method="get" action="/">"#);
    body.push_str(&format!(
        r#"<input id="expr" name="expr" value="{}" placeholder="expression">"#,
        encode_double_quoted_attribute(&state.expression)
    ));
    if modes.is_empty() {
        body.push_str(&format!(
            r#"<input id="mode" name="mode" value="{}" placeholder="mode">"#,
            encode_double_quoted_attribute(&state.mode)
        ));
    } else {
        for (i, mode) in modes.iter().enumerate() {
            let checked = if *mode == state.mode || (state.mode.is_empty() && i == 0) {
                " checked"
            } else {
                ""
            };
            body.push_str(&format!(
                r#"<label><input type="radio" name="mode" value="{0}"{1}> {0}</label>"#,
                encode_double_quoted_attribute(mode),
                checked
            ));
        }
    }
    body.push_str(r#"<button type="submit">Show</button></form>"#);

    if state.error_flag {
        body.push_str(&format!(
            r#"<div class="error">{}</div>"#,
            encode_text(&state.error_message)
        ));
    }

    for record in &state.results {
        body.push_str(&render_record(record));
    }

    format!("{}{}{}", PAGE_HEAD, body, PAGE_TAIL)
}

/// Render one record as a card. Markup from the renderer and the
/// preformatted text are inserted as-is.
pub fn render_record(record: &DisplayRecord) -> String {
    let name = encode_text(&record.name);
    match &record.state {
        RecordState::Pending => {
            format!(r#"<section class="card pending"><h2>{}</h2>...</section>"#, name)
        }
        RecordState::Markup(markup) => {
            format!(r#"<section class="card"><h2>{}</h2>{}</section>"#, name, markup)
        }
        RecordState::Steps(steps) => {
            let mut html = format!(r#"<section class="card multistep"><h2>{}</h2><ol>"#, name);
            for step in steps {
                html.push_str(&format!(
                    "<li><code>{}</code>{}</li>",
                    encode_text(&step.expr),
                    step.rendered_markup
                ));
            }
            html.push_str("</ol></section>");
            html
        }
        RecordState::RenderFailed(detail) | RecordState::Unrecognized(detail) => format!(
            r#"<section class="card failed"><h2>{}</h2><div class="error">{}</div></section>"#,
            name,
            encode_text(detail)
        ),
    }
}

const PAGE_HEAD: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>calc view</title>
    <style>
        :root {
            --bg: #1a1a2e;
            --card: #16213e;
            --accent: #0f3460;
            --highlight: #e94560;
            --text: #eee;
            --error: #f87171;
        }
        body {
            font-family: 'SF Mono', 'Consolas', monospace;
            background: var(--bg);
            color: var(--text);
            padding: 20px;
        }
        form { display: flex; gap: 10px; align-items: center; margin-bottom: 20px; }
        input { background: var(--bg); border: 1px solid var(--accent); color: var(--text); padding: 8px; }
        #expr { flex: 1; }
        button { background: var(--highlight); color: white; border: none; padding: 8px 20px; }
        .card { background: var(--card); border-radius: 12px; padding: 16px; margin-bottom: 16px; }
        .card svg { background: white; max-width: 100%; height: auto; }
        .pending { opacity: 0.5; }
        .error { color: var(--error); }
    </style>
</head>
<body>
"##;

const PAGE_TAIL: &str = "\n</body>\n</html>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CalcBackend, ClientError};
    use crate::mapper::ContentMapper;
    use crate::payload::{RequestOutcome, ResultPayload};
    use crate::record::RenderedStep;
    use crate::renderer::{Markup, RenderError, RendererHandle};
    use async_trait::async_trait;

    struct TextBackend;

    #[async_trait]
    impl CalcBackend for TextBackend {
        fn name(&self) -> &str {
            "text"
        }

        async fn calc(&self, mode: &str, expr: &str) -> Result<RequestOutcome, ClientError> {
            if expr == "fail" {
                return Ok(RequestOutcome::error("cannot parse"));
            }
            Ok(RequestOutcome::ok(vec![
                ResultPayload::PlainText {
                    title: mode.to_string(),
                    text: expr.to_string(),
                },
                ResultPayload::GraphvizFigure {
                    title: "graph".to_string(),
                    source: "digraph {}".to_string(),
                },
            ]))
        }
    }

    struct Svg;

    impl RendererHandle for Svg {
        fn render(&self, _source: &str) -> Result<Markup, RenderError> {
            Ok(Markup::new("<svg></svg>"))
        }
    }

    struct SvgRenderer;

    #[async_trait]
    impl DiagramRenderer for SvgRenderer {
        fn name(&self) -> &str {
            "svg"
        }

        async fn initialize(&self) -> Result<Arc<dyn RendererHandle>, RenderError> {
            Ok(Arc::new(Svg))
        }
    }

    async fn serve() -> String {
        let renderer: Arc<dyn DiagramRenderer> = Arc::new(SvgRenderer);
        let controller = ResultController::new(
            Arc::new(TextBackend),
            ContentMapper::new(Arc::clone(&renderer)),
        )
        .with_modes(vec!["lambda".to_string(), "ski".to_string()]);
        let state = Arc::new(ApiState {
            controller: Arc::new(controller),
            renderer,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_render_record_escapes_names() {
        let html = render_record(&DisplayRecord::steps(
            "<b>",
            vec![RenderedStep {
                expr: "a < b".to_string(),
                rendered_markup: "<svg/>".to_string(),
            }],
        ));
        assert_eq!(
            html,
            r#"<section class="card multistep"><h2>&lt;b&gt;</h2><ol><li><code>a &lt; b</code><svg/></li></ol></section>"#
        );
    }

    #[test]
    fn test_render_page_error_and_modes() {
        let state = UiState {
            mode: "ski".to_string(),
            expression: "S \"K\"".to_string(),
            error_flag: true,
            error_message: "bad <input>".to_string(),
            ..Default::default()
        };
        let html = render_page(&state, &["lambda".to_string(), "ski".to_string()]);
        assert!(html.contains(r#"value="S &quot;K&quot;""#));
        assert!(html.contains(r#"value="ski" checked"#));
        assert!(html.contains(r#"<div class="error">bad &lt;input&gt;</div>"#));
    }

    #[tokio::test]
    async fn test_show_and_state() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/show", base))
            .json(&serde_json::json!({ "mode": "lambda", "expr": "x y" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["generation"], 1);
        assert_eq!(body["results"].as_array().unwrap().len(), 2);

        let invalid = client
            .post(format!("{}/show", base))
            .json(&serde_json::json!({ "mode": "church", "expr": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);

        let failed = client
            .post(format!("{}/show", base))
            .json(&serde_json::json!({ "mode": "ski", "expr": "fail" }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = failed.json().await.unwrap();
        assert_eq!(body["phase"], "failed");
        assert_eq!(body["error_flag"], true);
        assert_eq!(body["error_message"], "cannot parse");

        let state: serde_json::Value = client
            .get(format!("{}/state", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["generation"], 2);
    }

    #[tokio::test]
    async fn test_index_page_runs_request() {
        let base = serve().await;
        let html = reqwest::get(format!("{}/?mode=lambda&expr=a%2Bb", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(html.contains(r#"<section class="card"><h2>lambda</h2><pre>a+b</pre></section>"#));
        assert!(html.contains(r#"<section class="card"><h2>graph</h2><svg></svg></section>"#));
    }

    #[tokio::test]
    async fn test_health_reports_renderer() {
        let base = serve().await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["renderer"], "svg");
        assert_eq!(body["renderer_ok"], true);
    }
}
