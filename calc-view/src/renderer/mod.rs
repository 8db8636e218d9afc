//! Diagram renderer abstraction and implementations

mod graphviz;

pub use graphviz::{GraphvizHandle, GraphvizRenderer, OutputFormat};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Source rendered by [`smoke_test`]
pub const SAMPLE_GRAPH: &str = "digraph { a -> b }";

/// Errors that can occur while rendering a diagram
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to start renderer {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Renderer I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Renderer exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Renderer produced invalid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Render task failed: {0}")]
    Join(String),
}

/// Rendered diagram markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// Build from a full renderer document, keeping only the `<svg>` element
    /// when there is one (drops the XML declaration, doctype and comments).
    pub fn from_document(document: &str) -> Self {
        let element = match document.find("<svg") {
            Some(start) => &document[start..],
            None => document,
        };
        Self(element.trim_end().to_string())
    }

    /// Serialized element, as it would be inserted into a page
    pub fn outer_markup(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// A ready renderer. Rendering is synchronous once a handle exists.
pub trait RendererHandle: Send + Sync {
    fn render(&self, source: &str) -> Result<Markup, RenderError>;
}

/// Trait for diagram renderers
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Renderer name for logging
    fn name(&self) -> &str;

    /// Acquire a handle. Called once per mapped payload, not cached.
    async fn initialize(&self) -> Result<Arc<dyn RendererHandle>, RenderError>;
}

/// Render [`SAMPLE_GRAPH`] to check that the renderer works end to end
pub async fn smoke_test(renderer: &dyn DiagramRenderer) -> Result<Markup, RenderError> {
    let handle = renderer.initialize().await?;
    tokio::task::spawn_blocking(move || handle.render(SAMPLE_GRAPH))
        .await
        .map_err(|e| RenderError::Join(e.to_string()))?
}
