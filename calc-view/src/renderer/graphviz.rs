//! Graphviz renderer driving the `dot` executable

use super::{DiagramRenderer, Markup, RenderError, RendererHandle};
use crate::RendererConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// Text output formats of `dot`. Binary formats are not accepted since the
/// output is handled as markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svg,
    Plain,
    Dot,
    Xdot,
    Json,
}

impl OutputFormat {
    /// Value passed as `-T<format>`
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Plain => "plain",
            OutputFormat::Dot => "dot",
            OutputFormat::Xdot => "xdot",
            OutputFormat::Json => "json",
        }
    }
}

/// Renderer that pipes Graphviz source through `dot -T<format>`
pub struct GraphvizRenderer {
    dot_path: String,
    format: OutputFormat,
    name: String,
}

impl GraphvizRenderer {
    /// Create a renderer for the given `dot` executable
    pub fn new(dot_path: impl Into<String>) -> Self {
        let dot_path = dot_path.into();
        let name = format!("graphviz:{}", dot_path);

        Self {
            dot_path,
            format: OutputFormat::Svg,
            name,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(&config.dot_path).with_format(config.format)
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[async_trait]
impl DiagramRenderer for GraphvizRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<Arc<dyn RendererHandle>, RenderError> {
        // `dot -V` prints its version on stderr and exits 0
        let output = tokio::process::Command::new(&self.dot_path)
            .arg("-V")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.dot_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        debug!(
            renderer = %self.name,
            version = %String::from_utf8_lossy(&output.stderr).trim(),
            "Graphviz ready"
        );

        Ok(Arc::new(GraphvizHandle {
            dot_path: self.dot_path.clone(),
            format: self.format,
        }))
    }
}

/// Handle produced by [`GraphvizRenderer::initialize`]
pub struct GraphvizHandle {
    dot_path: String,
    format: OutputFormat,
}

impl RendererHandle for GraphvizHandle {
    fn render(&self, source: &str) -> Result<Markup, RenderError> {
        let mut child = Command::new(&self.dot_path)
            .arg(format!("-T{}", self.format.as_str()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.dot_path.clone(),
                source,
            })?;

        let stdin = child.stdin.take();

        // stdin is fed from a second thread while stdout and stderr drain,
        // so neither side can block the other on a full pipe
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(source.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });
        let output = output?;

        // An early exit closes the pipe; its status and stderr say why
        if !output.status.success() {
            return Err(RenderError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        let document = String::from_utf8(output.stdout)?;
        Ok(Markup::from_document(&document))
    }
}
