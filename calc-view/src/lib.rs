//! calc-view - Client view layer for `/calc` computation results
//!
//! This crate provides:
//! - A typed model of the `/calc/{mode}/{expr}` response (text, Graphviz
//!   figures, reduction sequences)
//! - An HTTP backend client with percent-encoded request paths
//! - A content mapper that turns payloads into display records via an
//!   opaque diagram renderer (Graphviz `dot` by default)
//! - A result controller owning the view state, guarded by request generation
//! - A small REST/HTML server exposing the view

pub mod api;
pub mod backend;
pub mod controller;
pub mod mapper;
pub mod payload;
pub mod record;
pub mod renderer;

pub use backend::{CalcBackend, ClientError, HttpBackend};
pub use controller::{ControllerError, Phase, ResultController, UiState};
pub use mapper::ContentMapper;
pub use payload::{ReductionStep, RequestOutcome, ResultPayload};
pub use record::{DisplayRecord, RecordState, RenderedStep};
pub use renderer::{
    DiagramRenderer, GraphvizRenderer, Markup, OutputFormat, RenderError, RendererHandle,
};

use std::path::Path;
use thiserror::Error;

/// Errors loading a [`ViewConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Configuration for the view
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ViewConfig {
    /// Base URL of the computation backend (without `/calc`)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Accepted modes; empty means any non-empty mode is forwarded
    #[serde(default)]
    pub modes: Vec<String>,

    /// Diagram renderer settings
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Configuration for the Graphviz renderer
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RendererConfig {
    /// Path to the `dot` executable
    #[serde(default = "default_dot_path")]
    pub dot_path: String,

    /// Output format passed as `-T<format>`; text formats only
    #[serde(default)]
    pub format: OutputFormat,
}

/// Configuration for `calcview-server`
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_backend_url() -> String { "http://localhost:8080".to_string() }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_dot_path() -> String { "dot".to_string() }
fn default_listen() -> String { "127.0.0.1:3030".to_string() }

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            modes: Vec::new(),
            renderer: RendererConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            dot_path: default_dot_path(),
            format: OutputFormat::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ViewConfig {
    /// Parse a config from TOML text
    pub fn from_toml(contents: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_toml(&contents, &display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = ViewConfig::from_toml("", "empty.toml").unwrap();
        assert_eq!(config.backend_url, "http://localhost:8080");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.modes.is_empty());
        assert_eq!(config.renderer.dot_path, "dot");
        assert_eq!(config.renderer.format, OutputFormat::Svg);
        assert_eq!(config.server.listen, "127.0.0.1:3030");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend_url = "http://calc.internal:9000"
modes = ["lambda", "ski"]

[renderer]
dot_path = "/usr/local/bin/dot"
"#
        )
        .unwrap();

        let config = ViewConfig::load(file.path()).unwrap();
        assert_eq!(config.backend_url, "http://calc.internal:9000");
        assert_eq!(config.modes, vec!["lambda", "ski"]);
        assert_eq!(config.renderer.dot_path, "/usr/local/bin/dot");
        assert_eq!(config.renderer.format, OutputFormat::Svg);
    }

    #[test]
    fn test_missing_file() {
        let err = ViewConfig::load("/nonexistent/calcview.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_binary_format_rejected() {
        let err = ViewConfig::from_toml("[renderer]\nformat = \"png\"", "png.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let config = ViewConfig::from_toml("[renderer]\nformat = \"plain\"", "plain.toml").unwrap();
        assert_eq!(config.renderer.format, OutputFormat::Plain);
    }

    #[test]
    fn test_parse_error() {
        let err = ViewConfig::from_toml("modes = 3", "bad.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
