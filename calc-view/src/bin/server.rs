//! calcview server binary

use anyhow::{Context, Result};
use calcview::api::{create_router, ApiState};
use calcview::renderer::{smoke_test, DiagramRenderer, GraphvizRenderer};
use calcview::{ContentMapper, HttpBackend, ResultController, ViewConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting calcview server v{}", env!("CARGO_PKG_VERSION"));

    // Config file is optional; defaults cover a local backend
    let config = match std::env::args().nth(1) {
        Some(config_path) => {
            let config = ViewConfig::load(&config_path)
                .with_context(|| format!("Failed to load config file: {}", config_path))?;
            info!(config_path = config_path, "Loaded configuration");
            config
        }
        None => {
            info!("No config file given, using defaults");
            ViewConfig::default()
        }
    };

    info!(
        backend_url = config.backend_url,
        timeout_secs = config.request_timeout_secs,
        modes = ?config.modes,
        dot_path = config.renderer.dot_path,
        "Configuration"
    );

    let renderer: Arc<dyn DiagramRenderer> = Arc::new(GraphvizRenderer::from_config(&config.renderer));
    match smoke_test(renderer.as_ref()).await {
        Ok(_) => info!(renderer = renderer.name(), "Renderer ready"),
        Err(e) => warn!(renderer = renderer.name(), error = %e, "Renderer unavailable, figures will fail"),
    }

    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let controller = ResultController::new(Arc::new(backend), ContentMapper::new(Arc::clone(&renderer)))
        .with_modes(config.modes.clone());

    // Create API state
    let state = Arc::new(ApiState {
        controller: Arc::new(controller),
        renderer,
    });

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server.listen))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
