//! Mapping of result payloads to display records

use crate::payload::{ReductionStep, ResultPayload};
use crate::record::{preformatted, DisplayRecord, RenderedStep};
use crate::renderer::{DiagramRenderer, Markup, RenderError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns one [`ResultPayload`] into a resolved [`DisplayRecord`].
///
/// Every payload yields exactly one record: render failures become
/// `RenderFailed` and unknown shapes become `Unrecognized`.
#[derive(Clone)]
pub struct ContentMapper {
    renderer: Arc<dyn DiagramRenderer>,
}

impl ContentMapper {
    pub fn new(renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self { renderer }
    }

    pub async fn map(&self, payload: ResultPayload) -> DisplayRecord {
        match payload {
            ResultPayload::PlainText { title, text } => {
                DisplayRecord::markup(title, preformatted(&text))
            }
            ResultPayload::GraphvizFigure { title, source } => {
                match self.render_all(vec![source]).await {
                    Ok(mut markups) => match markups.pop() {
                        Some(markup) => DisplayRecord::markup(title, markup.into_string()),
                        None => DisplayRecord::render_failed(title, "renderer returned nothing"),
                    },
                    Err(e) => {
                        warn!(title = %title, error = %e, "Figure render failed");
                        DisplayRecord::render_failed(title, e.to_string())
                    }
                }
            }
            ResultPayload::ReductionSeq { title, steps } => {
                let (exprs, sources): (Vec<String>, Vec<String>) = steps
                    .into_iter()
                    .map(|ReductionStep { expr, source }| (expr, source))
                    .unzip();

                match self.render_all(sources).await {
                    Ok(markups) => {
                        let steps: Vec<RenderedStep> = exprs
                            .into_iter()
                            .zip(markups)
                            .map(|(expr, markup)| RenderedStep {
                                expr,
                                rendered_markup: markup.into_string(),
                            })
                            .collect();
                        debug!(title = %title, steps = steps.len(), "Rendered reduction sequence");
                        DisplayRecord::steps(title, steps)
                    }
                    Err(e) => {
                        warn!(title = %title, error = %e, "Reduction sequence render failed");
                        DisplayRecord::render_failed(title, e.to_string())
                    }
                }
            }
            ResultPayload::Unrecognized(raw) => {
                warn!(payload = %raw, "Unrecognized payload");
                DisplayRecord::unrecognized(format!("unrecognized payload: {}", raw))
            }
        }
    }

    /// Acquire one handle, then render every source in order on the
    /// blocking pool. Fails on the first rejected source.
    async fn render_all(&self, sources: Vec<String>) -> Result<Vec<Markup>, RenderError> {
        let handle = self.renderer.initialize().await?;

        tokio::task::spawn_blocking(move || {
            sources
                .iter()
                .map(|source| handle.render(source))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| RenderError::Join(e.to_string()))?
    }
}
