//! Result controller: drives one request from trigger to resolved records

use crate::backend::CalcBackend;
use crate::mapper::ContentMapper;
use crate::payload::{Contents, ErrorBody, RequestOutcome};
use crate::record::DisplayRecord;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors from the controller
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Where the view is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Requesting,
    Populating,
    Failed,
}

/// View state owned by one controller
#[derive(Debug, Clone, Default, Serialize)]
pub struct UiState {
    /// Token of the request this state belongs to
    pub generation: u64,
    pub mode: String,
    pub expression: String,
    pub requesting: bool,
    pub error_flag: bool,
    pub error_message: String,
    /// One record per payload, in backend order
    pub results: Vec<DisplayRecord>,
    /// Records still waiting on the mapper
    pub pending: usize,
}

impl UiState {
    pub fn phase(&self) -> Phase {
        if self.requesting {
            Phase::Requesting
        } else if self.error_flag {
            Phase::Failed
        } else if self.pending > 0 {
            Phase::Populating
        } else {
            Phase::Idle
        }
    }

    fn fail(&mut self, message: String) {
        self.requesting = false;
        self.error_flag = true;
        self.error_message = message;
        self.results.clear();
        self.pending = 0;
    }
}

/// Renders spawned by one [`ResultController::trigger`] call.
///
/// Dropping this does not cancel the renders.
pub struct PendingRenders {
    generation: u64,
    tasks: Vec<JoinHandle<()>>,
}

impl PendingRenders {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every render of this request to finish
    pub async fn settle(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(generation = self.generation, error = %e, "Render task failed");
            }
        }
    }
}

/// Owns the view state and the collaborators that fill it
pub struct ResultController {
    backend: Arc<dyn CalcBackend>,
    mapper: ContentMapper,
    modes: Vec<String>,
    state: Arc<RwLock<UiState>>,
}

impl ResultController {
    /// Create a new controller
    pub fn new(backend: Arc<dyn CalcBackend>, mapper: ContentMapper) -> Self {
        Self {
            backend,
            mapper,
            modes: Vec::new(),
            state: Arc::new(RwLock::new(UiState::default())),
        }
    }

    /// Restrict accepted modes. An empty list accepts any non-empty mode.
    pub fn with_modes(mut self, modes: Vec<String>) -> Self {
        self.modes = modes;
        self
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> UiState {
        self.state.read().await.clone()
    }

    /// Run one request.
    ///
    /// Returns once the outcome is applied: either the error state is set
    /// or one placeholder per payload is in `results`. Renders continue in
    /// the background; use [`PendingRenders::settle`] to wait for them.
    pub async fn trigger(&self, mode: &str, expr: &str) -> Result<PendingRenders, ControllerError> {
        self.validate(mode, expr)?;

        let generation = {
            let mut state = self.state.write().await;
            let generation = state.generation + 1;
            *state = UiState {
                generation,
                mode: mode.to_string(),
                expression: expr.to_string(),
                requesting: true,
                ..Default::default()
            };
            generation
        };

        info!(generation, mode, expr, backend = %self.backend.name(), "Requesting calculation");

        // Detached: the request still completes and clears Requesting if
        // this future is dropped.
        let request = tokio::spawn(run_request(
            Arc::clone(&self.backend),
            self.mapper.clone(),
            Arc::clone(&self.state),
            generation,
            mode.to_string(),
            expr.to_string(),
        ));

        match request.await {
            Ok(pending) => Ok(pending),
            Err(e) => {
                warn!(generation, error = %e, "Request task failed");
                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.fail(format!("request task failed: {}", e));
                }
                Ok(PendingRenders {
                    generation,
                    tasks: Vec::new(),
                })
            }
        }
    }

    fn validate(&self, mode: &str, expr: &str) -> Result<(), ControllerError> {
        if mode.is_empty() {
            return Err(ControllerError::InvalidInput("mode is required".to_string()));
        }
        if !self.modes.is_empty() && !self.modes.iter().any(|m| m == mode) {
            return Err(ControllerError::InvalidInput(format!(
                "unknown mode '{}', expected one of: {}",
                mode,
                self.modes.join(", ")
            )));
        }
        if expr.trim().is_empty() {
            return Err(ControllerError::InvalidInput(
                "expression is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Issue the request for `generation` and apply its outcome, spawning one
/// render task per payload.
async fn run_request(
    backend: Arc<dyn CalcBackend>,
    mapper: ContentMapper,
    state: Arc<RwLock<UiState>>,
    generation: u64,
    mode: String,
    expr: String,
) -> PendingRenders {
    let outcome = backend.calc(&mode, &expr).await;

    let mut guard = state.write().await;
    if guard.generation != generation {
        debug!(generation, current = guard.generation, "Dropping stale response");
        return PendingRenders {
            generation,
            tasks: Vec::new(),
        };
    }

    let contents = match outcome {
        Ok(RequestOutcome::Ok(Contents { contents })) => contents,
        Ok(RequestOutcome::Error(ErrorBody { msg })) => {
            warn!(generation, error = %msg, "Backend reported error");
            guard.fail(msg);
            return PendingRenders {
                generation,
                tasks: Vec::new(),
            };
        }
        Err(e) => {
            warn!(generation, error = %e, "Request failed");
            guard.fail(e.to_string());
            return PendingRenders {
                generation,
                tasks: Vec::new(),
            };
        }
    };

    info!(generation, items = contents.len(), "Populating results");

    guard.requesting = false;
    guard.results = vec![DisplayRecord::placeholder(); contents.len()];
    guard.pending = contents.len();
    drop(guard);

    let tasks = contents
        .into_iter()
        .enumerate()
        .map(|(index, payload)| {
            let mapper = mapper.clone();
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let kind = payload.kind();
                let record = mapper.map(payload).await;

                let mut state = state.write().await;
                if state.generation != generation {
                    debug!(generation, index, kind, "Dropping stale render");
                    return;
                }
                debug!(generation, index, kind, name = %record.name, "Record resolved");
                state.results[index] = record;
                state.pending -= 1;
            })
        })
        .collect();

    PendingRenders { generation, tasks }
}
