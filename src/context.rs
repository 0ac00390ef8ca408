//! The mutable context threaded through every step.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::status::StatusBoard;
use crate::value::ResultValue;

/// The phase in which an [`ErrorRecord`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    Run,
    Timeout,
    Group,
}

/// An accumulated failure, recorded rather than raised (see the crate's error
/// handling design: step and group failures never unwind `run`).
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub step_id: String,
    pub message: String,
    pub critical: bool,
    pub phase: ErrorPhase,
    pub when: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(step_id: impl Into<String>, message: impl Into<String>, critical: bool, phase: ErrorPhase) -> Self {
        Self {
            step_id: step_id.into(),
            message: message.into(),
            critical,
            phase,
            when: Utc::now(),
        }
    }
}

/// A callback bound to the currently-running step that records its
/// in-step progress (0..100) on the shared status board.
#[derive(Clone)]
pub struct ProgressSetter {
    board: StatusBoard,
    step_id: Option<String>,
}

impl ProgressSetter {
    fn idle() -> Self {
        Self {
            board: StatusBoard::new(),
            step_id: None,
        }
    }

    fn bound(board: StatusBoard, step_id: impl Into<String>) -> Self {
        Self {
            board,
            step_id: Some(step_id.into()),
        }
    }

    /// Records `percent` (0..100) against the currently bound step. A no-op
    /// if called outside of a step's `run` (no step is bound).
    pub fn set(&self, percent: f64) {
        if let Some(step_id) = &self.step_id {
            self.board.set_progress(step_id, percent);
        }
    }
}

/// The data carrier passed into, and returned from, every step's `run`.
///
/// `app_config` and `logger` are opaque references the engine never
/// inspects. `results`, `errors`, and the progress setter are the engine's
/// own bookkeeping.
pub struct PipelineContext {
    pub app_config: Arc<dyn std::any::Any + Send + Sync>,
    pub logger: Arc<dyn std::any::Any + Send + Sync>,
    pub results: FxHashMap<String, ResultValue>,
    pub errors: Vec<ErrorRecord>,
    pub update_step_progress: ProgressSetter,
}

impl PipelineContext {
    pub fn new(app_config: Arc<dyn std::any::Any + Send + Sync>, logger: Arc<dyn std::any::Any + Send + Sync>) -> Self {
        Self {
            app_config,
            logger,
            results: FxHashMap::default(),
            errors: Vec::new(),
            update_step_progress: ProgressSetter::idle(),
        }
    }

    pub(crate) fn bind_progress(&mut self, board: StatusBoard, step_id: &str) {
        self.update_step_progress = ProgressSetter::bound(board, step_id);
    }

    pub(crate) fn unbind_progress(&mut self) {
        self.update_step_progress = ProgressSetter::idle();
    }

    /// Deep-copies this context for an isolated parallel branch: `results`
    /// and `errors` get their own storage, `app_config`/`logger` stay
    /// shared by reference, and the progress setter is rebound to the
    /// branch's own step once the branch starts running.
    pub fn fork_for_branch(&self) -> Self {
        Self {
            app_config: Arc::clone(&self.app_config),
            logger: Arc::clone(&self.logger),
            results: self.results.clone(),
            errors: self.errors.clone(),
            update_step_progress: ProgressSetter::idle(),
        }
    }
}
