//! Per-step status tracking and the shared status board.
//!
//! `StatusBoard` is the single structure shared across the orchestrator and
//! every parallel branch thread; all writes go through its lock so
//! `Pipeline::get_status()` always observes a consistent snapshot.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Lifecycle state of a single step within one `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepState::Succeeded | StepState::Failed | StepState::Skipped
        )
    }
}

/// A step's status record: lifecycle state, progress within the step, and
/// the step's fixed share of overall pipeline weight.
#[derive(Debug, Clone)]
pub struct StepStatus {
    pub state: StepState,
    pub internal_progress: f64,
    pub max_weight: f64,
    pub error: Option<String>,
}

impl StepStatus {
    pub fn pending(max_weight: f64) -> Self {
        Self {
            state: StepState::Pending,
            internal_progress: 0.0,
            max_weight,
            error: None,
        }
    }

    /// This step's contribution to overall progress: `internal_progress/100 * max_weight`.
    pub fn contribution(&self) -> f64 {
        (self.internal_progress / 100.0) * self.max_weight
    }
}

/// Shared, lock-guarded map from `step_id` to its current status.
///
/// Cloning a `StatusBoard` clones the `Arc`, so every clone sees the same
/// underlying map. Parallel branches and the orchestrator share one board.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<FxHashMap<String, StepStatus>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, step_id: &str, max_weight: f64) {
        self.inner
            .write()
            .insert(step_id.to_string(), StepStatus::pending(max_weight));
    }

    pub fn set_state(&self, step_id: &str, state: StepState) {
        if let Some(status) = self.inner.write().get_mut(step_id) {
            status.state = state;
        }
    }

    pub fn set_error(&self, step_id: &str, message: String) {
        if let Some(status) = self.inner.write().get_mut(step_id) {
            status.error = Some(message);
        }
    }

    /// Records a step's progress within its own run. Called from
    /// `PipelineContext::update_step_progress`; may be invoked from a
    /// parallel branch thread.
    pub fn set_progress(&self, step_id: &str, percent: f64) {
        if let Some(status) = self.inner.write().get_mut(step_id) {
            status.internal_progress = percent.clamp(0.0, 100.0);
        }
    }

    pub fn skip_all_pending(&self) {
        for status in self.inner.write().values_mut() {
            if status.state == StepState::Pending {
                status.state = StepState::Skipped;
            }
        }
    }

    /// Total progress across every tracked step, clamped to `[0, 100]`.
    pub fn overall_progress(&self) -> f64 {
        let total: f64 = self
            .inner
            .read()
            .values()
            .map(StepStatus::contribution)
            .sum();
        total.clamp(0.0, 100.0)
    }

    /// Takes a read lock just long enough to clone the map into an owned snapshot.
    pub fn snapshot_details(&self) -> FxHashMap<String, StepStatus> {
        self.inner.read().clone()
    }
}

/// Owned, point-in-time view returned by `Pipeline::get_status()`.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub is_running: bool,
    pub current_step_id: Option<String>,
    pub progress: f64,
    pub step_details: FxHashMap<String, StepStatus>,
}
