//! The Pipeline Orchestrator: owns the stage list, computes the weight
//! plan, drives execution, and publishes progress.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::executors::parallel::run_parallel;
use crate::executors::serial::run_step;
use crate::executors::Verdict;
use crate::merge::MergeRegistry;
use crate::progress::{with_progress_callback, ProgressCallback, ProgressChannel, ProgressEvent};
use crate::stage::{Operator, Stage};
use crate::status::{ProgressSnapshot, StatusBoard, StepState};

/// Process-wide settings for a pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    pub fail_fast: bool,
    pub parallel_worker_pool_size: Option<usize>,
    /// Operator applied to a `Stage::Parallel` whose own `ParallelConfig`
    /// didn't set one explicitly.
    pub default_parallel_operator: Operator,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fail_fast: true,
            parallel_worker_pool_size: default_worker_pool_size(),
            default_parallel_operator: Operator::default(),
        }
    }
}

fn default_worker_pool_size() -> Option<usize> {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .ok()
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    #[must_use]
    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.parallel_worker_pool_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_default_parallel_operator(mut self, operator: Operator) -> Self {
        self.default_parallel_operator = operator;
        self
    }

    /// Seeds `fail_fast` and `parallel_worker_pool_size` from the
    /// environment (loading a `.env` file if present), falling back to
    /// [`PipelineConfig::default`] for anything unset. `TASKLOOM_FAIL_FAST`
    /// accepts `true`/`false`/`1`/`0`; `TASKLOOM_WORKER_POOL_SIZE` is a
    /// positive integer.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(raw) = env::var("TASKLOOM_FAIL_FAST") {
            if let Some(value) = parse_bool(&raw) {
                config.fail_fast = value;
            }
        }

        if let Ok(raw) = env::var("TASKLOOM_WORKER_POOL_SIZE") {
            if let Ok(size) = raw.parse::<usize>() {
                if size > 0 {
                    config.parallel_worker_pool_size = Some(size);
                }
            }
        }

        config
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// The orchestrator's run-level state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    CompletedWithErrors,
    Aborted,
}

struct RuntimeState {
    is_running: AtomicBool,
    current_step_id: Mutex<Option<String>>,
    run_state: Mutex<RunState>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            is_running: AtomicBool::new(false),
            current_step_id: Mutex::new(None),
            run_state: Mutex::new(RunState::Idle),
        }
    }
}

/// A pipeline: an ordered sequence of stages with a fixed weight plan.
pub struct Pipeline {
    stages: Vec<Stage>,
    config: PipelineConfig,
    progress_callback: ProgressCallback,
    progress_channel: Option<ProgressChannel>,
    merge_registry: MergeRegistry,
    weight_plan: FxHashMap<String, f64>,
    board: StatusBoard,
    runtime: RuntimeState,
}

impl Pipeline {
    /// Builds a pipeline, computing the weight plan once: each stage gets an
    /// equal share of 100, split evenly among a parallel stage's branches.
    pub fn new(stages: Vec<Stage>, config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::builder(stages, config).build()
    }

    pub fn builder(stages: Vec<Stage>, config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder {
            stages,
            config,
            progress_callback: None,
            progress_channel: None,
            merge_registry: MergeRegistry::default(),
        }
    }

    fn weight_plan(stages: &[Stage]) -> Result<FxHashMap<String, f64>, PipelineError> {
        if stages.is_empty() {
            return Ok(FxHashMap::default());
        }
        let stage_share = 100.0 / stages.len() as f64;
        let mut plan = FxHashMap::default();
        for (idx, stage) in stages.iter().enumerate() {
            let ids = stage.step_ids();
            let per_step = stage_share / ids.len() as f64;
            for id in ids {
                if id.trim().is_empty() {
                    return Err(PipelineError::BlankStepId { stage_index: idx });
                }
                if plan.contains_key(&id) {
                    return Err(PipelineError::DuplicateStepId(id));
                }
                plan.insert(id, per_step);
            }
        }
        Ok(plan)
    }

    /// Executes every stage in order against `context`, returning the
    /// (possibly mutated) context once the run completes or aborts.
    #[instrument(skip(self, context), fields(stage_count = self.stages.len(), run_id = %Uuid::new_v4()))]
    pub async fn run(&self, mut context: PipelineContext) -> Result<PipelineContext, PipelineError> {
        if self
            .runtime
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }
        *self.runtime.run_state.lock() = RunState::Running;

        for (step_id, weight) in &self.weight_plan {
            self.board.seed(step_id, *weight);
        }

        let total_stages = self.stages.len();
        let mut aborted = false;

        for (stage_idx, stage) in self.stages.iter().enumerate() {
            let last_step_id = stage.step_ids().join("+");
            *self.runtime.current_step_id.lock() = Some(last_step_id.clone());

            let (next_context, verdict) = match stage {
                Stage::Single(step) => run_step(step, context, &self.board),
                Stage::Parallel(steps, parallel_config) => {
                    run_parallel(
                        steps,
                        parallel_config,
                        context,
                        &self.board,
                        &self.merge_registry,
                        self.config.parallel_worker_pool_size,
                        self.config.default_parallel_operator,
                    )
                    .await
                }
            };
            context = next_context;

            let should_abort = self.config.fail_fast && verdict == Verdict::FailedCritical;

            let overall_progress = self.board.overall_progress();
            let event = ProgressEvent {
                stage_idx,
                total_stages,
                last_step_id,
                overall_progress_percent: overall_progress,
            };
            (self.progress_callback)(&event);
            if let Some(channel) = &self.progress_channel {
                channel.push(event);
            }

            if should_abort {
                aborted = true;
                self.board.skip_all_pending();
                break;
            }
        }

        *self.runtime.current_step_id.lock() = None;
        self.runtime.is_running.store(false, Ordering::SeqCst);

        let final_state = if aborted {
            RunState::Aborted
        } else if context.errors.is_empty() {
            RunState::Completed
        } else {
            RunState::CompletedWithErrors
        };
        *self.runtime.run_state.lock() = final_state;

        Ok(context)
    }

    /// Returns an internally consistent point-in-time view of the pipeline's
    /// progress. Safe to call concurrently with `run`, from any thread.
    pub fn get_status(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            is_running: self.runtime.is_running.load(Ordering::SeqCst),
            current_step_id: self.runtime.current_step_id.lock().clone(),
            progress: self.board.overall_progress(),
            step_details: self.board.snapshot_details(),
        }
    }

    pub fn run_state(&self) -> RunState {
        *self.runtime.run_state.lock()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Fluent builder for [`Pipeline`], mirroring the graph-builder pattern: each
/// call consumes and returns `self`, and [`build`](Self::build) performs
/// validation (empty pipeline, blank/duplicate step ids).
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    config: PipelineConfig,
    progress_callback: Option<ProgressCallback>,
    progress_channel: Option<ProgressChannel>,
    merge_registry: MergeRegistry,
}

impl PipelineBuilder {
    #[must_use]
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    #[must_use]
    pub fn with_progress_channel(mut self, channel: ProgressChannel) -> Self {
        self.progress_channel = Some(channel);
        self
    }

    #[must_use]
    pub fn with_merge_registry(mut self, registry: MergeRegistry) -> Self {
        self.merge_registry = registry;
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        // An empty pipeline is a valid no-op run, not a validation error;
        // `weight_plan` only rejects blank/duplicate step ids.
        let weight_plan = Pipeline::weight_plan(&self.stages)?;
        Ok(Pipeline {
            stages: self.stages,
            config: self.config,
            progress_callback: with_progress_callback(self.progress_callback),
            progress_channel: self.progress_channel,
            merge_registry: self.merge_registry,
            weight_plan,
            board: StatusBoard::new(),
            runtime: RuntimeState::default(),
        })
    }
}
