//! Crate-wide error type for programming-level failures.
//!
//! Per-step and per-group failures are *recorded*, not raised (see
//! [`crate::context::ErrorRecord`]); `PipelineError` is reserved for
//! construction-time validation and internal join/runtime failures that the
//! caller cannot recover from by inspecting `context.errors`.

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum PipelineError {
    #[error("duplicate step id: {0}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(taskloom::pipeline::duplicate_step_id),
            help("step ids must be unique within a pipeline")
        )
    )]
    DuplicateStepId(String),

    #[error("blank step id in stage {stage_index}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(taskloom::pipeline::blank_step_id)))]
    BlankStepId { stage_index: usize },

    #[error("pipeline is already running; run() is not reentrant")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(taskloom::pipeline::already_running)))]
    AlreadyRunning,
}
