//! The unit of work the pipeline schedules: the [`Step`] trait.

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;
use thiserror::Error;

use crate::context::PipelineContext;

/// Errors raised from inside a step's `run`.
///
/// These never unwind out of the engine: the serial and parallel executors
/// catch every `StepError` and convert it into an
/// [`ErrorRecord`](crate::context::ErrorRecord) plus a verdict.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum StepError {
    #[error("step failed: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(taskloom::step::failed)))]
    Failed(String),

    #[error("step input invalid: {0}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(taskloom::step::invalid_input),
            help("check that the upstream stage produced the expected result key")
        )
    )]
    InvalidInput(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }
}

/// Core trait every pipeline step implements.
///
/// A step is expected to be stateless and reusable across runs: the engine
/// invokes `run` exactly once per occurrence in the pipeline for a given
/// `run`, modulo the declared-but-unenforced retry count (see
/// [`declared_retries`](Step::declared_retries)).
pub trait Step: Send + Sync {
    /// Unique identifier within the owning pipeline; used as the key for
    /// status and result lookup.
    fn step_id(&self) -> &str;

    /// Human-readable description, surfaced in status/progress output.
    fn description(&self) -> &str {
        ""
    }

    /// Whether this step's failure aborts the pipeline in fail-fast mode.
    /// Defaults to `true`.
    fn critical(&self) -> bool {
        true
    }

    /// Declared timeout, in seconds. Surfaced via status but **not
    /// enforced** by the engine (see the crate's known-limitations notes).
    fn declared_timeout(&self) -> Option<f64> {
        None
    }

    /// Declared retry count. Surfaced via status but **not enforced**.
    fn declared_retries(&self) -> u32 {
        0
    }

    /// Perform the step's work against `context`, returning the (possibly
    /// mutated) context or a [`StepError`].
    fn run(&self, context: PipelineContext) -> Result<PipelineContext, StepError>;
}
