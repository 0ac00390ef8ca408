//! Stages: the elements a [`Pipeline`](crate::pipeline::Pipeline) runs in order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::step::Step;

/// How a parallel stage's branch verdicts combine into the stage verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    /// Every launched branch must succeed for the stage to succeed.
    #[default]
    And,
    /// At least one launched branch must succeed for the stage to succeed.
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
        }
    }
}

/// Configuration for a parallel stage.
///
/// `operator` is `None` unless the stage sets one explicitly with
/// [`with_operator`](Self::with_operator); a stage that leaves it unset
/// inherits the owning pipeline's `default_parallel_operator`
/// (`PipelineConfig::default_parallel_operator`) at run time.
#[derive(Clone, Default)]
pub struct ParallelConfig {
    pub operator: Option<Operator>,
    pub timeout: Option<Duration>,
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One element of a pipeline: either a single step, or a set of steps run
/// concurrently under a [`ParallelConfig`].
#[derive(Clone)]
pub enum Stage {
    Single(Arc<dyn Step>),
    Parallel(Vec<Arc<dyn Step>>, ParallelConfig),
}

impl Stage {
    pub fn single(step: Arc<dyn Step>) -> Self {
        Stage::Single(step)
    }

    pub fn parallel(steps: Vec<Arc<dyn Step>>, config: ParallelConfig) -> Self {
        assert!(
            steps.len() >= 2,
            "a parallel stage requires at least two steps"
        );
        Stage::Parallel(steps, config)
    }

    /// Number of steps contained in this stage (1 for `Single`, `n` for `Parallel`).
    pub fn step_count(&self) -> usize {
        match self {
            Stage::Single(_) => 1,
            Stage::Parallel(steps, _) => steps.len(),
        }
    }

    pub fn step_ids(&self) -> Vec<String> {
        match self {
            Stage::Single(step) => vec![step.step_id().to_string()],
            Stage::Parallel(steps, _) => steps.iter().map(|s| s.step_id().to_string()).collect(),
        }
    }
}
