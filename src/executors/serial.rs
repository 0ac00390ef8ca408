//! Serial Stage Executor: runs one step in the calling thread against the
//! live context.

use std::sync::Arc;
use tracing::instrument;

use crate::context::{ErrorPhase, ErrorRecord, PipelineContext};
use crate::executors::Verdict;
use crate::status::{StatusBoard, StepState};
use crate::step::Step;

/// Runs `step` against `context`, updating `board` as it goes.
///
/// Implements the algorithm: set RUNNING, bind the progress setter, invoke
/// `run`, then set SUCCEEDED/FAILED and record an [`ErrorRecord`] on failure.
/// Never propagates the step's error out as a `Result` — the verdict and the
/// recorded error are the only signals the caller gets.
///
/// A step's `run` consumes the context and only hands it back on success, so
/// on failure the executor falls back to a fork taken before the call,
/// carrying forward the results/errors accumulated so far, and appends the
/// new [`ErrorRecord`] to it.
#[instrument(skip(step, context, board), fields(step_id = step.step_id()))]
pub fn run_step(step: &Arc<dyn Step>, context: PipelineContext, board: &StatusBoard) -> (PipelineContext, Verdict) {
    let step_id = step.step_id().to_string();
    board.set_state(&step_id, StepState::Running);

    let scratch = context.fork_for_branch();
    let mut bound = context;
    bound.bind_progress(board.clone(), &step_id);

    match step.run(bound) {
        Ok(mut context) => {
            board.set_progress(&step_id, 100.0);
            board.set_state(&step_id, StepState::Succeeded);
            context.unbind_progress();
            (context, Verdict::Ok)
        }
        Err(error) => {
            let critical = step.critical();
            tracing::warn!(step_id = %step_id, error = %error, critical, "step failed");
            board.set_error(&step_id, error.to_string());
            board.set_state(&step_id, StepState::Failed);

            let mut context = scratch;
            context.errors.push(ErrorRecord::new(
                step_id.clone(),
                error.to_string(),
                critical,
                ErrorPhase::Run,
            ));
            context.unbind_progress();
            (context, Verdict::from_step_result(critical, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PipelineContext;
    use crate::step::StepError;
    use crate::value::ResultValue;
    use std::sync::Arc;

    struct Succeeds;
    impl Step for Succeeds {
        fn step_id(&self) -> &str {
            "succeeds"
        }
        fn run(&self, mut ctx: PipelineContext) -> Result<PipelineContext, StepError> {
            ctx.results.insert("succeeds".into(), ResultValue::string("done"));
            Ok(ctx)
        }
    }

    struct FailsCritical;
    impl Step for FailsCritical {
        fn step_id(&self) -> &str {
            "fails"
        }
        fn run(&self, _ctx: PipelineContext) -> Result<PipelineContext, StepError> {
            Err(StepError::failed("boom"))
        }
    }

    struct FailsNonCritical;
    impl Step for FailsNonCritical {
        fn step_id(&self) -> &str {
            "fails_soft"
        }
        fn critical(&self) -> bool {
            false
        }
        fn run(&self, _ctx: PipelineContext) -> Result<PipelineContext, StepError> {
            Err(StepError::failed("soft boom"))
        }
    }

    fn board_with(step_id: &str) -> StatusBoard {
        let board = StatusBoard::new();
        board.seed(step_id, 100.0);
        board
    }

    fn context() -> PipelineContext {
        PipelineContext::new(Arc::new(()), Arc::new(()))
    }

    #[test]
    fn success_sets_full_progress_and_ok_verdict() {
        let board = board_with("succeeds");
        let (context, verdict) = run_step(&(Arc::new(Succeeds) as Arc<dyn Step>), context(), &board);
        assert_eq!(verdict, Verdict::Ok);
        assert!(context.results.contains_key("succeeds"));
        assert_eq!(board.snapshot_details()["succeeds"].internal_progress, 100.0);
    }

    #[test]
    fn critical_failure_records_error_and_fails_critical() {
        let board = board_with("fails");
        let (context, verdict) = run_step(&(Arc::new(FailsCritical) as Arc<dyn Step>), context(), &board);
        assert_eq!(verdict, Verdict::FailedCritical);
        assert_eq!(context.errors.len(), 1);
        assert!(context.errors[0].critical);
    }

    #[test]
    fn non_critical_failure_is_recorded_but_not_critical() {
        let board = board_with("fails_soft");
        let (context, verdict) = run_step(&(Arc::new(FailsNonCritical) as Arc<dyn Step>), context(), &board);
        assert_eq!(verdict, Verdict::FailedNonCritical);
        assert!(!context.errors[0].critical);
    }
}
