//! Parallel Stage Executor: fans branches out onto blocking worker threads,
//! joins under a group timeout, and merges results in input order.

use std::sync::Arc;

use futures_util::future::join_all;
use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::context::{ErrorPhase, ErrorRecord, PipelineContext};
use crate::executors::serial::run_step;
use crate::executors::Verdict;
use crate::merge::MergeRegistry;
use crate::stage::{Operator, ParallelConfig};
use crate::status::StatusBoard;
use crate::step::Step;

/// Runs `steps` concurrently against branch-local copies of `context`,
/// merges their results back into `context` in input order, and evaluates
/// the group verdict.
///
/// `config.operator` selects AND/OR combination for this stage; if the stage
/// left it unset, `default_operator` (the owning pipeline's configured
/// default) applies instead.
///
/// Each branch runs on a blocking worker thread via
/// `tokio::task::spawn_blocking`, bounded by `worker_pool_size` through a
/// semaphore. Every branch is bounded by the same `config.timeout` deadline,
/// but each is joined independently: a branch that finishes before the
/// deadline merges its results regardless of its siblings, and only a branch
/// still running when the deadline passes is excluded and recorded as a
/// timeout error.
#[instrument(skip(steps, context, board, merge_registry), fields(branch_count = steps.len()))]
pub async fn run_parallel(
    steps: &[Arc<dyn Step>],
    config: &ParallelConfig,
    context: PipelineContext,
    board: &StatusBoard,
    merge_registry: &MergeRegistry,
    worker_pool_size: Option<usize>,
    default_operator: Operator,
) -> (PipelineContext, Verdict) {
    let semaphore = worker_pool_size.map(|n| Arc::new(Semaphore::new(n.max(1))));
    let board = board.clone();

    let mut handles = Vec::with_capacity(steps.len());
    for step in steps {
        let branch_context = context.fork_for_branch();
        let critical = step.critical();
        let step = Arc::clone(step);
        let board = board.clone();
        let step_id = step.step_id().to_string();

        // Acquired before spawning so the permit bounds concurrently
        // *running* branches, not merely concurrently *spawned* ones.
        let permit = match &semaphore {
            Some(sem) => Some(Arc::clone(sem).acquire_owned().await.expect("semaphore never closed")),
            None => None,
        };

        let handle = tokio::task::spawn_blocking(move || {
            let result = run_step(&step, branch_context, &board);
            drop(permit);
            result
        });
        handles.push((step_id, critical, handle));
    }

    // Each branch is joined against the same absolute deadline but awaited
    // independently, so one branch timing out doesn't cost its siblings
    // their already-finished results. `join_all` still resolves in the
    // branches' fixed input order, which merge determinism relies on.
    let deadline = config.timeout.map(|timeout| tokio::time::Instant::now() + timeout);
    let joined = join_all(handles.into_iter().map(|(step_id, critical, handle)| async move {
        let outcome = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, handle).await,
            None => Ok(handle.await),
        };
        (step_id, critical, outcome)
    }))
    .await;

    let mut merged = context;
    let mut verdicts = Vec::new();

    for (step_id, critical, outcome) in joined {
        match outcome {
            Ok(Ok((branch_context, verdict))) => {
                merge_branch_context(&mut merged, branch_context, merge_registry);
                verdicts.push(verdict);
            }
            Ok(Err(join_error)) => {
                tracing::error!(step_id = %step_id, error = %join_error, "branch task panicked or was cancelled");
                merged.errors.push(ErrorRecord::new(
                    step_id,
                    format!("branch task failed to join: {join_error}"),
                    true,
                    ErrorPhase::Group,
                ));
                verdicts.push(Verdict::FailedCritical);
            }
            Err(_elapsed) => {
                tracing::warn!(step_id = %step_id, timeout = ?config.timeout, "branch did not complete before the group timeout elapsed");
                merged.errors.push(ErrorRecord::new(
                    step_id,
                    "branch did not complete before the group timeout elapsed",
                    critical,
                    ErrorPhase::Timeout,
                ));
                verdicts.push(Verdict::from_step_result(critical, false));
            }
        }
    }

    let operator = config.operator.unwrap_or(default_operator);
    let group_verdict = evaluate_group_verdict(operator, &verdicts);
    (merged, group_verdict)
}

/// Folds a completed branch's `results` and `errors` into the merged
/// context, in the caller's fixed input order.
fn merge_branch_context(merged: &mut PipelineContext, branch: PipelineContext, registry: &MergeRegistry) {
    let mut keys: Vec<String> = branch.results.keys().cloned().collect();
    keys.sort();
    let mut by_key: FxHashMap<String, crate::value::ResultValue> = branch.results;
    for key in keys {
        if let Some(branch_value) = by_key.remove(&key) {
            let base = merged.results.remove(&key);
            if let Some(value) = registry.merge(base, vec![branch_value]) {
                merged.results.insert(key, value);
            }
        }
    }
    merged.errors.extend(branch.errors);
}

fn evaluate_group_verdict(operator: Operator, verdicts: &[Verdict]) -> Verdict {
    let any_critical_failure = verdicts.iter().any(|v| *v == Verdict::FailedCritical);
    let any_failure = verdicts.iter().any(|v| !v.is_ok());
    let any_success = verdicts.iter().any(|v| v.is_ok());

    match operator {
        Operator::And => {
            if !any_failure {
                Verdict::Ok
            } else if any_critical_failure {
                Verdict::FailedCritical
            } else {
                Verdict::FailedNonCritical
            }
        }
        Operator::Or => {
            if any_success {
                Verdict::Ok
            } else if any_critical_failure {
                Verdict::FailedCritical
            } else {
                Verdict::FailedNonCritical
            }
        }
    }
}
