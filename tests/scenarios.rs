//! End-to-end pipeline execution scenarios.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskloom::context::PipelineContext;
use taskloom::pipeline::{Pipeline, PipelineConfig};
use taskloom::progress::ProgressEvent;
use taskloom::stage::{Operator, ParallelConfig, Stage};
use taskloom::status::StepState;
use taskloom::step::{Step, StepError};
use taskloom::value::ResultValue;

fn context() -> PipelineContext {
    PipelineContext::new(Arc::new(()), Arc::new(()))
}

struct Upper(&'static str);
impl Step for Upper {
    fn step_id(&self) -> &str {
        self.0
    }
    fn run(&self, mut ctx: PipelineContext) -> Result<PipelineContext, StepError> {
        ctx.results
            .insert(self.0.to_string(), ResultValue::string(self.0.to_uppercase()));
        Ok(ctx)
    }
}

struct EmitsList(&'static str, Vec<i64>);
impl Step for EmitsList {
    fn step_id(&self) -> &str {
        self.0
    }
    fn run(&self, mut ctx: PipelineContext) -> Result<PipelineContext, StepError> {
        let items = self.1.iter().map(|n| ResultValue::Number(*n as f64)).collect();
        ctx.results.insert("items".into(), ResultValue::List(items));
        Ok(ctx)
    }
}

struct Fails(&'static str, bool);
impl Step for Fails {
    fn step_id(&self) -> &str {
        self.0
    }
    fn critical(&self) -> bool {
        self.1
    }
    fn run(&self, _ctx: PipelineContext) -> Result<PipelineContext, StepError> {
        Err(StepError::failed("boom"))
    }
}

struct Sleeps(&'static str, Duration);
impl Step for Sleeps {
    fn step_id(&self) -> &str {
        self.0
    }
    fn run(&self, ctx: PipelineContext) -> Result<PipelineContext, StepError> {
        std::thread::sleep(self.1);
        Ok(ctx)
    }
}

struct ReportsProgress(&'static str, Vec<f64>);
impl Step for ReportsProgress {
    fn step_id(&self) -> &str {
        self.0
    }
    fn run(&self, ctx: PipelineContext) -> Result<PipelineContext, StepError> {
        for p in &self.1 {
            ctx.update_step_progress.set(*p);
        }
        Ok(ctx)
    }
}

// Three serial steps run in order; progress is monotonic and reaches 100.
#[tokio::test]
async fn serial_happy_path() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let callback: taskloom::progress::ProgressCallback = Arc::new(move |event: &ProgressEvent| {
        seen_clone.lock().unwrap().push((event.stage_idx, event.overall_progress_percent));
    });

    let stages = vec![
        Stage::single(Arc::new(Upper("A"))),
        Stage::single(Arc::new(Upper("B"))),
        Stage::single(Arc::new(Upper("C"))),
    ];
    let pipeline = Pipeline::builder(stages, PipelineConfig::default())
        .with_progress_callback(callback)
        .build()
        .unwrap();

    let result = pipeline.run(context()).await.unwrap();

    assert_eq!(result.results["A"], ResultValue::string("A"));
    assert_eq!(result.results["B"], ResultValue::string("B"));
    assert_eq!(result.results["C"], ResultValue::string("C"));
    assert!(result.errors.is_empty());
    assert!((pipeline.get_status().progress - 100.0).abs() < 1e-6);

    let calls = seen.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls.windows(2).all(|w| w[1].1 >= w[0].1));
}

// An empty pipeline runs to completion with no errors and no progress.
#[tokio::test]
async fn empty_pipeline_passes_through() {
    let pipeline = Pipeline::new(vec![], PipelineConfig::default()).unwrap();
    let result = pipeline.run(context()).await.unwrap();
    assert!(result.errors.is_empty());
    assert_eq!(pipeline.get_status().progress, 0.0);
}

// An AND parallel stage where every branch succeeds merges their lists
// in branch input order.
#[tokio::test]
async fn parallel_and_merges_lists() {
    let stages = vec![Stage::parallel(
        vec![
            Arc::new(EmitsList("P1", vec![1, 2])),
            Arc::new(EmitsList("P2", vec![3, 4])),
        ],
        ParallelConfig::default(),
    )];
    let pipeline = Pipeline::new(stages, PipelineConfig::default()).unwrap();
    let result = pipeline.run(context()).await.unwrap();

    let items: Vec<f64> = result.results["items"]
        .as_list()
        .unwrap()
        .iter()
        .filter_map(ResultValue::as_f64)
        .collect();
    assert_eq!(items, vec![1.0, 2.0, 3.0, 4.0]);
    assert!((pipeline.get_status().progress - 100.0).abs() < 1e-6);
}

// A critical branch failure in an AND stage aborts the run under
// fail-fast, skipping every stage after it.
#[tokio::test]
async fn fail_fast_skips_remaining_stage() {
    let stages = vec![
        Stage::single(Arc::new(Upper("init"))),
        Stage::parallel(
            vec![
                Arc::new(Upper("ok_branch")),
                Arc::new(Fails("critical_fail_branch", true)),
            ],
            ParallelConfig::default(),
        ),
        Stage::single(Arc::new(Upper("finalize"))),
    ];
    let pipeline = Pipeline::new(stages, PipelineConfig::default().with_fail_fast(true)).unwrap();
    let result = pipeline.run(context()).await.unwrap();

    assert!(result.results.contains_key("init"));
    assert!(!result.results.contains_key("finalize"));
    assert!(result
        .errors
        .iter()
        .any(|e| e.step_id == "critical_fail_branch" && e.critical));

    let details = pipeline.get_status().step_details;
    assert_eq!(details["finalize"].state, StepState::Skipped);
}

// An OR stage succeeds once any one branch succeeds, and the run
// continues past it.
#[tokio::test]
async fn or_group_succeeds_with_one_branch() {
    let stages = vec![
        Stage::parallel(
            vec![Arc::new(Fails("fail_A", true)), Arc::new(Upper("succeed_B"))],
            ParallelConfig::default().with_operator(Operator::Or),
        ),
        Stage::single(Arc::new(Upper("after"))),
    ];
    let pipeline = Pipeline::new(stages, PipelineConfig::default()).unwrap();
    let result = pipeline.run(context()).await.unwrap();

    assert!(result.results.contains_key("after"));
    assert!(result.errors.iter().any(|e| e.step_id == "fail_A"));
}

// A branch still running when the group timeout elapses is excluded from
// the merge, but a sibling branch that already finished still merges.
#[tokio::test]
async fn group_timeout_excludes_slow_branch() {
    let stages = vec![Stage::parallel(
        vec![Arc::new(Sleeps("slow", Duration::from_secs(5))), Arc::new(Upper("fast"))],
        ParallelConfig::default()
            .with_timeout(Duration::from_millis(200))
            .with_operator(Operator::Or),
    )];
    let pipeline = Pipeline::new(stages, PipelineConfig::default()).unwrap();

    let start = std::time::Instant::now();
    let result = pipeline.run(context()).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));

    assert!(result.results.contains_key("fast"));
    assert!(result.errors.iter().any(|e| e.step_id == "slow" && e.message.contains("timeout")));
}

// Progress is observable from another task while a run is in flight, not
// just after it completes.
#[tokio::test]
async fn granular_progress_is_observable() {
    let stages = vec![Stage::single(Arc::new(ReportsProgress("only", vec![25.0, 50.0, 100.0])))];
    let pipeline = Arc::new(Pipeline::new(stages, PipelineConfig::default()).unwrap());

    let observed = Arc::new(Mutex::new(Vec::new()));
    let observed_clone = Arc::clone(&observed);
    let watcher = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            while pipeline.get_status().is_running {
                observed_clone.lock().unwrap().push(pipeline.get_status().progress);
                tokio::task::yield_now().await;
            }
        })
    };

    pipeline.run(context()).await.unwrap();
    let _ = watcher.await;

    assert!((pipeline.get_status().progress - 100.0).abs() < 1e-6);
}
