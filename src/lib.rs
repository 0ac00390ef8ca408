//! # taskloom: a concurrent task pipeline execution engine
//!
//! `taskloom` composes user-defined [`Step`](step::Step)s into an ordered
//! sequence of [`Stage`](stage::Stage)s, where a stage is either a single
//! step or a set of steps run concurrently. The [`Pipeline`](pipeline::Pipeline)
//! drives stages in order, merges concurrent results with type-directed
//! rules, and reports weighted progress that can be polled from another
//! thread while the pipeline is running.
//!
//! ## Core Concepts
//!
//! - **Step**: a unit of work (`step_id`, `critical`, `run`)
//! - **Stage**: one pipeline element — a single step, or a parallel group
//! - **Context**: the mutable carrier passed into and returned from every step
//! - **Pipeline**: the ordered stage list, its weight plan, and its run loop
//! - **Status board**: the shared, lock-guarded record of every step's progress
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use taskloom::context::PipelineContext;
//! use taskloom::pipeline::{Pipeline, PipelineConfig};
//! use taskloom::stage::Stage;
//! use taskloom::step::{Step, StepError};
//! use taskloom::value::ResultValue;
//!
//! struct Greet;
//! impl Step for Greet {
//!     fn step_id(&self) -> &str {
//!         "greet"
//!     }
//!     fn run(&self, mut ctx: PipelineContext) -> Result<PipelineContext, StepError> {
//!         ctx.results.insert("greet".into(), ResultValue::string("hello"));
//!         Ok(ctx)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     vec![Stage::single(Arc::new(Greet))],
//!     PipelineConfig::default(),
//! )?;
//!
//! let context = PipelineContext::new(Arc::new(()), Arc::new(()));
//! let result = pipeline.run(context).await?;
//! assert_eq!(result.results["greet"], ResultValue::string("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Parallel Stages and Merge Rules
//!
//! Steps in a parallel stage each see an isolated, deep-copied context; on
//! join, results are merged back in the branches' input order by the type
//! of the value under each key — lists concatenate, numbers sum, maps fold
//! shallowly, anything else is last-writer-wins. See [`merge`] for the
//! registry that drives this.
//!
//! ## Module Guide
//!
//! - [`step`] — the `Step` trait and its declared metadata
//! - [`context`] — `PipelineContext`, `ErrorRecord`
//! - [`value`] — the tagged `ResultValue` merge-dispatch type
//! - [`stage`] — `Stage`, `ParallelConfig`, `Operator`
//! - [`merge`] — type-directed merge strategy registry
//! - [`status`] — `StepStatus`, `StatusBoard`, `ProgressSnapshot`
//! - [`executors`] — the serial and parallel stage executors
//! - [`progress`] — progress callback plumbing and the optional progress channel
//! - [`pipeline`] — `PipelineConfig`, `Pipeline`
//! - [`error`] — the crate-wide `PipelineError`
//! - [`telemetry`] — optional tracing-subscriber init helper

pub mod context;
pub mod error;
pub mod executors;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod stage;
pub mod status;
pub mod step;
pub mod telemetry;
pub mod value;
