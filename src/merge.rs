//! Type-directed merge strategies applied when a parallel stage joins.
//!
//! Mirrors a reducer-registry keyed by tag rather than runtime reflection:
//! each [`ResultValueTag`] has exactly one [`MergeStrategy`] registered
//! against it, and `MergeRegistry::merge` dispatches on the tag of the
//! incoming value.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::value::{ResultValue, ResultValueTag};

/// A merge strategy for one [`ResultValueTag`].
///
/// `fold` combines an accumulated value with the next branch's value, in
/// branch input order. `seed` produces the starting accumulator when the key
/// is absent from the base context.
pub trait MergeStrategy: Send + Sync {
    fn fold(&self, accumulated: ResultValue, next: ResultValue) -> ResultValue;
}

struct ConcatList;
impl MergeStrategy for ConcatList {
    fn fold(&self, accumulated: ResultValue, next: ResultValue) -> ResultValue {
        match (accumulated, next) {
            (ResultValue::List(mut a), ResultValue::List(b)) => {
                a.extend(b);
                ResultValue::List(a)
            }
            (ResultValue::List(mut a), other) => {
                a.push(other);
                ResultValue::List(a)
            }
            (other, ResultValue::List(b)) => {
                let mut out = vec![other];
                out.extend(b);
                ResultValue::List(out)
            }
            (a, b) => ResultValue::List(vec![a, b]),
        }
    }
}

struct SumNumbers;
impl MergeStrategy for SumNumbers {
    fn fold(&self, accumulated: ResultValue, next: ResultValue) -> ResultValue {
        let a = accumulated.as_f64().unwrap_or(0.0);
        let b = next.as_f64().unwrap_or(0.0);
        ResultValue::Number(a + b)
    }
}

struct ShallowMapFold;
impl MergeStrategy for ShallowMapFold {
    fn fold(&self, accumulated: ResultValue, next: ResultValue) -> ResultValue {
        match (accumulated, next) {
            (ResultValue::Map(mut a), ResultValue::Map(b)) => {
                for (k, v) in b {
                    a.insert(k, v);
                }
                ResultValue::Map(a)
            }
            (_, next @ ResultValue::Map(_)) => next,
            (accumulated, _) => accumulated,
        }
    }
}

struct LastWriterWins;
impl MergeStrategy for LastWriterWins {
    fn fold(&self, _accumulated: ResultValue, next: ResultValue) -> ResultValue {
        next
    }
}

/// Registry of merge strategies keyed by [`ResultValueTag`].
///
/// The default registry covers every tag; callers may override a tag's
/// strategy with [`MergeRegistry::with_strategy`].
#[derive(Clone)]
pub struct MergeRegistry {
    strategies: FxHashMap<ResultValueTag, Arc<dyn MergeStrategy>>,
}

impl Default for MergeRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register(ResultValueTag::List, Arc::new(ConcatList))
            .register(ResultValueTag::Number, Arc::new(SumNumbers))
            .register(ResultValueTag::Map, Arc::new(ShallowMapFold))
            .register(ResultValueTag::Opaque, Arc::new(LastWriterWins));
        registry
    }
}

impl MergeRegistry {
    pub fn new() -> Self {
        Self {
            strategies: FxHashMap::default(),
        }
    }

    /// Registers a merge strategy for `tag`, replacing any previous one.
    pub fn register(&mut self, tag: ResultValueTag, strategy: Arc<dyn MergeStrategy>) -> &mut Self {
        self.strategies.insert(tag, strategy);
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with_strategy(mut self, tag: ResultValueTag, strategy: Arc<dyn MergeStrategy>) -> Self {
        self.register(tag, strategy);
        self
    }

    /// Merges `base` (the key's current value, if any) with `branch_values`
    /// taken in branch input order, dispatching on the tag of the first
    /// value encountered (base if present, else the first branch value).
    pub fn merge(&self, base: Option<ResultValue>, branch_values: Vec<ResultValue>) -> Option<ResultValue> {
        let mut values = base.into_iter().chain(branch_values);
        let first = values.next()?;
        let tag = first.tag();
        let strategy = self.strategies.get(&tag).cloned().unwrap_or_else(|| Arc::new(LastWriterWins));
        Some(values.fold(first, |acc, next| strategy.fold(acc, next)))
    }
}
