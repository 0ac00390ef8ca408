//! The tagged value carried in a [`PipelineContext`](crate::context::PipelineContext)'s
//! `results` map.
//!
//! Steps write arbitrary results under their `step_id`; when a parallel stage
//! joins, each key's merge rule is chosen by the *tag* of the value rather than
//! by inspecting it at runtime (see [`crate::merge`]).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A result value produced by a step.
///
/// The variant a value is constructed with determines how it merges with
/// values of the same key from sibling branches in a parallel stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    /// An ordered sequence. Merges by concatenation, in branch order.
    List(Vec<ResultValue>),
    /// A number. Merges by arithmetic sum.
    Number(f64),
    /// A shallow string-keyed map. Merges by per-key last-writer-wins, one
    /// level deep only.
    Map(FxHashMap<String, ResultValue>),
    /// Anything else. Merges by last-writer-wins over the whole value.
    Opaque(serde_json::Value),
}

/// The discriminant used to key [`crate::merge::MergeRegistry`] lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultValueTag {
    List,
    Number,
    Map,
    Opaque,
}

impl ResultValue {
    pub fn tag(&self) -> ResultValueTag {
        match self {
            ResultValue::List(_) => ResultValueTag::List,
            ResultValue::Number(_) => ResultValueTag::Number,
            ResultValue::Map(_) => ResultValueTag::Map,
            ResultValue::Opaque(_) => ResultValueTag::Opaque,
        }
    }

    pub fn opaque(value: impl Into<serde_json::Value>) -> Self {
        ResultValue::Opaque(value.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        ResultValue::Opaque(serde_json::Value::String(s.into()))
    }

    pub fn map(entries: FxHashMap<String, ResultValue>) -> Self {
        ResultValue::Map(entries)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ResultValue]> {
        match self {
            ResultValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FxHashMap<String, ResultValue>> {
        match self {
            ResultValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for ResultValue {
    fn from(n: f64) -> Self {
        ResultValue::Number(n)
    }
}

impl From<i64> for ResultValue {
    fn from(n: i64) -> Self {
        ResultValue::Number(n as f64)
    }
}

impl From<&str> for ResultValue {
    fn from(s: &str) -> Self {
        ResultValue::string(s)
    }
}

impl From<String> for ResultValue {
    fn from(s: String) -> Self {
        ResultValue::string(s)
    }
}

impl<T: Into<ResultValue>> From<Vec<T>> for ResultValue {
    fn from(items: Vec<T>) -> Self {
        ResultValue::List(items.into_iter().map(Into::into).collect())
    }
}
