//! Progress callback plumbing and the optional progress-event channel.

use std::sync::Arc;

/// One progress notification: `(stage_idx, total_stages, last_step_id, overall_progress_percent)`.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage_idx: usize,
    pub total_stages: usize,
    pub last_step_id: String,
    pub overall_progress_percent: f64,
}

/// The callback signature invoked after each stage completes.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Returns a no-op callback, used internally when the caller supplies none.
pub fn noop_callback() -> ProgressCallback {
    Arc::new(|_event| {})
}

/// Adapts an optional caller-supplied callback into one that's always
/// callable, substituting a no-op when `callback` is `None`.
///
/// Mirrors the engine's internal habit of never special-casing "no callback"
/// at the call site.
pub fn with_progress_callback(callback: Option<ProgressCallback>) -> ProgressCallback {
    callback.unwrap_or_else(noop_callback)
}

/// A sender half for the optional progress-event stream: an additive,
/// non-blocking way to observe progress from another task without touching
/// the synchronous callback. Dropping the receiver is harmless; `push`
/// silently drops the event in that case.
#[derive(Clone)]
pub struct ProgressChannel {
    sender: flume::Sender<ProgressEvent>,
}

impl ProgressChannel {
    /// Creates a bounded progress channel pair. The receiver can be handed
    /// to a UI, log tailer, or test harness.
    pub fn bounded(capacity: usize) -> (Self, flume::Receiver<ProgressEvent>) {
        let (sender, receiver) = flume::bounded(capacity);
        (Self { sender }, receiver)
    }

    /// Creates an unbounded progress channel pair.
    pub fn unbounded() -> (Self, flume::Receiver<ProgressEvent>) {
        let (sender, receiver) = flume::unbounded();
        (Self { sender }, receiver)
    }

    pub(crate) fn push(&self, event: ProgressEvent) {
        let _ = self.sender.try_send(event);
    }
}
