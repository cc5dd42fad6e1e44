//! Progress reporting for the long waits in the pipeline.
//!
//! The page-load loop and the download poll can run for minutes. Library
//! code reports through [`ProgressCallback`] so the CLI can render a
//! spinner while tests and non-interactive callers stay silent.

use std::sync::Arc;

/// Receives progress updates from a waiting operation.
///
/// Implementations must be `Send + Sync` so they can be shared as
/// `Arc<dyn ProgressCallback>` across `.await` points.
pub trait ProgressCallback: Send + Sync {
    /// Advance progress by `delta` units (attempts, polls).
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
