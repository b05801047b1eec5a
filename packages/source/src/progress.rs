//! Progress reporting callback for long-running fetches.
//!
//! Library code reports progress through this trait; binaries decide how
//! to render it (the CLI wires it to `indicatif` bars). The null
//! implementation keeps progress optional for tests and headless use.

use std::sync::Arc;

/// Callback interface for reporting fetch progress.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of work units, once known.
    fn set_total(&self, total: u64);

    /// Sets the absolute progress position.
    fn set_position(&self, pos: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Updates the progress message.
    fn set_message(&self, msg: String);

    /// Marks the work finished with a final message.
    fn finish(&self, msg: String);

    /// Removes the progress display entirely.
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that discards all updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared no-op progress callback.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
