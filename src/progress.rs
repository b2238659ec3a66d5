//! Observer trait for render lifecycle events.
//!
//! Inject an [`Arc<dyn RenderObserver>`] via
//! [`crate::config::RendererConfigBuilder::observer`] to hear about each
//! invocation of the rendering binary: a terminal spinner, metrics, an audit
//! log. The library never depends on how the host reports progress.
//!
//! # Example
//!
//! ```rust
//! use edgequake_html2pdf::RenderObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct BytesCounter(AtomicUsize);
//!
//! impl RenderObserver for BytesCounter {
//!     fn on_invoke_complete(&self, bytes: usize, _elapsed_ms: u64) {
//!         self.0.fetch_add(bytes, Ordering::Relaxed);
//!     }
//! }
//! ```

use crate::error::RenderError;
use std::path::Path;
use std::sync::Arc;

/// Called by the invoker around every run of the binary.
///
/// Invocations may overlap, so implementations can be called concurrently
/// and must synchronise their own state. All methods default to no-ops.
pub trait RenderObserver: Send + Sync {
    /// The binary is about to be spawned with `argc` arguments.
    fn on_invoke_start(&self, program: &Path, argc: usize) {
        let _ = (program, argc);
    }

    /// The binary exited successfully with `bytes` of output.
    fn on_invoke_complete(&self, bytes: usize, elapsed_ms: u64) {
        let _ = (bytes, elapsed_ms);
    }

    /// The invocation failed (non-zero exit, spawn error, or timeout).
    fn on_invoke_failed(&self, error: &RenderError) {
        let _ = error;
    }
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

/// Type stored in [`crate::config::RendererConfig`].
pub type SharedObserver = Arc<dyn RenderObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        starts: AtomicUsize,
        bytes: AtomicUsize,
        elapsed: AtomicU64,
        failures: AtomicUsize,
    }

    impl RenderObserver for Tracking {
        fn on_invoke_start(&self, _program: &Path, _argc: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_invoke_complete(&self, bytes: usize, elapsed_ms: u64) {
            self.bytes.fetch_add(bytes, Ordering::SeqCst);
            self.elapsed.fetch_add(elapsed_ms, Ordering::SeqCst);
        }

        fn on_invoke_failed(&self, _error: &RenderError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_accepts_all_events() {
        let obs: SharedObserver = Arc::new(NoopObserver);
        obs.on_invoke_start(Path::new("/usr/bin/wkhtmltopdf"), 3);
        obs.on_invoke_complete(1024, 12);
        obs.on_invoke_failed(&RenderError::Timeout {
            timeout: std::time::Duration::from_secs(1),
        });
    }

    #[test]
    fn tracking_observer_receives_events() {
        let t = Tracking::default();
        t.on_invoke_start(Path::new("wk"), 2);
        t.on_invoke_complete(100, 5);
        t.on_invoke_start(Path::new("wk"), 2);
        t.on_invoke_failed(&RenderError::Internal("x".into()));

        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.bytes.load(Ordering::SeqCst), 100);
        assert_eq!(t.elapsed.load(Ordering::SeqCst), 5);
        assert_eq!(t.failures.load(Ordering::SeqCst), 1);
    }
}
