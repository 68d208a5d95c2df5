//! Progress-callback trait for fallback-chain events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to observe
//! each candidate model as it is tried. The CLI uses this to drive a spinner;
//! other front ends can forward the events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use studylm::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failures: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_candidate_failed(&self, model: &str, _index: usize, error: &str) {
//!         self.failures.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{model} failed: {error}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { failures: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .api_key("gsk_example")
//!     .progress_callback(cb as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generator as it walks the fallback chain.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive sequentially, in chain order.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before the first candidate is tried.
    fn on_generation_start(&self, total_candidates: usize) {
        let _ = total_candidates;
    }

    /// Called just before the request for a candidate is sent.
    ///
    /// # Arguments
    /// * `model` — candidate model identifier
    /// * `index` — zero-based position in the chain
    fn on_candidate_start(&self, model: &str, index: usize) {
        let _ = (model, index);
    }

    /// Called when a candidate fails and the chain moves on.
    fn on_candidate_failed(&self, model: &str, index: usize, error: &str) {
        let _ = (model, index, error);
    }

    /// Called once, either with the accepted model or `None` when the chain
    /// was exhausted.
    fn on_generation_complete(&self, model: Option<&str>, attempts: usize) {
        let _ = (model, attempts);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl GenerationProgressCallback for Recorder {
        fn on_generation_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start:{total}"));
        }
        fn on_candidate_failed(&self, model: &str, index: usize, _error: &str) {
            self.events.lock().unwrap().push(format!("fail:{model}:{index}"));
        }
        fn on_generation_complete(&self, model: Option<&str>, attempts: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}:{attempts}", model.unwrap_or("-")));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_generation_start(4);
        cb.on_candidate_start("m", 0);
        cb.on_candidate_failed("m", 0, "boom");
        cb.on_generation_complete(None, 4);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_generation_start(2);
        rec.on_candidate_start("a", 0);
        rec.on_candidate_failed("a", 0, "timeout");
        rec.on_generation_complete(Some("b"), 2);
        assert_eq!(
            *rec.events.lock().unwrap(),
            vec!["start:2", "fail:a:0", "done:b:2"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_generation_start(1);
        cb.on_generation_complete(Some("x"), 1);
    }
}
