//! Progress-callback trait for analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to follow an
//! analysis as it moves from text extraction to the provider request. The
//! CLI uses it to drive a spinner; a GUI host could use it to show a
//! "busy" indicator.
//!
//! # Example
//!
//! ```rust
//! use edgequake_statement_analyzer::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct AttemptCounter {
//!     attempts: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for AttemptCounter {
//!     fn on_request_start(&self, _provider: &str, _model: &str, _attempt: u32) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(AttemptCounter { attempts: AtomicUsize::new(0) });
//! let config = AnalysisConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the analyzer at each step of one analysis.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: extraction
/// runs on a blocking pool thread.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called before the PDF is opened.
    fn on_extraction_start(&self, byte_len: usize) {
        let _ = byte_len;
    }

    /// Called once all page text has been collected.
    ///
    /// # Arguments
    /// * `pages`: number of pages read
    /// * `chars`: character count of the joined text
    fn on_extraction_complete(&self, pages: usize, chars: usize) {
        let _ = (pages, chars);
    }

    /// Called just before each provider request (attempt is 0-based).
    fn on_request_start(&self, provider: &str, model: &str, attempt: u32) {
        let _ = (provider, model, attempt);
    }

    /// Called when an attempt fails and will be retried.
    fn on_retry(&self, provider: &str, attempt: u32, error: &str) {
        let _ = (provider, attempt, error);
    }

    /// Called once the analysis has produced a result.
    fn on_analysis_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
