//! Configuration types for statement analysis.
//!
//! Every knob lives in [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. The API key is deliberately *not* part of the
//! config: it is per-request input supplied by the user and travels inside
//! [`crate::output::AnalysisRequest`].

use crate::error::AnalyzerError;
use crate::pipeline::llm::CompletionBackend;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default OpenAI-compatible API root.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Gemini API root.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Upper bound on `max_retries`; more than this only burns quota.
pub const MAX_RETRIES_CAP: u32 = 3;

/// Upper bound on the base retry backoff.
pub const MAX_RETRY_BACKOFF_MS: u64 = 30_000;

/// Configuration for an analysis run.
///
/// # Example
/// ```rust
/// use edgequake_statement_analyzer::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .request_timeout_secs(30)
///     .max_retries(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.request_timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Per-request timeout in seconds. Default: 60.
    ///
    /// Without a timeout an unresponsive provider would leave the shell in
    /// the busy state forever.
    pub request_timeout_secs: u64,

    /// Retries on a transient provider failure (timeout, connection error,
    /// HTTP 5xx). Default: 1. Capped at [`MAX_RETRIES_CAP`].
    ///
    /// Authentication and quota errors are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Sampling temperature sent to Gemini. Default: 0.2.
    ///
    /// Financial analysis should be repeatable; a low temperature keeps the
    /// model close to the figures on the statement.
    pub gemini_temperature: f32,

    /// Root of the OpenAI-compatible API.
    pub openai_base_url: String,

    /// Root of the Gemini API.
    pub gemini_base_url: String,

    /// How the model answer is rendered. Default: [`RenderMode::Html`].
    pub render_mode: RenderMode,

    /// PDF user password for encrypted statements.
    pub password: Option<String>,

    /// Pre-constructed completion backend. Takes precedence over the
    /// built-in per-provider clients.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Optional progress callback for extraction/request events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            max_retries: 1,
            retry_backoff_ms: 500,
            gemini_temperature: 0.2,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            render_mode: RenderMode::default(),
            password: None,
            backend: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("gemini_temperature", &self.gemini_temperature)
            .field("openai_base_url", &self.openai_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("render_mode", &self.render_mode)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_CAP);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms.min(MAX_RETRY_BACKOFF_MS);
        self
    }

    pub fn gemini_temperature(mut self, t: f32) -> Self {
        self.config.gemini_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.openai_base_url = url.into();
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = url.into();
        self
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.config.render_mode = mode;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyzerError> {
        let c = &self.config;
        if c.request_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        for (name, url) in [
            ("OpenAI base URL", &c.openai_base_url),
            ("Gemini base URL", &c.gemini_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "{name} must be an HTTP/HTTPS URL, got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a model answer is turned into displayable output.
///
/// Model output is untrusted. `Html` converts Markdown through an allow-list
/// (raw HTML is escaped, unsafe link schemes dropped); `PlainText` skips
/// conversion entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Sanitized HTML fragment. (default)
    #[default]
    Html,
    /// Cleaned text, no markup conversion.
    PlainText,
}
