//! Provider interaction: the completion seam, backend selection and retry.
//!
//! Each vendor is one [`CompletionBackend`] implementation. Adding a vendor
//! means adding a [`ProviderId`] variant and a backend; the dispatcher never
//! grows a per-vendor branch.
//!
//! ## Retry strategy
//!
//! Only transient failures (timeouts, connection errors, HTTP 5xx) are
//! retried, at most `max_retries` times, with exponential backoff
//! (`retry_backoff_ms * 2^attempt`). A bad key or an exhausted quota fails
//! on the first attempt: a retry would just be another billable error.

use crate::catalog::ProviderId;
use crate::config::AnalysisConfig;
use crate::error::ProviderError;
use crate::pipeline::{gemini::GeminiBackend, openai::OpenAiBackend};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// One completion call: a single prompt for a single model.
#[derive(Clone)]
pub struct CompletionRequest {
    pub provider: ProviderId,
    pub model_id: String,
    pub api_key: String,
    pub prompt: String,
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_key", &"<redacted>")
            .field("prompt_chars", &self.prompt.chars().count())
            .finish()
    }
}

/// A vendor that can turn a prompt into answer text.
pub trait CompletionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Issue exactly one completion request.
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>>;
}

/// Backend for catalog providers that have no client yet.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableBackend {
    pub provider: ProviderId,
}

impl CompletionBackend for UnavailableBackend {
    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn complete<'a>(
        &'a self,
        _request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        let provider = self.provider.as_str().to_string();
        Box::pin(async move { Err(ProviderError::Unavailable { provider }) })
    }
}

/// Whether the analyzer ships a working client for `provider`.
pub fn is_integrated(provider: ProviderId) -> bool {
    matches!(provider, ProviderId::OpenAi | ProviderId::Gemini)
}

/// Pick the backend for `provider`.
///
/// Resolution order:
/// 1. Providers without an integration always get [`UnavailableBackend`],
///    even when a custom backend is configured.
/// 2. A pre-built `config.backend` is used as-is.
/// 3. Otherwise the built-in client for the provider.
pub fn resolve_backend(
    provider: ProviderId,
    config: &AnalysisConfig,
) -> Result<Arc<dyn CompletionBackend>, ProviderError> {
    if !is_integrated(provider) {
        return Ok(Arc::new(UnavailableBackend { provider }));
    }
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }
    match provider {
        ProviderId::OpenAi => Ok(Arc::new(OpenAiBackend::from_config(config)?)),
        ProviderId::Gemini => Ok(Arc::new(GeminiBackend::from_config(config)?)),
        ProviderId::Xai | ProviderId::DeepSeek => Ok(Arc::new(UnavailableBackend { provider })),
    }
}

/// Exponential delay before retry `attempt` (1-based), saturating at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Run one completion, retrying transient failures.
pub async fn complete_with_retry(
    backend: &dyn CompletionBackend,
    request: &CompletionRequest,
    config: &AnalysisConfig,
) -> Result<String, ProviderError> {
    let start = Instant::now();
    let provider = request.provider.as_str();
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                provider, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_request_start(provider, &request.model_id, attempt);
        }

        match backend.complete(request).await {
            Ok(text) => {
                debug!(
                    "{}: {} chars in {:?} ({} retries)",
                    backend.name(),
                    text.len(),
                    start.elapsed(),
                    attempt
                );
                return Ok(text);
            }
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                warn!("{}: attempt {} failed: {}", provider, attempt + 1, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_retry(provider, attempt, &e.to_string());
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Shared HTTP helpers ──────────────────────────────────────────────────────

/// Build the reqwest client used by the built-in backends.
pub(crate) fn http_client(
    provider: ProviderId,
    timeout_secs: u64,
) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::Network {
            provider: provider.as_str().to_string(),
            detail: e.to_string(),
        })
}

/// Map a reqwest transport failure.
pub(crate) fn send_error(provider: ProviderId, timeout_secs: u64, e: reqwest::Error) -> ProviderError {
    let provider = provider.as_str().to_string();
    if e.is_builder() {
        ProviderError::InvalidRequest {
            provider,
            detail: e.to_string(),
        }
    } else if e.is_timeout() {
        ProviderError::Timeout {
            provider,
            secs: timeout_secs,
        }
    } else if e.is_decode() {
        ProviderError::InvalidResponse {
            provider,
            detail: e.to_string(),
        }
    } else {
        ProviderError::Network {
            provider,
            detail: e.to_string(),
        }
    }
}

/// Map a non-success HTTP status and body.
///
/// Both OpenAI and Gemini wrap failures as `{"error": {"message": "..."}}`;
/// the message is surfaced when present, the raw body otherwise.
pub(crate) fn status_error(provider: ProviderId, status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                trimmed.chars().take(300).collect()
            }
        });

    let name = provider.as_str().to_string();
    match status {
        401 | 403 => ProviderError::AuthError {
            provider: name,
            detail: message,
        },
        429 => ProviderError::RateLimitExceeded {
            provider: name,
            detail: message,
        },
        _ => ProviderError::Api { status, message },
    }
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Backend that replays a scripted sequence of outcomes.
    struct ScriptedBackend {
        outcomes: Mutex<Vec<Result<String, ProviderError>>>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(mut outcomes: Vec<Result<String, ProviderError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl CompletionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> BoxFuture<'a, Result<String, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()));
            Box::pin(async move { next })
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            provider: ProviderId::OpenAi,
            model_id: "gpt-4o-mini".into(),
            api_key: "sk-test".into(),
            prompt: "prompt".into(),
        }
    }

    fn fast_config(max_retries: u32) -> AnalysisConfig {
        AnalysisConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let backend = ScriptedBackend::new(vec![
            Err(ProviderError::Api {
                status: 503,
                message: "overloaded".into(),
            }),
            Ok("answer".into()),
        ]);
        let out = complete_with_retry(&backend, &request(), &fast_config(1)).await;
        assert_eq!(out, Ok("answer".to_string()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let backend = ScriptedBackend::new(vec![
            Err(ProviderError::Network {
                provider: "openai".into(),
                detail: "reset".into(),
            }),
            Err(ProviderError::Network {
                provider: "openai".into(),
                detail: "reset again".into(),
            }),
            Ok("too late".into()),
        ]);
        let out = complete_with_retry(&backend, &request(), &fast_config(1)).await;
        assert!(matches!(out, Err(ProviderError::Network { .. })));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let backend = ScriptedBackend::new(vec![
            Err(ProviderError::AuthError {
                provider: "openai".into(),
                detail: "Incorrect API key".into(),
            }),
            Ok("unreachable".into()),
        ]);
        let out = complete_with_retry(&backend, &request(), &fast_config(3)).await;
        assert!(matches!(out, Err(ProviderError::AuthError { .. })));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_backend_always_fails() {
        let backend = UnavailableBackend {
            provider: ProviderId::Xai,
        };
        let err = backend.complete(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "xai integration is not yet available");
    }

    #[test]
    fn unintegrated_providers_ignore_custom_backend() {
        let custom: Arc<dyn CompletionBackend> = Arc::new(ScriptedBackend::new(vec![]));
        let config = AnalysisConfig::builder().backend(custom).build().unwrap();
        let b = resolve_backend(ProviderId::DeepSeek, &config).unwrap();
        assert_eq!(b.name(), "deepseek");
        let b = resolve_backend(ProviderId::OpenAi, &config).unwrap();
        assert_eq!(b.name(), "scripted");
    }

    #[test]
    fn status_error_mapping() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            status_error(ProviderId::OpenAi, 401, body),
            ProviderError::AuthError {
                provider: "openai".into(),
                detail: "Incorrect API key provided".into()
            }
        );
        assert!(matches!(
            status_error(ProviderId::Gemini, 429, "{}"),
            ProviderError::RateLimitExceeded { .. }
        ));
        assert_eq!(
            status_error(ProviderId::Gemini, 500, ""),
            ProviderError::Api {
                status: 500,
                message: "HTTP 500".into()
            }
        );
    }

    #[test]
    fn unbuildable_request_is_not_retried() {
        let e = reqwest::Client::new()
            .post("http://localhost/chat/completions")
            .header("authorization", "Bearer sk-\nsecret")
            .build()
            .unwrap_err();
        let err = send_error(ProviderId::OpenAi, 60, e);
        assert!(matches!(err, ProviderError::InvalidRequest { .. }), "got: {err:?}");
        assert!(!err.is_transient());
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 3), 2_000);
        assert_eq!(backoff_ms(u64::MAX / 2, 3), u64::MAX);
        assert_eq!(backoff_ms(1, 200), u64::MAX);
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://h/v1/", "/chat"), "http://h/v1/chat");
        assert_eq!(join_url("http://h/v1", "chat"), "http://h/v1/chat");
    }
}
