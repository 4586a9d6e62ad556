//! Analysis entry points.
//!
//! [`Dispatcher`] owns the provider boundary: it composes the prompt, picks
//! the backend, runs the completion and formats the answer. Whatever goes
//! wrong in between (bad key, quota, timeout, malformed body, even a panic
//! inside a backend) comes back as [`AnalysisResult::Failure`]. Callers
//! never see an `Err` or an unwind from here.

use crate::catalog::ProviderId;
use crate::config::AnalysisConfig;
use crate::error::{AnalyzerError, ProviderError};
use crate::output::{AnalysisRequest, AnalysisResult};
use crate::pipeline::format::format_response_with;
use crate::pipeline::llm::{complete_with_retry, resolve_backend, CompletionRequest};
use crate::pipeline::{extract, input::SelectedFile};
use crate::prompts::compose_prompt;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sends analysis requests to providers and formats the answers.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: AnalysisConfig,
}

impl Dispatcher {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run one analysis.
    ///
    /// Not idempotent: every call is a live, billable provider request
    /// (except for providers without an integration, which fail at once).
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let start = Instant::now();
        info!(
            "Analyzing with {}/{} ({} prompts, {} chars)",
            request.provider,
            request.model_id,
            request.prompts.len(),
            request.document_text.chars().count()
        );

        let outcome = AssertUnwindSafe(self.complete(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_message(panic)));

        let result = match outcome {
            Ok(raw) => {
                AnalysisResult::success(format_response_with(&raw, self.config.render_mode))
            }
            Err(message) => {
                warn!("Analysis failed: {}", message);
                AnalysisResult::failure(message)
            }
        };
        self.conclude(result, start)
    }

    /// Log the outcome and notify the progress callback exactly once.
    fn conclude(&self, result: AnalysisResult, start: Instant) -> AnalysisResult {
        info!(
            "Analysis {} in {}ms",
            if result.is_success() { "succeeded" } else { "failed" },
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_analysis_complete(result.is_success());
        }
        result
    }

    /// Run one analysis for a provider given by its wire identifier.
    ///
    /// An identifier outside the catalog yields
    /// `Failure { "Unsupported AI provider." }` without any network call.
    pub async fn analyze_named(
        &self,
        provider: &str,
        model_id: &str,
        api_key: &str,
        document_text: &str,
        prompts: &[String],
    ) -> AnalysisResult {
        let provider: ProviderId = match provider.parse() {
            Ok(p) => p,
            Err(e) => {
                let e: ProviderError = e;
                warn!("Rejected provider '{}': {}", provider, e);
                return self.conclude(AnalysisResult::failure(e.to_string()), Instant::now());
            }
        };
        let request = AnalysisRequest {
            provider,
            model_id: model_id.to_string(),
            api_key: api_key.to_string(),
            document_text: document_text.to_string(),
            prompts: prompts.to_vec(),
        };
        self.analyze(&request).await
    }

    /// Extract a statement's text and analyze it in one step.
    ///
    /// Extraction failures are reported as `Failure` too.
    pub async fn analyze_file(
        &self,
        file: &SelectedFile,
        provider: ProviderId,
        model_id: &str,
        api_key: &str,
        prompts: Vec<String>,
    ) -> AnalysisResult {
        let start = Instant::now();
        let extracted = match extract::extract_text(&file.bytes, &self.config).await {
            Ok(e) => e,
            Err(e) => {
                warn!("Extraction of '{}' failed: {}", file.name, e);
                return self.conclude(AnalysisResult::failure(e.to_string()), start);
            }
        };
        let request = AnalysisRequest {
            provider,
            model_id: model_id.to_string(),
            api_key: api_key.to_string(),
            document_text: extracted.text,
            prompts,
        };
        self.analyze(&request).await
    }

    async fn complete(&self, request: &AnalysisRequest) -> Result<String, String> {
        let backend = resolve_backend(request.provider, &self.config).map_err(|e| e.to_string())?;
        let completion = CompletionRequest {
            provider: request.provider,
            model_id: request.model_id.clone(),
            api_key: request.api_key.clone(),
            prompt: compose_prompt(&request.prompts, &request.document_text),
        };
        complete_with_retry(backend.as_ref(), &completion, &self.config)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Blocking wrapper around [`Dispatcher::analyze`].
///
/// Creates a temporary tokio runtime internally; must not be called from
/// inside an async context.
pub fn analyze_sync(
    dispatcher: &Dispatcher,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, AnalyzerError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(runtime.block_on(dispatcher.analyze(request)))
}

/// Write a rendered analysis to `path`.
///
/// Uses atomic write (temp file + rename) so a reader never sees a
/// half-written report.
pub async fn write_report(path: impl AsRef<Path>, content: &str) -> Result<(), AnalyzerError> {
    let path = path.as_ref();
    let write_failed = |source| AnalyzerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Best-effort text of a panic payload.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::new()
    }
}
