//! Gemini `generateContent` client.
//!
//! One `POST {base}/models/{model}:generateContent` per analysis with the
//! composed prompt as a single user turn and a fixed low sampling
//! temperature.

use crate::catalog::ProviderId;
use crate::config::AnalysisConfig;
use crate::error::ProviderError;
use crate::pipeline::llm::{
    http_client, join_url, send_error, status_error, CompletionBackend, CompletionRequest,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Finish reasons that mean the answer was withheld.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    temperature: f32,
    timeout_secs: u64,
}

impl GeminiBackend {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(ProviderId::Gemini, config.request_timeout_secs)?,
            base_url: config.gemini_base_url.clone(),
            temperature: config.gemini_temperature,
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let model = request
            .model_id
            .strip_prefix("models/")
            .unwrap_or(&request.model_id);
        let url = join_url(&self.base_url, &format!("models/{model}:generateContent"));
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        debug!("POST {} (temperature {})", url, self.temperature);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(ProviderId::Gemini, self.timeout_secs, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| send_error(ProviderId::Gemini, self.timeout_secs, e))?;
        if !status.is_success() {
            return Err(status_error(ProviderId::Gemini, status.as_u16(), &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(invalid)?;
        response_text(parsed)
    }
}

fn invalid(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::InvalidResponse {
        provider: ProviderId::Gemini.as_str().to_string(),
        detail: e.to_string(),
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String, ProviderError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        warn!("gemini: empty response ({})", reason);
        return Err(invalid(format!("response was blocked: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate
            .finish_reason
            .filter(|r| BLOCKED_FINISH_REASONS.contains(&r.as_str()))
        {
            return Err(invalid(format!("response was blocked: {reason}")));
        }
    }

    Ok(text)
}

impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.generate(request))
    }
}
