//! OpenAI-compatible chat completions client.
//!
//! One `POST {base}/chat/completions` per analysis, carrying a single user
//! message and no system message.

use crate::catalog::ProviderId;
use crate::config::AnalysisConfig;
use crate::error::ProviderError;
use crate::pipeline::llm::{
    http_client, join_url, send_error, status_error, CompletionBackend, CompletionRequest,
};
use crate::prompts::OPENAI_PERSONA_PREFIX;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for OpenAI and OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(ProviderId::OpenAi, config.request_timeout_secs)?,
            base_url: config.openai_base_url.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn chat(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = join_url(&self.base_url, "chat/completions");
        let body = ChatRequest {
            model: &request.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{OPENAI_PERSONA_PREFIX}{}", request.prompt),
            }],
        };
        debug!("POST {} (model {})", url, request.model_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(ProviderId::OpenAi, self.timeout_secs, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| send_error(ProviderId::OpenAi, self.timeout_secs, e))?;
        if !status.is_success() {
            return Err(status_error(ProviderId::OpenAi, status.as_u16(), &text));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
                provider: ProviderId::OpenAi.as_str().to_string(),
                detail: e.to_string(),
            })?;

        Ok(first_choice_text(parsed))
    }
}

/// Content of the first choice; missing pieces read as empty text.
fn first_choice_text(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default()
}

impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.chat(request))
    }
}
