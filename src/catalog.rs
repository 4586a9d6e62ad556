//! Static provider → model catalog.
//!
//! The table is process-wide immutable data: it is compiled into the binary
//! and never mutated, so every lookup is a plain slice scan.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of LLM vendors the analyzer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    OpenAi,
    Gemini,
    Xai,
    DeepSeek,
}

impl ProviderId {
    /// All providers in menu order.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Xai,
        ProviderId::DeepSeek,
    ];

    /// Wire identifier (`openai`, `gemini`, `xai`, `deepseek`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::Xai => "xai",
            ProviderId::DeepSeek => "deepseek",
        }
    }

    /// Human-facing vendor name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Gemini => "Google Gemini",
            ProviderId::Xai => "xAI",
            ProviderId::DeepSeek => "DeepSeek",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(ProviderError::Unsupported)
    }
}

/// One selectable model and the provider that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub provider: ProviderId,
}

const fn model(id: &'static str, display_name: &'static str, provider: ProviderId) -> ModelDescriptor {
    ModelDescriptor {
        id,
        display_name,
        provider,
    }
}

static MODELS: [ModelDescriptor; 9] = [
    model("gpt-4o-mini", "GPT-4o Mini", ProviderId::OpenAi),
    model("o1-mini", "o1 Mini", ProviderId::OpenAi),
    model("o3-mini", "o3 Mini", ProviderId::OpenAi),
    model("gpt-4-turbo-preview", "GPT-4 Turbo", ProviderId::OpenAi),
    model("gpt-3.5-turbo", "GPT-3.5 Turbo", ProviderId::OpenAi),
    model("gemini-1.5-pro", "Gemini 1.5 Pro", ProviderId::Gemini),
    model("gemini-pro", "Gemini Pro", ProviderId::Gemini),
    model("xai-1.0", "xAI 1.0", ProviderId::Xai),
    model("deepseek-coder", "DeepSeek Coder", ProviderId::DeepSeek),
];

/// Model selected when the analyzer first starts.
pub const DEFAULT_MODEL_ID: &str = "o1-mini";

/// Every model, in catalog order.
pub fn list_models() -> &'static [ModelDescriptor] {
    &MODELS
}

/// Models served by `provider`, preserving catalog order.
pub fn models_for(provider: ProviderId) -> Vec<&'static ModelDescriptor> {
    MODELS.iter().filter(|m| m.provider == provider).collect()
}

/// First catalog model for `provider`, if it has any.
pub fn default_model_for(provider: ProviderId) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.provider == provider)
}

/// Look up a model by identifier.
pub fn find_model(id: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.id == id)
}
