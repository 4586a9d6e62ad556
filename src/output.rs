//! Request and result types for one analysis.

use crate::catalog::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything the dispatcher needs for one provider call.
///
/// Built fresh for every analyze action and dropped afterwards.
#[derive(Clone)]
pub struct AnalysisRequest {
    pub provider: ProviderId,
    pub model_id: String,
    pub api_key: String,
    pub document_text: String,
    pub prompts: Vec<String>,
}

impl fmt::Debug for AnalysisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisRequest")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_key", &"<redacted>")
            .field("document_chars", &self.document_text.chars().count())
            .field("prompts", &self.prompts)
            .finish()
    }
}

/// Outcome of one analysis: formatted output or an error message, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisResult {
    Success { html_content: String },
    Failure { error_message: String },
}

/// Shown when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

impl AnalysisResult {
    pub fn success(html_content: impl Into<String>) -> Self {
        AnalysisResult::Success {
            html_content: html_content.into(),
        }
    }

    /// Build a failure; an empty message becomes [`UNKNOWN_ERROR_MESSAGE`].
    pub fn failure(error_message: impl Into<String>) -> Self {
        let msg = error_message.into();
        let error_message = if msg.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            msg
        };
        AnalysisResult::Failure { error_message }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }

    pub fn html_content(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success { html_content } => Some(html_content),
            AnalysisResult::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success { .. } => None,
            AnalysisResult::Failure { error_message } => Some(error_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_failure_gets_generic_message() {
        let r = AnalysisResult::failure("   ");
        assert_eq!(r.error_message(), Some(UNKNOWN_ERROR_MESSAGE));
        assert!(r.html_content().is_none());
    }

    #[test]
    fn accessors_are_exclusive() {
        let ok = AnalysisResult::success("<p>hi</p>");
        assert!(ok.is_success());
        assert_eq!(ok.html_content(), Some("<p>hi</p>"));
        assert!(ok.error_message().is_none());
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(AnalysisResult::failure("boom")).unwrap();
        assert_eq!(json["failure"]["error_message"], "boom");
    }

    #[test]
    fn request_debug_hides_key() {
        let req = AnalysisRequest {
            provider: ProviderId::OpenAi,
            model_id: "gpt-4o-mini".into(),
            api_key: "sk-secret".into(),
            document_text: "abc".into(),
            prompts: vec![],
        };
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("document_chars: 3"));
    }
}
