//! Prompt text for statement analysis.
//!
//! Every string the model sees is defined here so a wording change touches
//! exactly one place and unit tests can inspect the composed prompt without
//! a live provider.

/// Instruction header placed before the question list.
pub const ANALYSIS_HEADER: &str =
    "Analyze this balance sheet and answer the following questions. Provide concise explanations:";

/// Label introducing the extracted statement text.
pub const REPORT_LABEL: &str = "Report content:";

/// Prefix prepended to the user message for OpenAI-class chat models.
///
/// Sent inside the user turn rather than as a system message: reasoning
/// models such as `o1-mini` reject the `system` role.
pub const OPENAI_PERSONA_PREFIX: &str = "You are a precise analyzer of financial reports. ";

/// Question contributed by the "run all ratios" toggle.
pub const RUN_ALL_RATIOS_PROMPT: &str =
    "Calculate all financial ratios that are possible from the provided data. Present the results as a table.";

/// Build the single prompt sent to a provider.
///
/// Layout: header, blank line, one question per line, blank line, the
/// report label and the statement text verbatim.
pub fn compose_prompt(prompts: &[String], document_text: &str) -> String {
    format!(
        "{ANALYSIS_HEADER}\n\n{}\n\n{REPORT_LABEL}\n{document_text}",
        prompts.join("\n")
    )
}

/// The analysis questions a user can switch on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionSet {
    /// Compute every derivable ratio and tabulate it. Default: on.
    pub run_all_ratios: bool,
}

impl Default for QuestionSet {
    fn default() -> Self {
        Self {
            run_all_ratios: true,
        }
    }
}

impl QuestionSet {
    /// Prompts for the enabled questions, in a stable order.
    pub fn prompts(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.run_all_ratios {
            out.push(RUN_ALL_RATIOS_PROMPT.to_string());
        }
        out
    }
}
