//! # edgequake-statement-analyzer
//!
//! Analyze PDF balance sheets with a large language model.
//!
//! The analyzer pulls the text out of a statement, asks the provider the
//! user picked to compute the ratios that text supports, and renders the
//! answer as a sanitized HTML fragment.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    read the chosen file and its declared type
//!  ├─ 2. Extract  page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Prompt   fixed header + enabled questions + statement text
//!  ├─ 4. LLM      one completion from openai | gemini (xai, deepseek: not yet)
//!  └─ 5. Format   strip filler, Markdown → sanitized HTML
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_statement_analyzer::{AnalyzerShell, Dispatcher, ProviderId, View};
//! use edgequake_statement_analyzer::pipeline::input::load_file;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::default();
//!     let mut shell = AnalyzerShell::new();
//!     shell.select_file(load_file("balance-sheet.pdf").await?);
//!     shell.change_provider(ProviderId::Gemini);
//!     shell.set_api_key(std::env::var("GEMINI_API_KEY")?);
//!
//!     match shell.analyze(&dispatcher).await {
//!         View::Result { html } => println!("{html}"),
//!         View::Error { message } => eprintln!("{message}"),
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `statement-analyzer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-statement-analyzer = { version = "0.1", default-features = false }
//! ```
//!
//! ## Providers
//!
//! | Provider | Models | Status |
//! |----------|--------|--------|
//! | `openai`   | gpt-4o-mini, o1-mini, o3-mini, gpt-4-turbo-preview, gpt-3.5-turbo | integrated |
//! | `gemini`   | gemini-1.5-pro, gemini-pro | integrated |
//! | `xai`      | xai-1.0 | listed, not yet available |
//! | `deepseek` | deepseek-coder | listed, not yet available |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod shell;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_sync, write_report, Dispatcher};
pub use catalog::{
    default_model_for, find_model, list_models, models_for, ModelDescriptor, ProviderId,
    DEFAULT_MODEL_ID,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, RenderMode};
pub use error::{AnalyzerError, ProviderError};
pub use output::{AnalysisRequest, AnalysisResult};
pub use pipeline::extract::{extract_text, join_page_fragments, ExtractedText};
pub use pipeline::format::format_response;
pub use pipeline::input::SelectedFile;
pub use pipeline::llm::{CompletionBackend, CompletionRequest};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{compose_prompt, QuestionSet};
pub use shell::{AnalysisJob, AnalyzerShell, ShellState, View};
