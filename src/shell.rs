//! Application shell: the state machine behind the analyzer's single screen.
//!
//! ```text
//! Idle ──select_file──▶ FileSelected ──begin_analysis──▶ Analyzing
//!                                                         │
//!                                   finish_analysis ◀─────┘
//!                                   │            │
//!                              ResultReady   ErrorShown
//! ```
//!
//! The shell owns the user's selections. An analysis is split into
//! [`AnalyzerShell::begin_analysis`] (validate and mark busy),
//! [`AnalysisJob::run`] (extract and dispatch, no shell borrow held) and
//! [`AnalyzerShell::finish_analysis`] (publish the outcome), so a host can
//! keep rendering the busy view while the job is in flight.

use crate::analyze::Dispatcher;
use crate::catalog::{default_model_for, ProviderId, DEFAULT_MODEL_ID};
use crate::output::AnalysisResult;
use crate::pipeline::input::SelectedFile;
use crate::prompts::QuestionSet;
use std::fmt;
use tracing::{debug, info};

/// Shown when a non-PDF file is chosen.
pub const NOT_A_PDF_MESSAGE: &str = "Please select a PDF file";

/// Shown when analysis is requested without a file or an API key.
pub const MISSING_INPUT_MESSAGE: &str = "Please select a file and provide an API key";

/// Shown when analysis is requested with every question switched off.
pub const NO_QUESTIONS_MESSAGE: &str = "Please enable at least one analysis option";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellState {
    #[default]
    Idle,
    FileSelected,
    Analyzing,
    ResultReady,
    ErrorShown,
}

/// What the host should display. Result and error never appear together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Idle,
    Busy,
    Result { html: String },
    Error { message: String },
}

/// User selections and the last outcome.
#[derive(Clone)]
pub struct AnalyzerShell {
    selected_file: Option<SelectedFile>,
    provider: ProviderId,
    model_id: String,
    api_key: String,
    questions: QuestionSet,
    result: Option<String>,
    error: Option<String>,
    state: ShellState,
}

impl Default for AnalyzerShell {
    fn default() -> Self {
        Self {
            selected_file: None,
            provider: ProviderId::default(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_key: String::new(),
            questions: QuestionSet::default(),
            result: None,
            error: None,
            state: ShellState::Idle,
        }
    }
}

impl fmt::Debug for AnalyzerShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerShell")
            .field("selected_file", &self.selected_file.as_ref().map(|s| &s.name))
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_key", &(!self.api_key.is_empty()).then_some("<redacted>"))
            .field("questions", &self.questions)
            .field("has_result", &self.result.is_some())
            .field("error", &self.error)
            .field("state", &self.state)
            .finish()
    }
}

impl AnalyzerShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn questions(&self) -> QuestionSet {
        self.questions
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Accept a file if its declared type is PDF.
    ///
    /// A rejected file leaves the previous selection in place.
    pub fn select_file(&mut self, file: SelectedFile) {
        if self.is_busy() {
            return;
        }
        if !file.is_pdf() {
            debug!("Rejected '{}' ({})", file.name, file.declared_type);
            self.show_error(NOT_A_PDF_MESSAGE);
            return;
        }
        info!("Selected '{}' ({} bytes)", file.name, file.bytes.len());
        self.selected_file = Some(file);
        self.error = None;
        self.result = None;
        self.state = ShellState::FileSelected;
    }

    /// Switch provider and select its first catalog model.
    pub fn change_provider(&mut self, provider: ProviderId) {
        self.provider = provider;
        if let Some(model) = default_model_for(provider) {
            self.model_id = model.id.to_string();
        }
    }

    pub fn set_model(&mut self, model_id: impl Into<String>) {
        self.model_id = model_id.into();
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    pub fn set_run_all_ratios(&mut self, enabled: bool) {
        self.questions.run_all_ratios = enabled;
    }

    pub fn is_busy(&self) -> bool {
        self.state == ShellState::Analyzing
    }

    /// Whether the analyze action is enabled.
    pub fn can_analyze(&self) -> bool {
        !self.is_busy()
            && self.selected_file.is_some()
            && !self.api_key.trim().is_empty()
            && !self.questions.prompts().is_empty()
    }

    /// Validate inputs and enter the busy state.
    ///
    /// Returns `None` while another analysis is running, or after recording a
    /// validation error. No provider is contacted in either case.
    pub fn begin_analysis(&mut self) -> Option<AnalysisJob> {
        if self.is_busy() {
            debug!("Analysis already in flight; ignoring request");
            return None;
        }
        let file = match self.selected_file {
            Some(ref f) if !self.api_key.trim().is_empty() => f.clone(),
            _ => {
                self.show_error(MISSING_INPUT_MESSAGE);
                return None;
            }
        };
        let prompts = self.questions.prompts();
        if prompts.is_empty() {
            self.show_error(NO_QUESTIONS_MESSAGE);
            return None;
        }

        self.error = None;
        self.result = None;
        self.state = ShellState::Analyzing;
        Some(AnalysisJob {
            file,
            provider: self.provider,
            model_id: self.model_id.clone(),
            api_key: self.api_key.clone(),
            prompts,
        })
    }

    /// Publish the outcome of the job started by [`Self::begin_analysis`].
    pub fn finish_analysis(&mut self, result: AnalysisResult) {
        if !self.is_busy() {
            debug!("No analysis in flight; dropping result");
            return;
        }
        match result {
            AnalysisResult::Success { html_content } => {
                self.result = Some(html_content);
                self.error = None;
                self.state = ShellState::ResultReady;
            }
            AnalysisResult::Failure { error_message } => self.show_error(error_message),
        }
    }

    /// Run a complete analysis: begin, extract and dispatch, finish.
    pub async fn analyze(&mut self, dispatcher: &Dispatcher) -> View {
        if let Some(job) = self.begin_analysis() {
            let result = job.run(dispatcher).await;
            self.finish_analysis(result);
        }
        self.view()
    }

    pub fn view(&self) -> View {
        if self.is_busy() {
            return View::Busy;
        }
        match (&self.error, &self.result) {
            (Some(message), _) => View::Error {
                message: message.clone(),
            },
            (None, Some(html)) => View::Result { html: html.clone() },
            (None, None) => View::Idle,
        }
    }

    fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.result = None;
        self.state = ShellState::ErrorShown;
    }
}

/// A validated analysis, detached from the shell while it runs.
#[derive(Clone)]
pub struct AnalysisJob {
    file: SelectedFile,
    provider: ProviderId,
    model_id: String,
    api_key: String,
    prompts: Vec<String>,
}

impl fmt::Debug for AnalysisJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisJob")
            .field("file", &self.file.name)
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("api_key", &"<redacted>")
            .field("prompts", &self.prompts)
            .finish()
    }
}

impl AnalysisJob {
    /// Extract the file's text and dispatch it. Never fails: every error is
    /// a `Failure` result.
    pub async fn run(self, dispatcher: &Dispatcher) -> AnalysisResult {
        dispatcher
            .analyze_file(
                &self.file,
                self.provider,
                &self.model_id,
                &self.api_key,
                self.prompts,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::error::ProviderError;
    use crate::pipeline::input::PDF_MIME;
    use crate::pipeline::llm::{CompletionBackend, CompletionRequest};
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl CompletionBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> BoxFuture<'a, Result<String, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok("ok".to_string()) })
        }
    }

    fn pdf(name: &str) -> SelectedFile {
        SelectedFile::new(name, PDF_MIME, b"%PDF-1.7 stub".to_vec())
    }

    fn counting_dispatcher() -> (Dispatcher, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        let config = AnalysisConfig::builder()
            .backend(backend.clone())
            .build()
            .unwrap();
        (Dispatcher::new(config), backend)
    }

    #[test]
    fn initial_selection() {
        let shell = AnalyzerShell::new();
        assert_eq!(shell.state(), ShellState::Idle);
        assert_eq!(shell.provider(), ProviderId::OpenAi);
        assert_eq!(shell.model_id(), "o1-mini");
        assert!(shell.questions().run_all_ratios);
        assert_eq!(shell.view(), View::Idle);
        assert!(!shell.can_analyze());
    }

    #[test]
    fn non_pdf_keeps_previous_file() {
        let mut shell = AnalyzerShell::new();
        shell.select_file(pdf("q1.pdf"));
        shell.select_file(SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()));
        assert_eq!(shell.selected_file().unwrap().name, "q1.pdf");
        assert_eq!(
            shell.view(),
            View::Error {
                message: NOT_A_PDF_MESSAGE.into()
            }
        );

        shell.select_file(pdf("q2.pdf"));
        assert_eq!(shell.state(), ShellState::FileSelected);
        assert_eq!(shell.error(), None);
    }

    #[test]
    fn provider_change_picks_first_model() {
        let mut shell = AnalyzerShell::new();
        shell.change_provider(ProviderId::Gemini);
        assert_eq!(shell.model_id(), "gemini-1.5-pro");
        shell.change_provider(ProviderId::DeepSeek);
        assert_eq!(shell.model_id(), "deepseek-coder");
        shell.change_provider(ProviderId::OpenAi);
        assert_eq!(shell.model_id(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn empty_key_never_reaches_provider() {
        let (dispatcher, backend) = counting_dispatcher();
        let mut shell = AnalyzerShell::new();
        shell.select_file(pdf("q1.pdf"));
        shell.set_api_key("");

        let view = shell.analyze(&dispatcher).await;
        assert_eq!(
            view,
            View::Error {
                message: MISSING_INPUT_MESSAGE.into()
            }
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_file_is_rejected() {
        let (dispatcher, backend) = counting_dispatcher();
        let mut shell = AnalyzerShell::new();
        shell.set_api_key("sk-test");
        let view = tokio_test::block_on(shell.analyze(&dispatcher));
        assert_eq!(
            view,
            View::Error {
                message: MISSING_INPUT_MESSAGE.into()
            }
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn all_questions_off_is_rejected() {
        let mut shell = AnalyzerShell::new();
        shell.select_file(pdf("q1.pdf"));
        shell.set_api_key("sk-test");
        shell.set_run_all_ratios(false);
        assert!(!shell.can_analyze());
        assert!(shell.begin_analysis().is_none());
        assert_eq!(shell.error(), Some(NO_QUESTIONS_MESSAGE));
    }

    #[test]
    fn busy_guard() {
        let mut shell = AnalyzerShell::new();
        shell.select_file(pdf("q1.pdf"));
        shell.set_api_key("sk-test");
        assert!(shell.can_analyze());

        let job = shell.begin_analysis().expect("first job");
        assert_eq!(shell.view(), View::Busy);
        assert!(!shell.can_analyze());
        assert!(shell.begin_analysis().is_none());
        assert_eq!(shell.error(), None);

        drop(job);
        shell.finish_analysis(AnalysisResult::success("<p>done</p>"));
        assert_eq!(shell.state(), ShellState::ResultReady);
        assert_eq!(
            shell.view(),
            View::Result {
                html: "<p>done</p>".into()
            }
        );
    }

    #[test]
    fn failure_replaces_previous_result() {
        let mut shell = AnalyzerShell::new();
        shell.select_file(pdf("q1.pdf"));
        shell.set_api_key("sk-test");

        shell.begin_analysis().unwrap();
        shell.finish_analysis(AnalysisResult::success("<p>first</p>"));
        shell.begin_analysis().unwrap();
        shell.finish_analysis(AnalysisResult::failure("Incorrect API key provided"));

        assert_eq!(shell.state(), ShellState::ErrorShown);
        assert_eq!(shell.result(), None);
        assert_eq!(
            shell.view(),
            View::Error {
                message: "Incorrect API key provided".into()
            }
        );
    }

    #[test]
    fn stray_finish_is_ignored() {
        let mut shell = AnalyzerShell::new();
        shell.finish_analysis(AnalysisResult::success("<p>late</p>"));
        assert_eq!(shell.view(), View::Idle);
    }

    #[tokio::test]
    async fn unreadable_pdf_lands_in_error_state() {
        let (dispatcher, backend) = counting_dispatcher();
        let mut shell = AnalyzerShell::new();
        // Declared as PDF but the payload is not one.
        shell.select_file(SelectedFile::new("fake.pdf", PDF_MIME, b"hello".to_vec()));
        shell.set_api_key("sk-test");

        let view = shell.analyze(&dispatcher).await;
        assert!(matches!(view, View::Error { ref message } if message.contains("not a valid PDF")));
        assert_eq!(shell.state(), ShellState::ErrorShown);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debug_hides_key() {
        let mut shell = AnalyzerShell::new();
        shell.set_api_key("sk-very-secret");
        assert!(!format!("{shell:?}").contains("sk-very-secret"));
    }
}
