//! Integration tests for edgequake-statement-analyzer.
//!
//! Provider traffic goes to a local `wiremock` server, so these run offline.
//! The one test that needs a real PDF and the pdfium library is gated behind
//! `STATEMENT_ANALYZER_E2E_PDF`:
//!
//!   STATEMENT_ANALYZER_E2E_PDF=./balance-sheet.pdf cargo test --test analyzer -- --nocapture

use edgequake_statement_analyzer::pipeline::input::load_file;
use edgequake_statement_analyzer::{
    extract_text, AnalysisConfig, AnalysisRequest, AnalysisResult, AnalyzerShell, Dispatcher,
    ProviderId, View,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn dispatcher_for(server: &MockServer, timeout_secs: u64, max_retries: u32) -> Dispatcher {
    let config = AnalysisConfig::builder()
        .openai_base_url(server.uri())
        .gemini_base_url(server.uri())
        .request_timeout_secs(timeout_secs)
        .max_retries(max_retries)
        .retry_backoff_ms(1)
        .build()
        .expect("valid config");
    Dispatcher::new(config)
}

fn request(provider: ProviderId, model: &str) -> AnalysisRequest {
    AnalysisRequest {
        provider,
        model_id: model.into(),
        api_key: "test-key".into(),
        document_text: "Total current assets 1,200 Total current liabilities 600".into(),
        prompts: vec![
            "Calculate all financial ratios that are possible from the provided data. Present the results as a table."
                .into(),
        ],
    }
}

fn openai_answer(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    }))
}

// ── Dispatcher against a mocked provider ─────────────────────────────────────

#[tokio::test]
async fn openai_answer_is_cleaned_and_sanitized() {
    let server = MockServer::start().await;
    let answer = "Here's an analysis of the balance sheet:\n\
                  | Ratio | Value |\n\
                  | --- | --- |\n\
                  | Current ratio | 2.0 |\n\
                  \n\
                  <script>alert('x')</script>\n\
                  \n\
                  [details](javascript:alert(1))";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_answer(answer))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server, 5, 0)
        .analyze(&request(ProviderId::OpenAi, "gpt-4o-mini"))
        .await;

    let html = result.html_content().expect("success");
    assert!(!html.contains("Here's an analysis"), "preamble kept: {html}");
    assert!(html.contains("<table>"), "table missing: {html}");
    assert!(html.contains("<td>2.0</td>"), "cell missing: {html}");
    assert!(!html.contains("<script>"), "raw script leaked: {html}");
    assert!(!html.contains("javascript:"), "unsafe link leaked: {html}");
}

#[tokio::test]
async fn gemini_server_error_is_retried_once() {
    let server = MockServer::start().await;
    let route = "/models/gemini-1.5-pro:generateContent";
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "**Current ratio**: 2.0"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server, 5, 1)
        .analyze(&request(ProviderId::Gemini, "gemini-1.5-pro"))
        .await;
    assert_eq!(
        result,
        AnalysisResult::success("<p><strong>Current ratio</strong>: 2.0</p>\n")
    );
}

#[tokio::test]
async fn rejected_key_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: test-key.", "code": "invalid_api_key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server, 5, 3)
        .analyze(&request(ProviderId::OpenAi, "o1-mini"))
        .await;
    let message = result.error_message().expect("failure");
    assert!(message.contains("Incorrect API key provided"), "got: {message}");
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(openai_answer("too late").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let result = dispatcher_for(&server, 1, 0)
        .analyze(&request(ProviderId::OpenAi, "gpt-4o-mini"))
        .await;
    let message = result.error_message().expect("failure");
    assert!(message.contains("timed out"), "got: {message}");
}

#[tokio::test]
async fn unintegrated_and_unknown_providers_make_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(openai_answer("unreachable"))
        .expect(0)
        .mount(&server)
        .await;
    let dispatcher = dispatcher_for(&server, 5, 1);

    let xai = dispatcher.analyze(&request(ProviderId::Xai, "xai-1.0")).await;
    assert_eq!(
        xai.error_message(),
        Some("xai integration is not yet available")
    );

    let unknown = dispatcher
        .analyze_named("mistral", "large", "k", "text", &["q".to_string()])
        .await;
    assert_eq!(unknown.error_message(), Some("Unsupported AI provider."));
}

// ── Shell ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shell_without_key_never_contacts_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(openai_answer("unreachable"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("statement.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();

    let mut shell = AnalyzerShell::new();
    shell.select_file(load_file(&pdf).await.unwrap());
    let view = shell.analyze(&dispatcher_for(&server, 5, 1)).await;
    assert_eq!(
        view,
        View::Error {
            message: "Please select a file and provide an API key".into()
        }
    );
}

// ── Live extraction (opt-in) ─────────────────────────────────────────────────

#[tokio::test]
async fn live_extraction_of_a_real_statement() {
    let Ok(pdf) = std::env::var("STATEMENT_ANALYZER_E2E_PDF") else {
        println!("SKIP: set STATEMENT_ANALYZER_E2E_PDF=<path> to run");
        return;
    };
    let file = load_file(&pdf).await.expect("readable PDF");
    let extracted = extract_text(&file.bytes, &AnalysisConfig::default())
        .await
        .expect("extraction");
    println!(
        "{} pages, {} chars",
        extracted.page_count,
        extracted.text.chars().count()
    );
    assert!(extracted.page_count > 0);
    assert!(!extracted.text.trim().is_empty());
}
