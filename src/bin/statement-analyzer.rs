//! CLI binary for edgequake-statement-analyzer.
//!
//! A thin shim over the library crate: flags map to `AnalysisConfig` and
//! the `AnalyzerShell` selections, the result goes to stdout or a file.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_statement_analyzer::pipeline::input::load_file;
use edgequake_statement_analyzer::{
    list_models, write_report, AnalysisConfig, AnalysisProgressCallback, AnalysisResult,
    AnalyzerShell, Dispatcher, ProgressCallback, ProviderId, RenderMode, SelectedFile, View,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a single spinner plus one log line per step.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening statement…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, byte_len: usize) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(format!("{} KiB of PDF", byte_len.div_ceil(1024)));
    }

    fn on_extraction_complete(&self, pages: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Extracted {} from {} {}",
            green("✓"),
            dim(&format!("{chars} chars")),
            pages,
            if pages == 1 { "page" } else { "pages" }
        ));
    }

    fn on_request_start(&self, provider: &str, model: &str, attempt: u32) {
        self.bar.set_prefix("Analyzing");
        if attempt == 0 {
            self.bar.set_message(format!("{provider}/{model}"));
        } else {
            self.bar
                .set_message(format!("{provider}/{model} (retry {attempt})"));
        }
    }

    fn on_retry(&self, provider: &str, attempt: u32, error: &str) {
        // Truncate very long provider messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {} attempt {} failed: {}",
            cyan("⚠"),
            provider,
            attempt + 1,
            red(&msg)
        ));
    }

    fn on_analysis_complete(&self, success: bool) {
        self.bar.finish_and_clear();
        let secs = self.started.elapsed().as_secs_f64();
        if success {
            eprintln!("{} Analysis complete  {}", green("✔"), dim(&format!("{secs:.1}s")));
        } else {
            eprintln!("{} Analysis failed  {}", red("✘"), dim(&format!("{secs:.1}s")));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze with the default model (openai / o1-mini), HTML to stdout
  statement-analyzer balance-sheet.pdf --api-key sk-...

  # Gemini, written to a file
  statement-analyzer q3.pdf --provider gemini --model gemini-1.5-pro -o q3.html

  # Plain text instead of HTML
  statement-analyzer q3.pdf --plain

  # Structured result (success/failure) as JSON
  statement-analyzer q3.pdf --json

  # Show the provider/model catalog
  statement-analyzer --list-models

PROVIDERS:
  openai     gpt-4o-mini, o1-mini (default), o3-mini, gpt-4-turbo-preview, gpt-3.5-turbo
  gemini     gemini-1.5-pro, gemini-pro
  xai        xai-1.0          (listed, integration not yet available)
  deepseek   deepseek-coder   (listed, integration not yet available)

ENVIRONMENT VARIABLES:
  STATEMENT_ANALYZER_API_KEY    API key for the selected provider
  STATEMENT_ANALYZER_PROVIDER   Provider (openai, gemini, xai, deepseek)
  STATEMENT_ANALYZER_MODEL      Model ID
  PDFIUM_LIB_PATH               Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR         Override the default pdfium cache directory

The API key is used for this run only and is never written anywhere.
"#;

/// Analyze PDF balance sheets with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "statement-analyzer",
    version,
    about = "Analyze PDF balance sheets with an LLM and print the answer as HTML",
    long_about = "Extract the text of a PDF financial statement, ask the selected LLM provider \
to compute every ratio the statement supports, and print the answer as a sanitized HTML \
fragment. Supports OpenAI and Google Gemini; xAI and DeepSeek are listed but not yet integrated.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF statement to analyze.
    #[arg(required_unless_present = "list_models")]
    input: Option<PathBuf>,

    /// Write the result to this file instead of stdout.
    #[arg(short, long, env = "STATEMENT_ANALYZER_OUTPUT")]
    output: Option<PathBuf>,

    /// Provider: openai, gemini, xai, deepseek.
    #[arg(long, env = "STATEMENT_ANALYZER_PROVIDER", default_value = "openai")]
    provider: String,

    /// Model ID. Default: o1-mini for openai, else the provider's first model.
    #[arg(long, env = "STATEMENT_ANALYZER_MODEL")]
    model: Option<String>,

    /// API key for the selected provider.
    #[arg(long, env = "STATEMENT_ANALYZER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Do not ask for the full ratio table.
    #[arg(long)]
    no_ratios: bool,

    /// PDF user password for encrypted statements.
    #[arg(long, env = "STATEMENT_ANALYZER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Provider request timeout in seconds.
    #[arg(long, env = "STATEMENT_ANALYZER_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Retries on transient provider failures (0–3).
    #[arg(long, env = "STATEMENT_ANALYZER_MAX_RETRIES", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(0..=3))]
    max_retries: u32,

    /// Gemini sampling temperature (0.0–2.0).
    #[arg(long, env = "STATEMENT_ANALYZER_GEMINI_TEMPERATURE", default_value_t = 0.2)]
    gemini_temperature: f32,

    /// OpenAI-compatible API root.
    #[arg(long, env = "STATEMENT_ANALYZER_OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    /// Gemini API root.
    #[arg(long, env = "STATEMENT_ANALYZER_GEMINI_BASE_URL")]
    gemini_base_url: Option<String>,

    /// Print the cleaned answer as plain text instead of HTML.
    #[arg(long)]
    plain: bool,

    /// Print the result (success or failure) as JSON.
    #[arg(long)]
    json: bool,

    /// List providers and models, then exit.
    #[arg(long)]
    list_models: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "STATEMENT_ANALYZER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STATEMENT_ANALYZER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STATEMENT_ANALYZER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are suppressed while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_models {
        return print_catalog(cli.json);
    }

    let input = cli
        .input
        .clone()
        .context("No input PDF given")?;

    let provider: ProviderId = cli
        .provider
        .parse()
        .with_context(|| format!("Cannot use provider '{}'", cli.provider))?;
    let file = load_file(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    // ── Selections ───────────────────────────────────────────────────────
    let mut shell = match configure_shell(&cli, provider, file) {
        Ok(shell) => shell,
        Err(message) => {
            emit(&cli, &AnalysisResult::failure(message)).await?;
            std::process::exit(1);
        }
    };

    // ── Run analysis ─────────────────────────────────────────────────────
    // The engine download and the spinner only start once the shell has
    // accepted the inputs.
    let view = match shell.begin_analysis() {
        Some(job) => {
            ensure_pdfium(show_progress)?;
            let progress_cb: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
            } else {
                None
            };
            let dispatcher = Dispatcher::new(build_config(&cli, progress_cb)?);
            let result = job.run(&dispatcher).await;
            shell.finish_analysis(result);
            shell.view()
        }
        None => shell.view(),
    };
    let result = match view {
        View::Result { html } => AnalysisResult::success(html),
        View::Error { message } => AnalysisResult::failure(message),
        View::Idle | View::Busy => AnalysisResult::failure(""),
    };

    emit(&cli, &result).await?;

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Apply the CLI selections to a fresh shell.
///
/// Fails with the shell's message when the file is rejected.
fn configure_shell(
    cli: &Cli,
    provider: ProviderId,
    file: SelectedFile,
) -> Result<AnalyzerShell, String> {
    let mut shell = AnalyzerShell::new();
    shell.select_file(file);
    if let Some(message) = shell.error() {
        return Err(message.to_string());
    }
    if provider != shell.provider() {
        shell.change_provider(provider);
    }
    if let Some(ref model) = cli.model {
        shell.set_model(model.clone());
    }
    shell.set_api_key(cli.api_key.clone().unwrap_or_default());
    shell.set_run_all_ratios(!cli.no_ratios);
    Ok(shell)
}

/// Make sure the PDFium library is present.
///
/// First run downloads it (~30 MB) into the pdfium-auto cache; later runs
/// only check the path.
fn ensure_pdfium(show_progress: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if !show_progress {
        return tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .map(|_| ())
            .context("Failed to download PDFium engine");
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_and_clear();
    Ok(())
}

/// Print or write the result according to `--json`/`--output`.
async fn emit(cli: &Cli, result: &AnalysisResult) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(result).context("Failed to serialise result")?;
        match cli.output {
            Some(ref path) => write_report(path, &json)
                .await
                .context("Failed to write result")?,
            None => println!("{json}"),
        }
        return Ok(());
    }

    match result {
        AnalysisResult::Success { html_content } => {
            if let Some(ref path) = cli.output {
                write_report(path, html_content)
                    .await
                    .context("Failed to write result")?;
                if !cli.quiet {
                    eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
                }
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(html_content.as_bytes())
                    .context("Failed to write to stdout")?;
                if !html_content.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }
        AnalysisResult::Failure { error_message } => {
            eprintln!("{} {}", red("Error:"), error_message);
        }
    }
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .request_timeout_secs(cli.timeout)
        .max_retries(cli.max_retries)
        .gemini_temperature(cli.gemini_temperature)
        .render_mode(if cli.plain {
            RenderMode::PlainText
        } else {
            RenderMode::Html
        });

    if let Some(ref url) = cli.openai_base_url {
        builder = builder.openai_base_url(url.clone());
    }
    if let Some(ref url) = cli.gemini_base_url {
        builder = builder.gemini_base_url(url.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Column titles for `--list-models`, padded to the row widths.
fn catalog_header() -> String {
    // Pad before colouring; escape codes would count towards the width.
    format!(
        "{} {} {}",
        bold(&format!("{:<10}", "Provider")),
        bold(&format!("{:<22}", "Model")),
        bold("Name")
    )
}

/// `--list-models`: the catalog as a table or JSON.
fn print_catalog(json: bool) -> Result<()> {
    if json {
        let json =
            serde_json::to_string_pretty(list_models()).context("Failed to serialise catalog")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", catalog_header());
    for m in list_models() {
        let note = if edgequake_statement_analyzer::pipeline::llm::is_integrated(m.provider) {
            String::new()
        } else {
            dim("  (not yet available)")
        };
        println!("{:<10} {:<22} {}{}", m.provider.as_str(), m.id, m.display_name, note);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["statement-analyzer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn non_pdf_input_is_rejected_before_analysis() {
        let cli = cli(&["notes.txt", "--api-key", "sk-test"]);
        let file = SelectedFile::new("notes.txt", "text/plain", b"Assets 100".to_vec());
        let err = configure_shell(&cli, ProviderId::OpenAi, file).err();
        assert_eq!(err.as_deref(), Some("Please select a PDF file"));
    }

    #[test]
    fn selections_are_applied() {
        let cli = cli(&["q3.pdf", "--api-key", "sk-test", "--model", "gemini-pro", "--no-ratios"]);
        let file = SelectedFile::new("q3.pdf", "application/pdf", b"%PDF-1.4".to_vec());
        let shell = configure_shell(&cli, ProviderId::Gemini, file).unwrap();
        assert_eq!(shell.provider(), ProviderId::Gemini);
        assert_eq!(shell.model_id(), "gemini-pro");
        assert!(shell.error().is_none());
        assert!(!shell.can_analyze());
    }

    #[test]
    fn catalog_header_lines_up_with_rows() {
        let visible = catalog_header().replace("\x1b[1m", "").replace("\x1b[0m", "");
        assert_eq!(visible, format!("{:<10} {:<22} {}", "Provider", "Model", "Name"));
    }
}
