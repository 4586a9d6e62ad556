//! Text extraction: PDF bytes → the statement's text, via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. The whole
//! open-walk-collect sequence runs on the blocking pool so the runtime's
//! worker threads never stall on a large statement.
//!
//! ## Reading order
//!
//! Pages are visited in ascending order and each page's text segments are
//! taken in the order pdfium reports them. That is natural reading order for
//! single-column statements; multi-column layouts and some tables come out
//! interleaved. This is a known limitation.

use crate::config::AnalysisConfig;
use crate::error::AnalyzerError;
use crate::pipeline::input::check_pdf_magic;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Text pulled from a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

/// Extract the full text of a PDF held in memory.
///
/// # Errors
/// `NotAPdf`, `CorruptPdf`, `PasswordRequired`, `WrongPassword` or
/// `TextExtractionFailed` when the bytes are not a readable document;
/// `PdfiumBindingFailed` when no pdfium library could be loaded.
pub async fn extract_text(
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<ExtractedText, AnalyzerError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(bytes.len());
    }

    let owned = bytes.to_vec();
    let password = config.password.clone();

    let extracted = tokio::task::spawn_blocking(move || {
        extract_text_blocking(&owned, password.as_deref())
    })
    .await
    .map_err(|e| AnalyzerError::Internal(format!("Extraction task panicked: {}", e)))??;

    info!(
        "Extracted {} chars from {} pages",
        extracted.text.chars().count(),
        extracted.page_count
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(extracted.page_count, extracted.text.chars().count());
    }

    Ok(extracted)
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(
    bytes: &[u8],
    password: Option<&str>,
) -> Result<ExtractedText, AnalyzerError> {
    check_pdf_magic(bytes)?;

    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| AnalyzerError::PdfiumBindingFailed(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| load_error(e, password.is_some()))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    debug!("PDF loaded: {} pages", page_count);

    let mut per_page: Vec<Vec<String>> = Vec::with_capacity(page_count);
    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| AnalyzerError::TextExtractionFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        })?;
        let fragments: Vec<String> = text.segments().iter().map(|s| s.text()).collect();
        debug!("Page {}: {} text fragments", idx + 1, fragments.len());
        per_page.push(fragments);
    }

    Ok(ExtractedText {
        text: join_page_fragments(per_page),
        page_count,
    })
}

/// Map a pdfium load failure onto the document-error taxonomy.
fn load_error(err: PdfiumError, password_given: bool) -> AnalyzerError {
    let detail = format!("{:?}", err);
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            AnalyzerError::WrongPassword
        } else {
            AnalyzerError::PasswordRequired
        }
    } else {
        AnalyzerError::CorruptPdf { detail }
    }
}

/// Join per-page text fragments into one string.
///
/// Fragments are separated by a single space, within a page and across page
/// boundaries alike; no page marker is inserted. Pages without fragments
/// contribute nothing.
pub fn join_page_fragments<P, F>(pages: P) -> String
where
    P: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: AsRef<str>,
{
    let mut out = String::new();
    let mut first = true;
    for fragment in pages.into_iter().flatten() {
        if !first {
            out.push(' ');
        }
        out.push_str(fragment.as_ref());
        first = false;
    }
    out
}
