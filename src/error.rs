//! Error types for the edgequake-statement-analyzer library.
//!
//! Two distinct error types reflect two distinct failure sources:
//!
//! * [`AnalyzerError`]: the statement could not be read or the analyzer is
//!   misconfigured (bad input file, corrupt PDF, wrong password, invalid
//!   config). Returned as `Err(AnalyzerError)` from extraction and input
//!   helpers.
//!
//! * [`ProviderError`]: a single LLM completion failed (bad key, quota,
//!   network, unavailable provider). Never escapes the dispatcher: it is
//!   folded into [`crate::output::AnalysisResult::Failure`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before any provider is contacted.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The payload was read, but is not a PDF.
    #[error("Document is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// pdfium returned an error while reading the text of one page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// True when the error means the bytes are not a readable document.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::NotAPdf { .. }
                | AnalyzerError::CorruptPdf { .. }
                | AnalyzerError::PasswordRequired
                | AnalyzerError::WrongPassword
                | AnalyzerError::TextExtractionFailed { .. }
        )
    }
}

/// A failed completion call against one provider.
///
/// The `Display` text of each variant is what the user ends up seeing, so
/// keep the wording short and free of internal detail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider is listed in the catalog but has no client yet.
    #[error("{provider} integration is not yet available")]
    Unavailable { provider: String },

    /// Provider identifier is not one we know about.
    #[error("Unsupported AI provider.")]
    Unsupported,

    /// HTTP 401/403: retrying will not help.
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// HTTP 429: quota exhausted or rate-limited.
    #[error("Rate limit exceeded for provider '{provider}': {detail}")]
    RateLimitExceeded { provider: String, detail: String },

    /// The request did not complete within the configured timeout.
    #[error("Request to '{provider}' timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// Connection-level failure (DNS, TLS, reset).
    #[error("Network error contacting '{provider}': {detail}")]
    Network { provider: String, detail: String },

    /// The request could not be built locally (e.g. a key with control
    /// characters). Never sent, so never retried.
    #[error("Invalid request for '{provider}': {detail}")]
    InvalidRequest { provider: String, detail: String },

    /// Any other non-success HTTP status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The body could not be decoded into the expected shape.
    #[error("Invalid response from '{provider}': {detail}")]
    InvalidResponse { provider: String, detail: String },
}

impl ProviderError {
    /// Whether a single retry has a reasonable chance of succeeding.
    ///
    /// Only timeouts, connection failures and 5xx answers qualify.
    /// Authentication and quota errors are permanent for this request.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout { .. } | ProviderError::Network { .. } => true,
            ProviderError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
