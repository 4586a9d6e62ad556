//! Input loading: turn a user-chosen path into a [`SelectedFile`].
//!
//! The file's *declared* type comes from its extension, the way a browser
//! file picker reports it; content is not sniffed here. The `%PDF` magic
//! check happens later, at extraction time, so a mislabeled file surfaces as
//! a document error rather than a selection error.

use crate::error::AnalyzerError;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// MIME type a selected file must declare to be accepted.
pub const PDF_MIME: &str = "application/pdf";

/// A file handed to the analyzer by the host environment.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Display name (no directory).
    pub name: String,
    /// Declared MIME type, e.g. `application/pdf`.
    pub declared_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Whether the declared type is PDF.
    pub fn is_pdf(&self) -> bool {
        self.declared_type.eq_ignore_ascii_case(PDF_MIME)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Guess a declared MIME type from a file extension.
pub fn declared_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Read a local file into a [`SelectedFile`].
pub async fn load_file(path: impl AsRef<Path>) -> Result<SelectedFile, AnalyzerError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AnalyzerError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AnalyzerError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let declared_type = declared_type_for(path);
    debug!("Loaded {} ({} bytes, {})", name, bytes.len(), declared_type);

    Ok(SelectedFile::new(name, declared_type, bytes))
}

/// Verify the `%PDF` magic bytes.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), AnalyzerError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(AnalyzerError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}
