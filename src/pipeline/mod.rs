//! Pipeline stages for statement analysis.
//!
//! Each submodule implements one step, testable on its own.
//!
//! ## Data flow
//!
//! ```text
//! input ──▶ extract ──▶ llm (openai | gemini) ──▶ format
//! (file)    (pdfium)    (one completion)          (HTML)
//! ```
//!
//! 1. [`input`]  : read the chosen file and its declared type
//! 2. [`extract`]: pull page text via pdfium inside `spawn_blocking`
//! 3. [`llm`]    : the completion seam: backend selection and transient
//!    retry; [`openai`] and [`gemini`] are the built-in backends
//! 4. [`format`] : strip boilerplate and render sanitized HTML

pub mod extract;
pub mod format;
pub mod gemini;
pub mod input;
pub mod llm;
pub mod openai;
