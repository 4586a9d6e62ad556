//! Response formatting: model answer → displayable HTML.
//!
//! Chat models like to open with filler ("Here's an analysis of…",
//! "Based on the balance sheet…"). That one line is dropped; the rest of the
//! answer is rendered as standard CommonMark with GFM tables and
//! strikethrough, without any rewriting of its Markdown.
//!
//! ## Untrusted output
//!
//! Whatever the model returns is treated as untrusted input. Conversion is
//! an allow-list: only tags produced by the Markdown renderer reach the
//! output. Raw HTML in the answer is escaped and shown as text, and links or
//! images pointing at anything but `http`, `https`, `mailto` or a relative
//! URL are rewritten to `#`.
//!
//! ## Rule order
//!
//! 1. Strip one leading preamble line (first matching pattern wins)
//! 2. Trim surrounding whitespace
//! 3. Render (HTML or plain text)

use crate::config::RenderMode;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use regex::Regex;

/// Format a raw model answer with the default (HTML) render mode.
///
/// Never panics, for any input including the empty string.
pub fn format_response(raw: &str) -> String {
    format_response_with(raw, RenderMode::Html)
}

/// Format a raw model answer with an explicit render mode.
pub fn format_response_with(raw: &str, mode: RenderMode) -> String {
    let text = clean_answer(raw);
    match mode {
        RenderMode::Html => markdown_to_safe_html(&text),
        RenderMode::PlainText => text,
    }
}

/// Apply rules 1 and 2 without rendering.
pub fn clean_answer(raw: &str) -> String {
    strip_preamble(raw).trim().to_string()
}

// ── Rule 1: Strip a leading preamble line ────────────────────────────────────

static PREAMBLES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)^Here'?s? (?:is )?(?:an? )?(?:analysis|answer|response|summary).*?\n")
            .unwrap(),
        Regex::new(r"(?i)^Based on.*?\n").unwrap(),
        Regex::new(r"(?i)^After analyzing.*?\n").unwrap(),
    ]
});

/// Remove at most one boilerplate opening line.
///
/// Patterns are tried in priority order and only the first match is
/// applied; the remainder is never re-scanned. A preamble with no trailing
/// newline is left alone.
fn strip_preamble(input: &str) -> &str {
    PREAMBLES
        .iter()
        .find_map(|re| re.find(input))
        .map(|m| &input[m.end()..])
        .unwrap_or(input)
}

// ── Rule 3: Markdown → sanitized HTML ───────────────────────────────────────

fn markdown_to_safe_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(sanitize_event);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Replace any event that could smuggle markup or script into the page.
fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        // Raw HTML is rendered as escaped text.
        Event::Html(raw) => Event::Text(raw),
        Event::Start(Tag::Link(kind, dest, title)) => {
            Event::Start(Tag::Link(kind, safe_url(dest), title))
        }
        Event::End(Tag::Link(kind, dest, title)) => {
            Event::End(Tag::Link(kind, safe_url(dest), title))
        }
        Event::Start(Tag::Image(kind, dest, title)) => {
            Event::Start(Tag::Image(kind, safe_url(dest), title))
        }
        Event::End(Tag::Image(kind, dest, title)) => {
            Event::End(Tag::Image(kind, safe_url(dest), title))
        }
        other => other,
    }
}

/// Pass allow-listed URLs through; everything else becomes `#`.
fn safe_url(dest: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&dest) {
        dest
    } else {
        CowStr::Borrowed("#")
    }
}

fn is_safe_url(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match cleaned.find(':') {
        // No scheme: relative path or fragment.
        None => true,
        Some(colon) => {
            // A ':' after a '/', '?' or '#' is part of the path, not a scheme.
            if cleaned[..colon].contains(['/', '?', '#']) {
                return true;
            }
            matches!(&cleaned[..colon], "http" | "https" | "mailto")
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
