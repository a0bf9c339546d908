//! Text extraction for uploaded documents.
//!
//! Only text-like files are read. Binary formats (PDF, Office, images sent as
//! files) are refused before anything is downloaded.

use crate::types::{AppError, Result};
use std::path::Path;

const TRUNCATION_MARKER: &str = "\n\n[... truncated ...]";

const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/yaml",
    "application/x-yaml",
    "application/toml",
    "application/csv",
    "application/x-sh",
    "application/sql",
];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "tsv", "json", "xml", "yaml", "yml", "toml", "log", "ini",
    "cfg", "conf", "rs", "py", "js", "ts", "html", "css", "sql", "sh",
];

/// Whether a document can be read as plain text.
pub fn is_text_document(file_name: &str, mime_type: Option<&str>) -> bool {
    if let Some(mime) = mime_type {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("text/") || TEXT_MIME_TYPES.contains(&mime.as_str()) {
            return true;
        }
    }

    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Decode a downloaded document as UTF-8 text, capped at `max_chars`.
pub fn extract_text(bytes: &[u8], file_name: &str, max_chars: usize) -> Result<String> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        AppError::MediaDecode(format!("{} is not valid UTF-8 text", file_name))
    })?;

    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(AppError::MediaDecode(format!(
            "{} contains no text",
            file_name
        )));
    }

    Ok(truncate_text(text, max_chars))
}
