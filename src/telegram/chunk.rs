//! Message chunking for Telegram.
//!
//! Telegram limits text messages to 4096 UTF-16 code units, so an emoji
//! outside the Basic Multilingual Plane counts twice. Long replies are split
//! at paragraph or line boundaries when one exists inside the window, and
//! hard-cut at a character boundary otherwise.

/// Telegram hard limit for text messages, in UTF-16 code units.
pub const TELEGRAM_MAX_LEN: usize = 4096;

/// Length of `text` as Telegram measures it.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split `text` into chunks of at most `max_len` UTF-16 code units.
///
/// Newlines at a split point are dropped rather than starting the next chunk.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    let limit = max_len.max(1);

    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let Some(window_end) = window_end(remaining, limit) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..window_end];
        let split_at = find_split_point(window);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches('\n');
    }

    chunks
}

/// Byte offset of the first character that would push the window past
/// `limit` code units, or `None` when all of `text` fits.
fn window_end(text: &str, limit: usize) -> Option<usize> {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > limit {
            // Always make progress, even when one character exceeds the limit
            let first_len = text.chars().next().map_or(0, char::len_utf8);
            return Some(idx.max(first_len));
        }
    }
    None
}

/// Best byte offset to cut `window` at.
fn find_split_point(window: &str) -> usize {
    // Paragraph boundary
    if let Some(pos) = window.rfind("\n\n")
        && pos > 0
    {
        return pos;
    }

    // Line boundary
    if let Some(pos) = window.rfind('\n')
        && pos > 0
    {
        return pos;
    }

    window.len()
}
