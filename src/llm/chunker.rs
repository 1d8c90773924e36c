// src/llm/chunker.rs
//! Word re-chunking of upstream deltas.
//!
//! The LLM streams arbitrarily sized fragments. Clients get whole words or
//! clauses instead: text is buffered until a boundary character arrives, then
//! the trimmed buffer goes out as one chunk. The boundary character is appended
//! before the split, so trailing punctuation stays attached to its word. A
//! buffer holding nothing but boundary characters is dropped.

/// Characters that terminate a word chunk
pub const BOUNDARY_CHARS: [char; 15] = [
    ' ', '\t', '\n', '\r', ',', '.', '!', '?', '，', '。', '！', '？', '；', '：', '、',
];

pub fn is_boundary(c: char) -> bool {
    BOUNDARY_CHARS.contains(&c)
}

/// Trimmed chunk, or `None` when only boundary characters remain
fn word_from(buffer: &str) -> Option<String> {
    let word = buffer.trim();
    if word.chars().all(is_boundary) {
        None
    } else {
        Some(word.to_string())
    }
}

/// Per-stream accumulator. Never shared between sessions.
#[derive(Debug, Default)]
pub struct WordChunker {
    buffer: String,
}

impl WordChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment; returns the chunks it completed, in order
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        let mut words = Vec::new();
        for ch in fragment.chars() {
            self.buffer.push(ch);
            if is_boundary(ch) {
                words.extend(word_from(&self.buffer));
                self.buffer.clear();
            }
        }
        words
    }

    /// Emit whatever is left. Empties the accumulator, so a second call
    /// without new fragments returns `None`.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        word_from(&rest)
    }

    /// Text received since the last boundary
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x2E80..=0x9FFF | 0xAC00..=0xD7AF | 0xF900..=0xFAFF | 0xFE30..=0xFE4F | 0xFF00..=0xFFEF
            | 0x20000..=0x2FA1F
    )
}

/// Reassemble chunks into display text for non-streaming replies.
/// Latin words get a single space between them; CJK text is joined directly.
pub fn join_words<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for word in words {
        let word = word.as_ref();
        if let (Some(prev), Some(next)) = (out.chars().last(), word.chars().next()) {
            if !is_cjk(prev) && !is_cjk(next) {
                out.push(' ');
            }
        }
        out.push_str(word);
    }
    out
}
