//! Sentence-aware document chunking.
//!
//! ARCHITECTURE
//! ============
//! Text is normalized first (`clean_text`), then split into sentences that
//! keep their terminal punctuation. Sentences are packed greedily into chunks
//! of at most `chunk_size` characters; a single sentence longer than that
//! becomes its own oversized chunk. Each new chunk restarts from the latter
//! half of the previous chunk's sentences, trimmed from the front until the
//! carried-over text fits in `overlap` characters.

use serde::Serialize;

/// Dotted abbreviations that never end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "Dr.", "Prof.", "e.g.", "i.e.", "vs.", "etc.", "Fig.", "fig.", "No.", "vol.", "sec.", "ch.", "pp.", "p.", "ed.",
    "al.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub content: String,
    pub chunk_index: usize,
    /// Byte offset of the first sentence in the cleaned text.
    pub start_position: usize,
    /// Byte offset one past the last sentence in the cleaned text.
    pub end_position: usize,
    pub is_continuation: bool,
    pub is_last_chunk: bool,
}

/// Collapse whitespace runs, drop non-ASCII and control characters, trim.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !c.is_ascii() || c.is_ascii_control() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

fn ends_with_abbreviation(segment: &str) -> bool {
    ABBREVIATIONS.iter().any(|abbr| {
        segment.strip_suffix(abbr).is_some_and(|before| {
            before
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric())
        })
    })
}

/// `(start, end)` byte spans of each sentence in `text`.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if matches!(b, b'.' | b'!' | b'?') {
            let mut next = i + 1;
            while next < bytes.len() && bytes[next].is_ascii_whitespace() {
                next += 1;
            }
            let boundary = next > i + 1
                && next < bytes.len()
                && (bytes[next].is_ascii_uppercase() || bytes[next].is_ascii_digit())
                && !(b == b'.' && ends_with_abbreviation(&text[start..=i]));
            if boundary {
                spans.push((start, i + 1));
                start = next;
                i = next;
                continue;
            }
        }
        i += 1;
    }
    let tail = text[start..].trim_end();
    if !tail.trim_start().is_empty() {
        spans.push((start, start + tail.len()));
    }
    spans
}

/// Split text into sentences, keeping terminal punctuation.
#[must_use]
pub fn split_into_sentences(text: &str) -> Vec<String> {
    sentence_spans(text)
        .into_iter()
        .map(|(s, e)| text[s..e].trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Chunk `text` for embedding. Offsets refer to `clean_text(text)`.
#[must_use]
pub fn chunk_document(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let cleaned = clean_text(text);
    let spans = sentence_spans(&cleaned);
    if spans.is_empty() {
        return Vec::new();
    }

    let len_of = |ids: &[usize]| -> usize {
        let chars: usize = ids.iter().map(|&i| spans[i].1 - spans[i].0).sum();
        chars + ids.len().saturating_sub(1)
    };
    let build = |ids: &[usize], chunk_index: usize| Chunk {
        content: ids
            .iter()
            .map(|&i| &cleaned[spans[i].0..spans[i].1])
            .collect::<Vec<_>>()
            .join(" "),
        chunk_index,
        start_position: spans[ids[0]].0,
        end_position: spans[ids[ids.len() - 1]].1,
        is_continuation: chunk_index > 0,
        is_last_chunk: false,
    };

    let mut chunks = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for (idx, &(s, e)) in spans.iter().enumerate() {
        let sentence_len = e - s;
        let projected = if current.is_empty() { sentence_len } else { len_of(&current) + 1 + sentence_len };
        if projected > chunk_size && !current.is_empty() {
            chunks.push(build(&current, chunks.len()));
            let keep_from = if current.len() == 1 { 1 } else { current.len() / 2 };
            current.drain(..keep_from);
            while !current.is_empty() && len_of(&current) > overlap {
                current.remove(0);
            }
        }
        current.push(idx);
    }
    chunks.push(build(&current, chunks.len()));
    if let Some(last) = chunks.last_mut() {
        last.is_last_chunk = true;
    }
    chunks
}

#[cfg(test)]
#[path = "chunker_test.rs"]
mod tests;
