//! Sentence and paragraph segmentation with byte offsets.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::tokenizer::Tokenizer;

lazy_static! {
    static ref SENTENCE: Regex = Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").unwrap();
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n{2,}").unwrap();
    static ref ZERO_WIDTH: Regex = Regex::new("[\u{200B}\u{200C}\u{200D}\u{FEFF}]").unwrap();
    static ref TRAILING_SPACE: Regex = Regex::new(r"[ \t]+\n").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// A trimmed span of text with its token count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub tokens: usize,
}

impl Segment {
    fn trimmed(text: &str, start: usize, end: usize, tokenizer: &dyn Tokenizer) -> Option<Self> {
        let raw = &text[start..end];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lead = raw.len() - raw.trim_start().len();
        let start = start + lead;
        Some(Self {
            text: trimmed.to_string(),
            start,
            end: start + trimmed.len(),
            tokens: tokenizer.count_tokens(trimmed),
        })
    }
}

/// Clean text before structural parsing.
///
/// Removes zero-width characters, maps NBSP to a space, converts CRLF/CR to LF,
/// strips trailing spaces on each line and collapses runs of blank lines to
/// one. Leading indentation is kept so fenced code survives.
pub fn normalize_text(text: &str) -> String {
    let text = ZERO_WIDTH.replace_all(text, "");
    let text = text
        .replace('\u{00A0}', " ")
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Split text on terminal punctuation (`.`, `!`, `?`).
///
/// Text without any boundary comes back as one sentence; whitespace-only
/// input yields nothing.
pub fn split_into_sentences(text: &str, tokenizer: &dyn Tokenizer) -> Vec<Segment> {
    let mut segments: Vec<Segment> = SENTENCE
        .find_iter(text)
        .filter_map(|m| Segment::trimmed(text, m.start(), m.end(), tokenizer))
        .collect();

    if segments.is_empty() {
        segments.extend(Segment::trimmed(text, 0, text.len(), tokenizer));
    }
    segments
}

/// Split text on blank lines.
pub fn split_into_paragraphs(text: &str, tokenizer: &dyn Tokenizer) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for brk in PARAGRAPH_BREAK.find_iter(text) {
        segments.extend(Segment::trimmed(text, cursor, brk.start(), tokenizer));
        cursor = brk.end();
    }
    segments.extend(Segment::trimmed(text, cursor, text.len(), tokenizer));
    segments
}
