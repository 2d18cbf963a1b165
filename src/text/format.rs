//! Heuristic content-type sniffing for automatic strategy selection.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DOCTYPE: Regex = Regex::new(r"(?i)<!doctype html>").unwrap();
    static ref HTML_TAG: Regex = Regex::new(
        r"(?i)<(html|body|head|div|span|p|h[1-6]|section|article|main|nav|table|ul|ol|li)\b[^>]*>"
    )
    .unwrap();
    static ref LATEX: Regex =
        Regex::new(r"\\(section|subsection|subsubsection|begin\{document\})").unwrap();
    static ref PIPE_ROW: Regex = Regex::new(r"\n\|.+\|\n").unwrap();
    static ref PIPE_RULE: Regex = Regex::new(r"\|\s*-{2,}\s*\|").unwrap();
    static ref MARKDOWN_SIGNALS: Vec<Regex> = vec![
        Regex::new(r"(?m)^#{1,6}\s+").unwrap(),
        Regex::new(r"(?m)^(\*|-|\+|\d+\.)\s+").unwrap(),
        Regex::new(r"(?m)^>\s").unwrap(),
        Regex::new(r"(?s)```.*?```").unwrap(),
        Regex::new(r"\[.+?\]\(.+?\)").unwrap(),
    ];
}

/// Coarse content type of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedFormat {
    Markdown,
    Html,
    Json,
    Latex,
    Code,
    Table,
    Text,
}

impl DetectedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedFormat::Markdown => "markdown",
            DetectedFormat::Html => "html",
            DetectedFormat::Json => "json",
            DetectedFormat::Latex => "latex",
            DetectedFormat::Code => "code",
            DetectedFormat::Table => "table",
            DetectedFormat::Text => "text",
        }
    }
}

impl fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the format of a text.
///
/// Checks run in order: JSON, HTML, LaTeX, fenced code, pipe table, markdown;
/// anything else is plain text.
pub fn detect_format(input: &str) -> DetectedFormat {
    let text = input.trim();
    if text.is_empty() {
        return DetectedFormat::Text;
    }

    let wrapped = (text.starts_with('{') && text.ends_with('}'))
        || (text.starts_with('[') && text.ends_with(']'));
    if wrapped && serde_json::from_str::<serde_json::Value>(text).is_ok() {
        return DetectedFormat::Json;
    }

    if DOCTYPE.is_match(text) || HTML_TAG.is_match(text) {
        return DetectedFormat::Html;
    }

    if LATEX.is_match(text) {
        return DetectedFormat::Latex;
    }

    if text.contains("```") {
        return DetectedFormat::Code;
    }

    if PIPE_ROW.is_match(text) && PIPE_RULE.is_match(text) {
        return DetectedFormat::Table;
    }

    if MARKDOWN_SIGNALS.iter().any(|re| re.is_match(text)) {
        return DetectedFormat::Markdown;
    }

    DetectedFormat::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_format() {
        assert_eq!(detect_format(r#"{"a": 1}"#), DetectedFormat::Json);
        assert_eq!(detect_format("[1, 2, 3]"), DetectedFormat::Json);
        assert_eq!(detect_format("<div>Hello</div>"), DetectedFormat::Html);
        assert_eq!(detect_format("<!DOCTYPE html><title>x</title>"), DetectedFormat::Html);
        assert_eq!(detect_format("\\section{Intro} text"), DetectedFormat::Latex);
        assert_eq!(detect_format("See:\n```rust\nfn a() {}\n```"), DetectedFormat::Code);
        assert_eq!(
            detect_format("Intro\n| a | b |\n| --- | --- |\n| 1 | 2 |\n"),
            DetectedFormat::Table
        );
        assert_eq!(detect_format("# Title\n\nBody"), DetectedFormat::Markdown);
        assert_eq!(detect_format("Just some prose."), DetectedFormat::Text);
        assert_eq!(detect_format("   "), DetectedFormat::Text);
    }

    #[test]
    fn test_invalid_json_falls_through() {
        assert_eq!(detect_format("{not json}"), DetectedFormat::Text);
    }

    #[test]
    fn test_preformatted_tag_is_not_paragraph() {
        assert_eq!(detect_format("<pre>x</pre>"), DetectedFormat::Text);
    }
}
