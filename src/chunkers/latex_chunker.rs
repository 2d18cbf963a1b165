//! LaTeX chunker splitting on sectioning commands.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::base::Chunker;
use super::RecursiveChunker;
use crate::text::{default_tokenizer, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

lazy_static! {
    static ref SECTION_COMMAND: Regex =
        Regex::new(r"\\(section|subsection|subsubsection)\*?\{([^}]*)\}").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
struct LatexSection<'a> {
    heading: Option<String>,
    kind: &'static str,
    body: &'a str,
    start: usize,
}

fn section_kind(command: &str) -> &'static str {
    match command {
        "section" => "section",
        "subsection" => "subsection",
        "subsubsection" => "subsubsection",
        _ => "none",
    }
}

/// Split text into bodies attributed to the most recent sectioning command.
///
/// Text before the first command has no heading and kind `none`.
fn split_latex(text: &str) -> Vec<LatexSection<'_>> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut kind = "none";
    let mut last = 0;

    let mut push = |heading: &Option<String>, kind: &'static str, from: usize, to: usize| {
        let raw = &text[from..to];
        let body = raw.trim();
        if !body.is_empty() {
            sections.push(LatexSection {
                heading: heading.clone(),
                kind,
                body,
                start: from + (raw.len() - raw.trim_start().len()),
            });
        }
    };

    for caps in SECTION_COMMAND.captures_iter(text) {
        let Some(command) = caps.get(0) else {
            continue;
        };
        push(&heading, kind, last, command.start());
        heading = Some(caps[2].trim().to_string());
        kind = section_kind(&caps[1]);
        last = command.end();
    }
    push(&heading, kind, last, text.len());

    sections
}

/// LaTeX chunker.
///
/// Each section body is chunked recursively and tagged with `heading` (null
/// before the first command) and `sectionType`. Offsets are translated into
/// the input text.
pub struct LatexChunker {
    tokenizer: Arc<dyn Tokenizer>,
    recursive_chunker: RecursiveChunker,
}

impl LatexChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            recursive_chunker: RecursiveChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }
}

impl Default for LatexChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for LatexChunker {
    fn name(&self) -> &'static str {
        "latex"
    }

    fn description(&self) -> &'static str {
        "Splits LaTeX on section commands and chunks each section recursively"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("latex");
        let opts = options.delegate(max_tokens, &tokenizer, format!("{}-section", label));

        let mut chunks = Vec::new();
        for (idx, section) in split_latex(text).into_iter().enumerate() {
            let path: Vec<String> = section.heading.iter().cloned().collect();
            let heading = section.heading.clone().map_or(Value::Null, Value::from);

            for (cidx, chunk) in self.recursive_chunker.chunk(section.body, &opts).into_iter().enumerate() {
                let metadata = MetadataBuilder::new("latex", "latex")
                    .path(path.clone())
                    .base(options)
                    .extras(chunk.metadata.without_origin())
                    .extra("heading", heading.clone())
                    .extra("sectionType", section.kind)
                    .build();
                chunks.push(Chunk {
                    id: format!("{}-{}-{}", label, idx, cidx),
                    label: Some(label.clone()),
                    metadata,
                    ..chunk.shifted(section.start)
                });
            }
        }
        chunks
    }
}
