//! Markdown chunker driven by block structure and the heading stack.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use super::base::Chunker;
use super::{CodeChunker, RecursiveChunker};
use crate::text::{default_tokenizer, normalize_text, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.*)$").unwrap();
    static ref FENCE_OPEN: Regex = Regex::new(r"^```(\w+)?\s*$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"^(-|\*|\d+\.)\s+").unwrap();
    static ref QUOTE_MARK: Regex = Regex::new(r"^>\s?").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading { level: usize, text: String },
    Code { language: Option<String>, content: String },
    List(String),
    Blockquote(String),
    Paragraph(String),
}

impl Block {
    fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Code { .. } => "code",
            Block::List(_) => "list",
            Block::Blockquote(_) => "blockquote",
            Block::Paragraph(_) => "paragraph",
        }
    }
}

#[derive(Debug, Default)]
struct Section {
    heading_path: Vec<String>,
    blocks: Vec<Block>,
}

fn parse_blocks(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut i = 0;

    fn flush(buffer: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        let text = buffer.join(" ");
        let text = text.trim();
        if !text.is_empty() {
            blocks.push(Block::Paragraph(text.to_string()));
        }
        buffer.clear();
    }

    while i < lines.len() {
        let trimmed = lines[i].trim();

        if let Some(caps) = HEADING.captures(trimmed) {
            flush(&mut buffer, &mut blocks);
            blocks.push(Block::Heading {
                level: caps[1].len(),
                text: caps[2].trim().to_string(),
            });
            i += 1;
            continue;
        }

        if let Some(caps) = FENCE_OPEN.captures(trimmed) {
            flush(&mut buffer, &mut blocks);
            let language = caps.get(1).map(|m| m.as_str().to_string());
            let mut content = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                content.push(lines[i]);
                i += 1;
            }
            blocks.push(Block::Code {
                language,
                content: content.join("\n"),
            });
            // Skip the closing fence
            i += 1;
            continue;
        }

        if trimmed.starts_with('>') {
            flush(&mut buffer, &mut blocks);
            let mut quote = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('>') {
                quote.push(QUOTE_MARK.replace(lines[i].trim(), "").into_owned());
                i += 1;
            }
            blocks.push(Block::Blockquote(quote.join(" ").trim().to_string()));
            continue;
        }

        if LIST_ITEM.is_match(trimmed) {
            flush(&mut buffer, &mut blocks);
            let mut items = Vec::new();
            while i < lines.len() && LIST_ITEM.is_match(lines[i].trim()) {
                items.push(LIST_ITEM.replace(lines[i].trim(), "").into_owned());
                i += 1;
            }
            blocks.push(Block::List(items.join(" ").trim().to_string()));
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut buffer, &mut blocks);
        } else {
            buffer.push(trimmed);
        }
        i += 1;
    }
    flush(&mut buffer, &mut blocks);

    blocks
}

/// Group blocks under the heading path active when they appear.
fn to_sections(blocks: Vec<Block>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut current = Section::default();

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                if !current.blocks.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
                while stack.last().is_some_and(|(l, _)| *l >= level) {
                    stack.pop();
                }
                stack.push((level, text));
                current = Section {
                    heading_path: stack.iter().map(|(_, t)| t.clone()).collect(),
                    blocks: Vec::new(),
                };
            }
            other => current.blocks.push(other),
        }
    }

    if !current.blocks.is_empty() {
        sections.push(current);
    }
    sections
}

/// Markdown chunker.
///
/// Headings are not chunked; they set the `headingPath` of every following
/// block. Fenced code goes through [`CodeChunker`] so structural extraction
/// applies; lists, quotes and paragraphs go through [`RecursiveChunker`].
/// Offsets are relative to each block's own content.
pub struct MarkdownChunker {
    tokenizer: Arc<dyn Tokenizer>,
    recursive_chunker: RecursiveChunker,
    code_chunker: CodeChunker,
}

impl MarkdownChunker {
    /// Create a new markdown chunker with the default tokenizer.
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            recursive_chunker: RecursiveChunker::with_tokenizer(Arc::clone(&tokenizer)),
            code_chunker: CodeChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }
}

impl Default for MarkdownChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for MarkdownChunker {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn description(&self) -> &'static str {
        "Chunks markdown by block, tagging each chunk with its heading path"
    }

    fn chunk(&self, markdown: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("markdown");

        let normalized = normalize_text(markdown);
        let sections = to_sections(parse_blocks(&normalized));
        let mut chunks = Vec::new();
        let mut block_index = 0;

        for (section_index, section) in sections.iter().enumerate() {
            for (block_pos, block) in section.blocks.iter().enumerate() {
                let delegate_label = format!("{}-{}", label, block.kind());
                let opts = options.delegate(max_tokens, &tokenizer, delegate_label);

                let (produced, language) = match block {
                    Block::Heading { .. } => continue,
                    Block::Code { language, content } => (
                        self.code_chunker.chunk_code(content, language.as_deref(), &opts),
                        language.as_deref(),
                    ),
                    Block::List(content) | Block::Blockquote(content) | Block::Paragraph(content) => {
                        (self.recursive_chunker.chunk(content, &opts), None)
                    }
                };
                let source_type = if matches!(block, Block::Code { .. }) { "code" } else { "markdown" };

                for (idx, produced_chunk) in produced.into_iter().enumerate() {
                    let mut builder = MetadataBuilder::new("markdown", source_type)
                        .path(section.heading_path.clone())
                        .base(options)
                        .extra("headingPath", json!(section.heading_path))
                        .extra("blockType", block.kind())
                        .extra("blockIndex", block_index);
                    if let Some(language) = language {
                        builder = builder.extra("language", language);
                    }

                    let mut metadata = produced_chunk.metadata.clone();
                    metadata.merge(builder.build());
                    chunks.push(Chunk {
                        id: format!("{}-{}-{}-{}", label, section_index, block_pos, idx),
                        label: Some(label.clone()),
                        metadata,
                        ..produced_chunk
                    });
                    block_index += 1;
                }
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WhitespaceTokenizer;
    use pretty_assertions::assert_eq;

    fn whitespace_chunker() -> MarkdownChunker {
        MarkdownChunker::with_tokenizer(Arc::new(WhitespaceTokenizer))
    }

    #[test]
    fn test_heading_paths() {
        let chunks = whitespace_chunker().chunk("# Title\nIntro.\n\n## Details\nMore.", &ChunkOptions::new());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Intro.");
        assert_eq!(chunks[0].metadata.get_strings("headingPath"), Some(vec!["Title".to_string()]));
        assert_eq!(chunks[1].content, "More.");
        assert_eq!(
            chunks[1].metadata.get_strings("headingPath"),
            Some(vec!["Title".to_string(), "Details".to_string()])
        );
        assert_eq!(chunks[1].metadata.get_strings("path"), chunks[1].metadata.get_strings("headingPath"));
        assert_eq!(chunks[1].metadata.get_usize("blockIndex"), Some(1));
        assert_eq!(chunks[1].metadata.format(), Some("markdown"));
    }

    #[test]
    fn test_sibling_heading_replaces_deeper_levels() {
        let md = "# A\n### C\nc text\n## B\nb text";
        let chunks = whitespace_chunker().chunk(md, &ChunkOptions::new());
        assert_eq!(chunks[0].metadata.get_strings("headingPath"), Some(vec!["A".into(), "C".into()]));
        assert_eq!(chunks[1].metadata.get_strings("headingPath"), Some(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn test_block_types() {
        let md = "# Guide\n\n- one\n- two\n\n> quoted\n> text\n\n```nolang\nlet x = 1;\n```\n\nPlain words\ncontinue here.";
        let chunks = whitespace_chunker().chunk(md, &ChunkOptions::new());

        let types: Vec<_> = chunks
            .iter()
            .map(|c| c.metadata.get_str("blockType").unwrap_or_default().to_string())
            .collect();
        assert_eq!(types, vec!["list", "blockquote", "code", "paragraph"]);
        assert_eq!(chunks[0].content, "one two");
        assert_eq!(chunks[1].content, "quoted text");
        assert_eq!(chunks[2].content, "let x = 1;");
        assert_eq!(chunks[2].metadata.source_type(), Some("code"));
        assert_eq!(chunks[2].metadata.get_str("language"), Some("nolang"));
        assert_eq!(chunks[3].content, "Plain words continue here.");
        assert_eq!(chunks[3].id, "markdown-0-3-0");
        assert!(chunks.iter().all(|c| c.label.as_deref() == Some("markdown")));
    }

    #[test]
    fn test_code_block_gets_structure() {
        let md = "## Example\n```python\ndef hello():\n    return 1\n```";
        let chunks = whitespace_chunker().chunk(md, &ChunkOptions::new());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.get_str("blockKind"), Some("function"));
        assert_eq!(chunks[0].metadata.get_str("language"), Some("python"));
    }

    #[test]
    fn test_empty_markdown() {
        assert!(whitespace_chunker().chunk("\n\n  ", &ChunkOptions::new()).is_empty());
        assert!(whitespace_chunker().chunk("# Only a heading", &ChunkOptions::new()).is_empty());
    }
}
