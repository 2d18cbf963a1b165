//! Fenced-code aware chunker with structural block extraction.
//!
//! Text is split into alternating prose and fenced-code segments. Prose goes
//! through the recursive cascade. Code segments are cut along the function,
//! class and method blocks reported by a [`CodeParser`], falling back to token
//! windows when no parser is available for the fence language.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::base::Chunker;
use super::{RecursiveChunker, TokenChunker};
use crate::ast_engine::{get_code_parser, CodeBlock, CodeParser};
use crate::text::{default_tokenizer, LineMap, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkMetadata, ChunkOptions};
use crate::DEFAULT_CODE_MAX_TOKENS;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(\w+)?(.*?)```").unwrap();
}

/// A fenced code body and its location in the chunked text.
#[derive(Debug, Clone)]
struct CodeSegment<'a> {
    content: &'a str,
    start: usize,
    language: Option<String>,
    fence_start: usize,
    fence_end: usize,
}

#[derive(Debug, Clone)]
enum Segment<'a> {
    Code(CodeSegment<'a>),
    Text { content: &'a str, start: usize },
}

fn split_code_and_text(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in CODE_FENCE.captures_iter(text) {
        let (Some(fence), Some(body)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        if fence.start() > last {
            segments.push(Segment::Text {
                content: &text[last..fence.start()],
                start: last,
            });
        }
        segments.push(Segment::Code(CodeSegment {
            content: body.as_str(),
            start: body.start(),
            language: caps.get(1).map(|m| m.as_str().to_string()),
            fence_start: fence.start(),
            fence_end: fence.end(),
        }));
        last = fence.end();
    }

    if last < text.len() {
        segments.push(Segment::Text {
            content: &text[last..],
            start: last,
        });
    }
    segments
}

/// Code chunker that cuts fenced code along structural blocks.
pub struct CodeChunker {
    tokenizer: Arc<dyn Tokenizer>,
    recursive_chunker: RecursiveChunker,
    token_chunker: TokenChunker,
}

impl CodeChunker {
    /// Create a new code chunker with the default tokenizer.
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            recursive_chunker: RecursiveChunker::with_tokenizer(Arc::clone(&tokenizer)),
            token_chunker: TokenChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }

    /// Chunk a bare code body (no fences) as a single code segment.
    pub fn chunk_code(&self, code: &str, language: Option<&str>, options: &ChunkOptions) -> Vec<Chunk> {
        if code.trim().is_empty() {
            return vec![];
        }
        let segment = CodeSegment {
            content: code,
            start: 0,
            language: language.map(str::to_string),
            fence_start: 0,
            fence_end: code.len(),
        };
        let mut run = ChunkRun::new(self, code, options);
        run.code_segment(&segment);
        run.chunks
    }
}

impl Default for CodeChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for CodeChunker {
    fn name(&self) -> &'static str {
        "code"
    }

    fn description(&self) -> &'static str {
        "Splits fenced code along functions, classes and methods; prose is chunked recursively"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let mut run = ChunkRun::new(self, text, options);
        for segment in split_code_and_text(text) {
            match segment {
                Segment::Code(code) => run.code_segment(&code),
                Segment::Text { content, start } => run.text_segment(content, start),
            }
        }
        run.chunks
    }
}

/// State for one chunking call.
struct ChunkRun<'a> {
    chunker: &'a CodeChunker,
    options: &'a ChunkOptions,
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
    label: String,
    line_map: LineMap,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkRun<'a> {
    fn new(chunker: &'a CodeChunker, text: &str, options: &'a ChunkOptions) -> Self {
        Self {
            chunker,
            options,
            tokenizer: options.tokenizer_or(&chunker.tokenizer),
            max_tokens: options.max_tokens_or(DEFAULT_CODE_MAX_TOKENS),
            label: options.label_or("code"),
            line_map: LineMap::new(text),
            chunks: Vec::new(),
        }
    }

    fn next_id(&self) -> String {
        format!("{}-{}", self.label, self.chunks.len())
    }

    fn code_metadata(&self, segment: &CodeSegment<'_>, start: usize, end: usize) -> MetadataBuilder<'a> {
        let mut builder = MetadataBuilder::new("code", "code")
            .base(self.options)
            .extra("type", "code")
            .extra("position", self.line_map.position(start, end))
            .extra("fencePosition", self.line_map.position(segment.fence_start, segment.fence_end));
        if let Some(language) = &segment.language {
            builder = builder.extra("language", language.as_str());
        }
        builder
    }

    fn block_extras(block: &CodeBlock) -> ChunkMetadata {
        let parent: Vec<String> = block
            .path
            .split_last()
            .map(|(_, rest)| rest.to_vec())
            .unwrap_or_default();
        let mut extra = ChunkMetadata::new();
        extra.insert("blockKind", block.kind.as_str());
        extra.insert("blockName", block.name.clone().map_or(Value::Null, Value::from));
        extra.insert("blockPath", json!(block.path));
        extra.insert("blockParent", json!(parent));
        extra
    }

    fn parser_for(&self, segment: &CodeSegment<'_>) -> Option<Arc<dyn CodeParser>> {
        self.options
            .parser
            .clone()
            .or_else(|| segment.language.as_deref().and_then(get_code_parser))
    }

    fn code_segment(&mut self, segment: &CodeSegment<'_>) {
        let blocks = match self.parser_for(segment) {
            Some(parser) => parser.parse(segment.content),
            None => {
                debug!(language = ?segment.language, "No code parser registered, chunking by tokens");
                Vec::new()
            }
        };

        if blocks.is_empty() {
            self.whole_segment(segment);
            return;
        }

        for block in &blocks {
            let Some(block_text) = segment.content.get(block.start..block.end) else {
                warn!(start = block.start, end = block.end, "Skipping code block outside its segment");
                continue;
            };
            if block_text.trim().is_empty() {
                continue;
            }
            self.block(segment, block, block_text);
        }
    }

    fn block(&mut self, segment: &CodeSegment<'_>, block: &CodeBlock, block_text: &str) {
        let base = segment.start + block.start;
        let block_tokens = self.tokenizer.count_tokens(block_text);

        if block_tokens <= self.max_tokens {
            let metadata = self
                .code_metadata(segment, base, base + block_text.len())
                .path(block.path.clone())
                .extras(Self::block_extras(block))
                .build();
            let chunk = Chunk::new(self.next_id(), block_text, base, base + block_text.len())
                .with_tokens(block_tokens)
                .with_label(self.label.as_str())
                .with_metadata(metadata);
            self.chunks.push(chunk);
            return;
        }

        let opts = self
            .options
            .delegate(self.max_tokens, &self.tokenizer, format!("{}-ast", self.label));
        for piece in self.chunker.token_chunker.chunk(block_text, &opts) {
            let piece = piece.shifted(base);
            let metadata = self
                .code_metadata(segment, piece.start, piece.end)
                .path(block.path.clone())
                .extras(piece.metadata.without_origin())
                .extras(Self::block_extras(block))
                .extra("position", self.line_map.position(piece.start, piece.end))
                .build();
            let chunk = Chunk {
                id: self.next_id(),
                label: Some(self.label.clone()),
                metadata,
                ..piece
            };
            self.chunks.push(chunk);
        }
    }

    /// No structural blocks: emit the whole body, or token windows when over budget.
    fn whole_segment(&mut self, segment: &CodeSegment<'_>) {
        if segment.content.trim().is_empty() {
            return;
        }
        let start = segment.start;
        let end = start + segment.content.len();
        let tokens = self.tokenizer.count_tokens(segment.content);

        if tokens <= self.max_tokens {
            let metadata = self.code_metadata(segment, start, end).build();
            let chunk = Chunk::new(self.next_id(), segment.content, start, end)
                .with_tokens(tokens)
                .with_label(self.label.as_str())
                .with_metadata(metadata);
            self.chunks.push(chunk);
            return;
        }

        let opts = self
            .options
            .delegate(self.max_tokens, &self.tokenizer, format!("{}-block", self.label));
        for piece in self.chunker.token_chunker.chunk(segment.content, &opts) {
            let piece = piece.shifted(start);
            let metadata = self
                .code_metadata(segment, piece.start, piece.end)
                .extras(piece.metadata.without_origin())
                .extra("position", self.line_map.position(piece.start, piece.end))
                .build();
            let chunk = Chunk {
                id: self.next_id(),
                metadata,
                ..piece
            };
            self.chunks.push(chunk);
        }
    }

    fn text_segment(&mut self, content: &str, start: usize) {
        let opts = self
            .options
            .delegate(self.max_tokens, &self.tokenizer, format!("{}-text", self.label));
        for piece in self.chunker.recursive_chunker.chunk(content, &opts) {
            let piece = piece.shifted(start);
            let metadata = MetadataBuilder::new("code", "text")
                .base(self.options)
                .extras(piece.metadata.without_origin())
                .extra("position", self.line_map.position(piece.start, piece.end))
                .build();
            let chunk = Chunk {
                id: self.next_id(),
                metadata,
                ..piece
            };
            self.chunks.push(chunk);
        }
    }
}
