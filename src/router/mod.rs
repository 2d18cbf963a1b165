//! Chunking strategy router.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunkers::{
    Chunker, CodeChunker, HtmlChunker, JsonChunker, LatexChunker, MarkdownChunker, RecursiveChunker,
    SentenceChunker, TableChunker, TokenChunker,
};
use crate::text::{detect_format, tokenizer_for_encoding, DetectedFormat, Tokenizer};
use crate::types::{Chunk, ChunkOptions, ChunkingConfig};

/// Named chunking strategy.
///
/// `Auto` resolves through the format detector before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Markdown,
    Html,
    Json,
    Latex,
    Code,
    Table,
    Sentence,
    Token,
    Recursive,
    Auto,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Markdown => "markdown",
            Strategy::Html => "html",
            Strategy::Json => "json",
            Strategy::Latex => "latex",
            Strategy::Code => "code",
            Strategy::Table => "table",
            Strategy::Sentence => "sentence",
            Strategy::Token => "token",
            Strategy::Recursive => "recursive",
            Strategy::Auto => "auto",
        }
    }

    /// Strategy for a detected format; plain text goes to the recursive chunker.
    pub fn from_format(format: DetectedFormat) -> Self {
        match format {
            DetectedFormat::Markdown => Strategy::Markdown,
            DetectedFormat::Html => Strategy::Html,
            DetectedFormat::Json => Strategy::Json,
            DetectedFormat::Latex => Strategy::Latex,
            DetectedFormat::Code => Strategy::Code,
            DetectedFormat::Table => Strategy::Table,
            DetectedFormat::Text => Strategy::Recursive,
        }
    }
}

/// Parses strategy names case-insensitively; unknown names map to `Recursive`.
impl From<&str> for Strategy {
    fn from(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "markdown" | "md" => Strategy::Markdown,
            "html" | "htm" => Strategy::Html,
            "json" => Strategy::Json,
            "latex" | "tex" => Strategy::Latex,
            "code" => Strategy::Code,
            "table" | "csv" => Strategy::Table,
            "sentence" => Strategy::Sentence,
            "token" => Strategy::Token,
            "auto" => Strategy::Auto,
            _ => Strategy::Recursive,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router that dispatches text to the chunker for a strategy.
///
/// All chunkers share one tokenizer built from the configured encoding.
pub struct ChunkingRouter {
    /// Token chunker (fixed windows)
    token_chunker: Arc<TokenChunker>,
    /// Sentence chunker (plain prose)
    sentence_chunker: Arc<SentenceChunker>,
    /// Recursive chunker (fallback for unknown strategies and plain text)
    recursive_chunker: Arc<RecursiveChunker>,
    /// Markdown chunker (heading-aware)
    markdown_chunker: Arc<MarkdownChunker>,
    /// Code chunker (fenced code and structural blocks)
    code_chunker: Arc<CodeChunker>,
    /// HTML chunker (tag stripping)
    html_chunker: Arc<HtmlChunker>,
    /// JSON chunker (path/value lines)
    json_chunker: Arc<JsonChunker>,
    /// LaTeX chunker (sectioning commands)
    latex_chunker: Arc<LatexChunker>,
    /// Table chunker (pipe tables and CSV)
    table_chunker: Arc<TableChunker>,
    /// Strategy used by callers that do not name one
    default_strategy: Strategy,
    /// Token budget applied when a call leaves `max_tokens` unset
    default_max_tokens: Option<usize>,
}

impl ChunkingRouter {
    /// Create a new chunking router with the given configuration.
    pub fn new(config: &ChunkingConfig) -> Self {
        let mut router = Self::with_tokenizer(tokenizer_for_encoding(&config.encoding));
        router.default_strategy = config.strategy();
        router.default_max_tokens = config.max_tokens;
        router
    }

    /// Create a router whose chunkers all share `tokenizer`.
    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            token_chunker: Arc::new(TokenChunker::with_tokenizer(Arc::clone(&tokenizer))),
            sentence_chunker: Arc::new(SentenceChunker::with_tokenizer(Arc::clone(&tokenizer))),
            recursive_chunker: Arc::new(RecursiveChunker::with_tokenizer(Arc::clone(&tokenizer))),
            markdown_chunker: Arc::new(MarkdownChunker::with_tokenizer(Arc::clone(&tokenizer))),
            code_chunker: Arc::new(CodeChunker::with_tokenizer(Arc::clone(&tokenizer))),
            html_chunker: Arc::new(HtmlChunker::with_tokenizer(Arc::clone(&tokenizer))),
            json_chunker: Arc::new(JsonChunker::with_tokenizer(Arc::clone(&tokenizer))),
            latex_chunker: Arc::new(LatexChunker::with_tokenizer(Arc::clone(&tokenizer))),
            table_chunker: Arc::new(TableChunker::with_tokenizer(tokenizer)),
            default_strategy: Strategy::Auto,
            default_max_tokens: None,
        }
    }

    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    /// Strategy that `Auto` resolves to for this text.
    pub fn detect_strategy(&self, text: &str) -> Strategy {
        Strategy::from_format(detect_format(text))
    }

    /// Get the chunker for a concrete strategy.
    ///
    /// `Auto` has no chunker of its own and maps to the recursive chunker;
    /// use [`chunk`](Self::chunk) to resolve it against a text.
    pub fn chunker_for(&self, strategy: Strategy) -> Arc<dyn Chunker> {
        match strategy {
            Strategy::Markdown => Arc::clone(&self.markdown_chunker) as Arc<dyn Chunker>,
            Strategy::Html => Arc::clone(&self.html_chunker) as Arc<dyn Chunker>,
            Strategy::Json => Arc::clone(&self.json_chunker) as Arc<dyn Chunker>,
            Strategy::Latex => Arc::clone(&self.latex_chunker) as Arc<dyn Chunker>,
            Strategy::Code => Arc::clone(&self.code_chunker) as Arc<dyn Chunker>,
            Strategy::Table => Arc::clone(&self.table_chunker) as Arc<dyn Chunker>,
            Strategy::Sentence => Arc::clone(&self.sentence_chunker) as Arc<dyn Chunker>,
            Strategy::Token => Arc::clone(&self.token_chunker) as Arc<dyn Chunker>,
            Strategy::Recursive | Strategy::Auto => Arc::clone(&self.recursive_chunker) as Arc<dyn Chunker>,
        }
    }

    /// Chunk `text` with the named strategy, resolving `Auto` first.
    pub fn chunk(&self, strategy: Strategy, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let selected = match strategy {
            Strategy::Auto => self.detect_strategy(text),
            other => other,
        };
        let chunker = self.chunker_for(selected);
        debug!(requested = %strategy, selected = %selected, chunker = chunker.name(), "Dispatching chunk request");

        match (options.max_tokens, self.default_max_tokens) {
            (None, Some(max_tokens)) => {
                let mut options = options.clone();
                options.max_tokens = Some(max_tokens);
                chunker.chunk(text, &options)
            }
            _ => chunker.chunk(text, options),
        }
    }

    /// List all available chunkers.
    pub fn list_chunkers(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            (self.token_chunker.name(), self.token_chunker.description()),
            (self.sentence_chunker.name(), self.sentence_chunker.description()),
            (self.recursive_chunker.name(), self.recursive_chunker.description()),
            (self.markdown_chunker.name(), self.markdown_chunker.description()),
            (self.code_chunker.name(), self.code_chunker.description()),
            (self.html_chunker.name(), self.html_chunker.description()),
            (self.json_chunker.name(), self.json_chunker.description()),
            (self.latex_chunker.name(), self.latex_chunker.description()),
            (self.table_chunker.name(), self.table_chunker.description()),
        ]
    }
}

impl Default for ChunkingRouter {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

lazy_static! {
    static ref DEFAULT_ROUTER: ChunkingRouter = ChunkingRouter::default();
}

/// Chunk `text` with a strategy using a process-wide default router.
pub fn chunk_by_strategy(strategy: Strategy, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
    DEFAULT_ROUTER.chunk(strategy, text, options)
}
