//! RAG Chunker Library
//!
//! Turns raw text (markdown, HTML, JSON, LaTeX, source code, tables or plain
//! prose) into ordered, bounded-size, metadata-annotated chunks for embedding
//! and retrieval. Embedders and boundary detectors are injected by the caller.

pub mod ast_engine;
pub mod chunkers;
pub mod document;
pub mod error;
pub mod router;
pub mod text;
pub mod types;

pub use chunkers::{AsyncChunker, BoundaryDetector, Chunker, SemanticEmbedder};
pub use document::{ExtractOptions, StructuredDocument};
pub use error::ChunkError;
pub use router::{chunk_by_strategy, ChunkingRouter, Strategy};
pub use types::{Chunk, ChunkMetadata, ChunkOptions, ChunkingConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ast_engine::{register_code_parser, register_parser_alias, CodeBlock, CodeParser};
    pub use crate::chunkers::*;
    pub use crate::document::*;
    pub use crate::error::ChunkError;
    pub use crate::router::*;
    pub use crate::text::{Tokenizer, WhitespaceTokenizer};
    pub use crate::types::*;
}

/// Default window size for the token and sentence chunkers
pub const DEFAULT_TOKEN_MAX_TOKENS: usize = 200;

/// Default token budget for structure-aware chunkers
pub const DEFAULT_MAX_TOKENS: usize = 300;

/// Default token budget for code blocks
pub const DEFAULT_CODE_MAX_TOKENS: usize = 400;

/// Cosine similarity needed to merge neighbouring semantic units
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Base chunks per late-chunking window
pub const DEFAULT_LATE_WINDOW: usize = 2;

/// Base chunks advanced between late-chunking windows
pub const DEFAULT_LATE_STRIDE: usize = 1;

/// Keywords kept by the keyword extractor
pub const DEFAULT_KEYWORD_COUNT: usize = 5;
