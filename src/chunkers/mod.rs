//! Chunking strategies for different content types.

mod base;
mod code_chunker;
mod html_chunker;
mod json_chunker;
mod latex_chunker;
mod markdown_chunker;
mod recursive_chunker;
mod sentence_chunker;
mod table_chunker;
mod token_chunker;

// Collaborator-driven and smoothing chunkers
mod late_chunker;
mod neural_chunker;
mod semantic_chunker;
mod semantic_markdown_chunker;
mod slumber_chunker;

pub use base::{AsyncChunker, BoundaryDetector, Chunker, FnDetector, FnEmbedder, SemanticEmbedder};
pub use code_chunker::CodeChunker;
pub use html_chunker::{normalize_html, HtmlChunker};
pub use json_chunker::JsonChunker;
pub use latex_chunker::LatexChunker;
pub use markdown_chunker::MarkdownChunker;
pub use recursive_chunker::RecursiveChunker;
pub use sentence_chunker::SentenceChunker;
pub use table_chunker::TableChunker;
pub use token_chunker::TokenChunker;

pub use late_chunker::LateChunker;
pub use neural_chunker::NeuralChunker;
pub use semantic_chunker::SemanticChunker;
pub use semantic_markdown_chunker::SemanticMarkdownChunker;
pub use slumber_chunker::SlumberChunker;
