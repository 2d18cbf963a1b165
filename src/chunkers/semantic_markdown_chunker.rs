//! Structure-aware seeding followed by semantic re-merging.

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AsyncChunker, Chunker};
use super::markdown_chunker::MarkdownChunker;
use super::semantic_chunker::SemanticChunker;
use crate::error::ChunkError;
use crate::text::{default_tokenizer, Tokenizer};
use crate::types::{Chunk, ChunkOptions, DOC_ID_KEY, SOURCE_ID_KEY, SOURCE_TYPE_KEY};
use crate::DEFAULT_MAX_TOKENS;

/// Runs the markdown chunker, joins its chunk contents with newlines, then
/// re-chunks the result with [`SemanticChunker`] using the same embedder and
/// threshold.
///
/// Offsets refer to the newline-joined markdown output, not the raw input.
pub struct SemanticMarkdownChunker {
    tokenizer: Arc<dyn Tokenizer>,
    markdown_chunker: MarkdownChunker,
    semantic_chunker: SemanticChunker,
}

impl SemanticMarkdownChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            markdown_chunker: MarkdownChunker::with_tokenizer(Arc::clone(&tokenizer)),
            semantic_chunker: SemanticChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }

    pub fn name(&self) -> &'static str {
        "semantic-markdown"
    }
}

impl Default for SemanticMarkdownChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncChunker for SemanticMarkdownChunker {
    async fn chunk_async(&self, text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>, ChunkError> {
        if options.embedder.is_none() {
            return Err(ChunkError::missing("SemanticMarkdownChunker", "an embedder"));
        }

        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("semantic-markdown");

        let markdown_opts = options.delegate(max_tokens, &tokenizer, label.clone());
        let sections: Vec<String> = self
            .markdown_chunker
            .chunk(text, &markdown_opts)
            .into_iter()
            .map(|chunk| chunk.content)
            .collect();

        let mut semantic_opts = options.clone();
        semantic_opts.label = Some(label.clone());
        semantic_opts.tokenizer = Some(tokenizer);
        let merged = self
            .semantic_chunker
            .chunk_async(&sections.join("\n"), &semantic_opts)
            .await?;

        let chunks = merged
            .into_iter()
            .enumerate()
            .map(|(index, mut chunk)| {
                chunk.id = format!("{}-{}", label, index);
                chunk.metadata.insert(SOURCE_TYPE_KEY, "semantic-markdown");
                if let Some(doc_id) = &options.doc_id {
                    chunk.metadata.insert(DOC_ID_KEY, doc_id.as_str());
                }
                if let Some(source_id) = &options.source_id {
                    chunk.metadata.insert(SOURCE_ID_KEY, source_id.as_str());
                }
                chunk
            })
            .collect();

        Ok(chunks)
    }
}
