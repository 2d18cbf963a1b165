//! Token-based chunker for fixed-size token windows.

use std::sync::Arc;

use super::base::Chunker;
use crate::text::{default_tokenizer, slice_by_token_range, LineMap, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_TOKEN_MAX_TOKENS;

/// Simple token-based chunker that splits text into fixed-size token windows.
///
/// This is the most basic chunker that doesn't consider semantic boundaries.
/// It's fast and predictable, and every other chunker falls back to it when a
/// structural unit is over budget.
pub struct TokenChunker {
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenChunker {
    /// Create a new token chunker with the default tokenizer.
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl Default for TokenChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for TokenChunker {
    fn name(&self) -> &'static str {
        "token"
    }

    fn description(&self) -> &'static str {
        "Splits text into fixed-size token windows with optional overlap"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_TOKEN_MAX_TOKENS);
        let overlap = options.overlap.unwrap_or(0).min(max_tokens - 1);
        let label = options.label_or("token");

        let tokens = tokenizer.tokenize(text);
        if tokens.is_empty() {
            return vec![];
        }

        let line_map = LineMap::new(text);
        let last = tokens.len() - 1;
        let mut chunks = Vec::new();
        let mut start_index = 0;

        loop {
            let mut end_index = (start_index + max_tokens - 1).min(last);
            let mut content = slice_by_token_range(text, &tokens, start_index, end_index);
            let mut count = tokenizer.count_tokens(content);

            // A piece may span several encoded ids; shrink until the window fits.
            while count > max_tokens && end_index > start_index {
                let len = end_index - start_index + 1;
                let target = (max_tokens * len / count).clamp(1, len - 1);
                end_index = start_index + target - 1;
                content = slice_by_token_range(text, &tokens, start_index, end_index);
                count = tokenizer.count_tokens(content);
            }

            let start = tokens[start_index].start;
            let end = tokens[end_index].end;
            let metadata = MetadataBuilder::new("text", "token")
                .base(options)
                .extra("tokenStart", start_index)
                .extra("tokenEnd", end_index)
                .extra("position", line_map.position(start, end))
                .build();

            chunks.push(
                Chunk::new(format!("token-{}", chunks.len()), content, start, end)
                    .with_tokens(count)
                    .with_label(label.as_str())
                    .with_metadata(metadata),
            );

            // Stop once the last token is included
            if end_index == last {
                break;
            }
            start_index = (end_index + 1).saturating_sub(overlap).max(start_index + 1);
        }

        chunks
    }
}
