//! Sentence-based chunker that respects sentence boundaries.

use std::sync::Arc;

use super::base::Chunker;
use crate::text::{default_tokenizer, split_into_sentences, LineMap, MetadataBuilder, Segment, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_TOKEN_MAX_TOKENS;

/// Sentence-based chunker that greedily packs sentences into chunks.
///
/// When adding a sentence pushes a group over budget, the group is emitted
/// without it and the next group starts with the last `overlap_sentences`
/// sentences of the emitted one plus the overflowing sentence. A single
/// sentence larger than the budget is emitted as-is.
pub struct SentenceChunker {
    tokenizer: Arc<dyn Tokenizer>,
}

impl SentenceChunker {
    /// Create a new sentence chunker with the default tokenizer.
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SentenceChunker {
    fn name(&self) -> &'static str {
        "sentence"
    }

    fn description(&self) -> &'static str {
        "Groups whole sentences into chunks up to the token budget"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_TOKEN_MAX_TOKENS);
        let overlap_sentences = options.overlap_sentences.unwrap_or(0);
        let label = options.label_or("sentence");

        let sentences = split_into_sentences(text, tokenizer.as_ref());
        if sentences.is_empty() {
            return vec![];
        }

        let line_map = LineMap::new(text);
        let mut chunks = Vec::new();

        // Counted over the exact span so separators between sentences are included.
        let span_tokens = |group: &[Segment]| match (group.first(), group.last()) {
            (Some(first), Some(last)) => tokenizer.count_tokens(&text[first.start..last.end]),
            _ => 0,
        };

        let emit = |group: &[Segment], chunks: &mut Vec<Chunk>| {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                return;
            };
            let index = chunks.len();
            let metadata = MetadataBuilder::new("text", "sentence")
                .base(options)
                .extra("chunkIndex", index)
                .extra("sentenceCount", group.len())
                .extra("position", line_map.position(first.start, last.end))
                .build();

            // Exact source span keeps the original inter-sentence whitespace.
            chunks.push(
                Chunk::new(
                    format!("sentence-{}", index),
                    &text[first.start..last.end],
                    first.start,
                    last.end,
                )
                .with_tokens(span_tokens(group))
                .with_label(label.as_str())
                .with_metadata(metadata),
            );
        };

        let mut current: Vec<Segment> = Vec::new();

        for sentence in sentences {
            current.push(sentence);

            if current.len() > 1 && span_tokens(&current) > max_tokens {
                let overflow = current.pop();
                emit(&current, &mut chunks);

                let keep = overlap_sentences.min(current.len());
                current.drain(..current.len() - keep);
                current.extend(overflow);
            }
        }

        if !current.is_empty() {
            emit(&current, &mut chunks);
        }

        chunks
    }
}
