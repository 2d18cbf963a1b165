//! Slumber chunker: smooths out tiny fragments by enforcing a minimum size.

use std::sync::Arc;

use tracing::trace;

use super::base::Chunker;
use super::sentence_chunker::SentenceChunker;
use super::token_chunker::TokenChunker;
use crate::text::{default_tokenizer, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

/// Buffers sentence seeds until they reach `min_tokens`, then flushes them as
/// one newline-joined chunk.
///
/// `min_tokens` defaults to half the budget and is clamped to `[1, max_tokens]`.
/// A flushed buffer over budget is split by tokens; offsets of those pieces
/// are relative to the joined buffer, shifted by the buffer start.
pub struct SlumberChunker {
    tokenizer: Arc<dyn Tokenizer>,
    sentence_chunker: SentenceChunker,
    token_chunker: TokenChunker,
}

struct FlushContext<'a> {
    tokenizer: &'a Arc<dyn Tokenizer>,
    max_tokens: usize,
    overlap_tokens: usize,
    label: &'a str,
    options: &'a ChunkOptions,
}

impl SlumberChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            sentence_chunker: SentenceChunker::with_tokenizer(Arc::clone(&tokenizer)),
            token_chunker: TokenChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }

    fn flush(&self, buffer: &mut Vec<Chunk>, out: &mut Vec<Chunk>, ctx: &FlushContext<'_>) {
        let (Some(first), Some(last)) = (buffer.first(), buffer.last()) else {
            return;
        };
        let start = first.start;
        let end = last.end;
        let smoothed = buffer.len() > 1;
        let content = buffer
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        buffer.clear();

        let tokens = ctx.tokenizer.count_tokens(&content);
        if tokens <= ctx.max_tokens {
            let metadata = MetadataBuilder::new("slumber", "slumber")
                .base(ctx.options)
                .extra("smoothed", smoothed)
                .build();
            out.push(
                Chunk::new(format!("{}-{}", ctx.label, out.len()), content, start, end)
                    .with_tokens(tokens)
                    .with_label(ctx.label)
                    .with_metadata(metadata),
            );
            return;
        }

        trace!(tokens, max_tokens = ctx.max_tokens, "Slumber buffer over budget, splitting by tokens");
        let mut token_opts = ctx
            .options
            .delegate(ctx.max_tokens, ctx.tokenizer, format!("{}-token", ctx.label));
        token_opts.overlap = Some(ctx.overlap_tokens);
        for piece in self.token_chunker.chunk(&content, &token_opts) {
            let metadata = MetadataBuilder::new("slumber", "slumber-token")
                .base(ctx.options)
                .extras(piece.metadata.without_origin())
                .build();
            out.push(Chunk {
                id: format!("{}-{}", ctx.label, out.len()),
                label: Some(ctx.label.to_string()),
                metadata,
                ..piece.shifted(start)
            });
        }
    }
}

impl Default for SlumberChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SlumberChunker {
    fn name(&self) -> &'static str {
        "slumber"
    }

    fn description(&self) -> &'static str {
        "Merges small sentence groups until they reach a minimum token count"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let min_tokens = options.min_tokens.unwrap_or(max_tokens / 2).min(max_tokens).max(1);
        let overlap_tokens = options.overlap_tokens.unwrap_or(0);
        let label = options.label_or("slumber");

        let seed_opts = options.delegate(max_tokens, &tokenizer, format!("{}-seed", label));
        let seeds = self.sentence_chunker.chunk(text, &seed_opts);

        let ctx = FlushContext {
            tokenizer: &tokenizer,
            max_tokens,
            overlap_tokens,
            label: &label,
            options,
        };
        let mut merged = Vec::new();
        let mut buffer: Vec<Chunk> = Vec::new();
        let mut buffered_tokens = 0;

        for seed in seeds {
            buffered_tokens += seed.tokens.unwrap_or_else(|| tokenizer.count_tokens(&seed.content));
            buffer.push(seed);
            if buffered_tokens >= min_tokens {
                self.flush(&mut buffer, &mut merged, &ctx);
                buffered_tokens = 0;
            }
        }
        self.flush(&mut buffer, &mut merged, &ctx);

        if overlap_tokens == 0 || merged.len() < 2 {
            return merged;
        }

        let mut with_overlap = Vec::with_capacity(merged.len() * 2);
        let mut iter = merged.into_iter().peekable();
        let mut index = 0;
        while let Some(current) = iter.next() {
            let filler = iter.peek().map(|next| {
                let words: Vec<&str> = next.content.split_whitespace().take(overlap_tokens).collect();
                (words.join(" "), next.start)
            });
            with_overlap.push(current);

            if let Some((content, start)) = filler.filter(|(content, _)| !content.is_empty()) {
                let metadata = MetadataBuilder::new("slumber", "slumber-overlap")
                    .base(options)
                    .build();
                let end = start + content.len();
                with_overlap.push(
                    Chunk::new(format!("{}-overlap-{}", label, index), content, start, end)
                        .with_label(format!("{}-overlap", label))
                        .with_metadata(metadata),
                );
            }
            index += 1;
        }

        with_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WhitespaceTokenizer;
    use pretty_assertions::assert_eq;

    fn chunker() -> SlumberChunker {
        SlumberChunker::with_tokenizer(Arc::new(WhitespaceTokenizer))
    }

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_flushes_each_seed_at_min() {
        let chunks = chunker().chunk("One two. Three four.", &ChunkOptions::with_max_tokens(2));
        assert_eq!(contents(&chunks), vec!["One two.", "Three four."]);
        assert_eq!(chunks[1].id, "slumber-1");
        assert_eq!(chunks[1].metadata.get("smoothed"), Some(&serde_json::json!(false)));
        assert_eq!(chunks[1].metadata.source_type(), Some("slumber"));
    }

    #[test]
    fn test_buffer_over_budget_is_token_split() {
        let opts = ChunkOptions::with_max_tokens(4).min_tokens(4);
        let chunks = chunker().chunk("A b c. D e f. G.", &opts);

        assert_eq!(contents(&chunks), vec!["A b c.\nD", "e f. G."]);
        assert_eq!((chunks[1].start, chunks[1].end), (9, 16));
        assert_eq!(chunks[0].metadata.source_type(), Some("slumber-token"));
        assert_eq!(chunks[1].label.as_deref(), Some("slumber"));
    }

    #[test]
    fn test_min_tokens_clamped_to_max() {
        let opts = ChunkOptions::with_max_tokens(2).min_tokens(50);
        let chunks = chunker().chunk("One two. Three four.", &opts);
        assert_eq!(contents(&chunks), vec!["One two.", "Three four."]);
    }

    #[test]
    fn test_overlap_fillers() {
        let opts = ChunkOptions::with_max_tokens(2).overlap_tokens(1);
        let chunks = chunker().chunk("One two. Three four.", &opts);

        assert_eq!(contents(&chunks), vec!["One two.", "Three", "Three four."]);
        assert_eq!(chunks[1].id, "slumber-overlap-0");
        assert_eq!(chunks[1].label.as_deref(), Some("slumber-overlap"));
        assert_eq!((chunks[1].start, chunks[1].end), (9, 14));
        assert_eq!(chunks[1].metadata.source_type(), Some("slumber-overlap"));
    }

    #[test]
    fn test_empty() {
        assert!(chunker().chunk("", &ChunkOptions::new()).is_empty());
    }
}
