//! Recursive text chunker with hierarchical splitting.

use std::sync::Arc;

use super::base::Chunker;
use super::{SentenceChunker, TokenChunker};
use crate::text::{default_tokenizer, split_into_paragraphs, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

/// Recursive chunker that splits text hierarchically.
///
/// The cascade runs in order of preference:
/// 1. Paragraphs (blank-line delimited), emitted whole when within budget
/// 2. Sentence groups, via [`SentenceChunker`] with one sentence of overlap
/// 3. Token windows, via [`TokenChunker`], for groups still over budget
///
/// With `overlap_tokens > 0`, short filler chunks holding the first
/// characters of the following chunk are interleaved between neighbours and
/// labelled `<label>-overlap`.
pub struct RecursiveChunker {
    tokenizer: Arc<dyn Tokenizer>,
    sentence_chunker: SentenceChunker,
    token_chunker: TokenChunker,
}

impl RecursiveChunker {
    /// Create a new recursive chunker with the default tokenizer.
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

    /// Interleave overlap fillers between adjacent chunks.
    fn smooth(chunks: Vec<Chunk>, overlap: usize, label: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let mut smoothed = Vec::with_capacity(chunks.len() * 2);
        let mut iter = chunks.into_iter().enumerate().peekable();

        while let Some((i, current)) = iter.next() {
            smoothed.push(current);
            let Some((_, next)) = iter.peek() else {
                break;
            };

            let filler: String = next.content.chars().take(overlap).collect();
            if filler.is_empty() {
                continue;
            }
            let metadata = MetadataBuilder::new("text", "overlap").base(options).build();
            let start = next.start;
            let end = start + filler.len();
            smoothed.push(
                Chunk::new(format!("{}-overlap-{}", label, i), filler, start, end)
                    .with_label(format!("{}-overlap", label))
                    .with_metadata(metadata),
            );
        }

        smoothed
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for RecursiveChunker {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn description(&self) -> &'static str {
        "Splits by paragraphs, then sentences, then tokens until chunks fit the budget"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let overlap_tokens = options.overlap_tokens.unwrap_or(0);
        let label = options.label_or("recursive");

        let paragraphs = split_into_paragraphs(text, tokenizer.as_ref());
        if paragraphs.is_empty() {
            return vec![];
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let next_id = |chunks: &Vec<Chunk>| format!("recursive-{}", chunks.len());

        for (paragraph_index, paragraph) in paragraphs.iter().enumerate() {
            let origin = |source_type: &str| {
                MetadataBuilder::new("text", source_type)
                    .base(options)
                    .extra("paragraphIndex", paragraph_index)
                    .build()
            };

            if paragraph.tokens <= max_tokens {
                let chunk = Chunk::new(next_id(&chunks), paragraph.text.as_str(), paragraph.start, paragraph.end)
                    .with_tokens(paragraph.tokens)
                    .with_label(label.as_str())
                    .with_metadata(origin("paragraph"));
                chunks.push(chunk);
                continue;
            }

            let mut sentence_opts = options.delegate(max_tokens, &tokenizer, format!("{}-sentence", label));
            sentence_opts.overlap_sentences = Some(1);
            let groups = self.sentence_chunker.chunk(&paragraph.text, &sentence_opts);

            for group in groups {
                if group.tokens.unwrap_or(0) <= max_tokens {
                    let mut metadata = group.metadata.clone();
                    metadata.merge(origin("sentence"));
                    let chunk = Chunk {
                        id: next_id(&chunks),
                        metadata,
                        ..group.shifted(paragraph.start)
                    };
                    chunks.push(chunk);
                    continue;
                }

                // Sentence group still over budget: fall back to token windows.
                let mut token_opts = options.delegate(max_tokens, &tokenizer, format!("{}-token", label));
                token_opts.overlap = Some(overlap_tokens);
                let base = paragraph.start + group.start;
                for piece in self.token_chunker.chunk(&group.content, &token_opts) {
                    let mut metadata = piece.metadata.clone();
                    metadata.merge(origin("sentence-token"));
                    let chunk = Chunk {
                        id: next_id(&chunks),
                        metadata,
                        ..piece.shifted(base)
                    };
                    chunks.push(chunk);
                }
            }
        }

        if overlap_tokens > 0 && chunks.len() > 1 {
            return Self::smooth(chunks, overlap_tokens, &label, options);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WhitespaceTokenizer;

    fn whitespace_chunker() -> RecursiveChunker {
        RecursiveChunker::with_tokenizer(Arc::new(WhitespaceTokenizer))
    }

    #[test]
    fn test_small_text() {
        let chunker = RecursiveChunker::new();
        let chunks = chunker.chunk("Hello, world!", &ChunkOptions::with_max_tokens(100));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].metadata.source_type(), Some("paragraph"));
    }

    #[test]
    fn test_paragraph_splitting() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = whitespace_chunker().chunk(text, &ChunkOptions::with_max_tokens(20));
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("recursive-{}", i));
            assert_eq!(&text[chunk.start..chunk.end], chunk.content);
            assert_eq!(chunk.metadata.get_usize("paragraphIndex"), Some(i));
        }
    }

    #[test]
    fn test_sentence_fallback_translates_offsets() {
        let text = "Intro.\n\nFirst sentence here. Second sentence here. Third sentence here.";
        let chunks = whitespace_chunker().chunk(text, &ChunkOptions::with_max_tokens(6));

        assert_eq!(chunks[0].content, "Intro.");
        let sentence_chunks: Vec<_> = chunks
            .iter()
            .filter(|c| c.metadata.source_type() == Some("sentence"))
            .collect();
        assert!(sentence_chunks.len() >= 2);
        for chunk in &sentence_chunks {
            assert_eq!(&text[chunk.start..chunk.end], chunk.content);
            assert_eq!(chunk.label.as_deref(), Some("recursive-sentence"));
        }
    }

    #[test]
    fn test_token_fallback_for_long_sentence() {
        let text = "Lead.\n\none two three four five six seven eight nine ten";
        let chunks = whitespace_chunker().chunk(text, &ChunkOptions::with_max_tokens(4));

        let token_chunks: Vec<_> = chunks
            .iter()
            .filter(|c| c.metadata.source_type() == Some("sentence-token"))
            .collect();
        assert_eq!(token_chunks.len(), 3);
        for chunk in &token_chunks {
            assert_eq!(&text[chunk.start..chunk.end], chunk.content);
            assert!(chunk.tokens.unwrap() <= 4);
        }

        let ids: Vec<_> = chunks.iter().map(|c| c.id.clone()).collect();
        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(ids, unique);
    }

    #[test]
    fn test_overlap_fillers() {
        let text = "Alpha beta.\n\nGamma delta.";
        let opts = ChunkOptions::with_max_tokens(10).overlap_tokens(3).label("doc");
        let chunks = whitespace_chunker().chunk(text, &opts);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, "Gam");
        assert_eq!(chunks[1].id, "doc-overlap-0");
        assert_eq!(chunks[1].label.as_deref(), Some("doc-overlap"));
        assert_eq!(chunks[1].start, chunks[2].start);
    }

    #[test]
    fn test_caller_identifiers_propagate() {
        let opts = ChunkOptions::with_max_tokens(50).doc_id("doc-9").base_metadata("team", "kb");
        let chunks = whitespace_chunker().chunk("Some text.", &opts);
        assert_eq!(chunks[0].metadata.doc_id(), Some("doc-9"));
        assert_eq!(chunks[0].metadata.get_str("team"), Some("kb"));
    }
}
