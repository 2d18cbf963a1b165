//! Chunker that splits at offsets proposed by an injected boundary detector.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::base::{AsyncChunker, Chunker};
use super::token_chunker::TokenChunker;
use crate::error::ChunkError;
use crate::text::{default_tokenizer, floor_char_boundary, LineMap, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

/// Neural chunker driven by a [`BoundaryDetector`](super::BoundaryDetector).
///
/// Detector offsets outside `(0, len)` are ignored; the rest are snapped to
/// char boundaries, deduplicated and sorted, and the text length is appended
/// as the final boundary. Whitespace-only segments are dropped and segments
/// over budget are split by tokens.
pub struct NeuralChunker {
    tokenizer: Arc<dyn Tokenizer>,
    token_chunker: TokenChunker,
}

impl NeuralChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            token_chunker: TokenChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }

    pub fn name(&self) -> &'static str {
        "neural"
    }
}

impl Default for NeuralChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncChunker for NeuralChunker {
    async fn chunk_async(&self, text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>, ChunkError> {
        let detector = options
            .detector
            .clone()
            .ok_or_else(|| ChunkError::missing("NeuralChunker", "a boundary detector"))?;

        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("neural");

        let detected = detector.detect(text).await?;
        let mut boundaries: BTreeSet<usize> = detected
            .iter()
            .filter(|&&b| b > 0 && b < text.len())
            .map(|&b| floor_char_boundary(text, b))
            .filter(|&b| b > 0)
            .collect();
        boundaries.insert(text.len());
        debug!(detected = detected.len(), boundaries = boundaries.len(), "Neural boundaries normalized");

        let line_map = LineMap::new(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        for end in boundaries {
            let content = &text[start..end];
            let segment_start = start;
            start = end;
            if content.trim().is_empty() {
                continue;
            }

            let tokens = tokenizer.count_tokens(content);
            if tokens <= max_tokens {
                let metadata = MetadataBuilder::new("neural", "neural")
                    .base(options)
                    .extra("position", line_map.position(segment_start, end))
                    .build();
                chunks.push(
                    Chunk::new(format!("{}-{}", label, chunks.len()), content, segment_start, end)
                        .with_tokens(tokens)
                        .with_label(label.as_str())
                        .with_metadata(metadata),
                );
                continue;
            }

            let mut token_opts = options.delegate(max_tokens, &tokenizer, format!("{}-token", label));
            token_opts.overlap = Some(0);
            for piece in self.token_chunker.chunk(content, &token_opts) {
                let piece = piece.shifted(segment_start);
                let metadata = MetadataBuilder::new("neural", "neural-token")
                    .base(options)
                    .extras(piece.metadata.without_origin())
                    .extra("position", line_map.position(piece.start, piece.end))
                    .build();
                chunks.push(Chunk {
                    id: format!("{}-{}", label, chunks.len()),
                    metadata,
                    ..piece
                });
            }
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::FnDetector;
    use crate::text::WhitespaceTokenizer;
    use pretty_assertions::assert_eq;

    fn chunker() -> NeuralChunker {
        NeuralChunker::with_tokenizer(Arc::new(WhitespaceTokenizer))
    }

    #[tokio::test]
    async fn test_splits_at_detected_boundaries() {
        let text = "alpha beta gamma delta";
        let opts = ChunkOptions::new().detector(FnDetector::shared(|_: &str| vec![11, 0, 5, 11, 500]));

        let chunks = chunker().chunk_async(text, &opts).await.unwrap();

        let spans: Vec<_> = chunks.iter().map(|c| (c.content.as_str(), c.start, c.end)).collect();
        assert_eq!(spans, vec![("alpha", 0, 5), (" beta ", 5, 11), ("gamma delta", 11, 22)]);
        assert_eq!(chunks[2].id, "neural-2");
        assert_eq!(chunks[0].metadata.format(), Some("neural"));
    }

    #[tokio::test]
    async fn test_whitespace_segments_dropped() {
        let text = "one   two";
        let opts = ChunkOptions::new().detector(FnDetector::shared(|_: &str| vec![3, 6]));
        let chunks = chunker().chunk_async(text, &opts).await.unwrap();
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_oversized_segment_split_by_tokens() {
        let text = "head. a b c d e";
        let opts = ChunkOptions::with_max_tokens(2).detector(FnDetector::shared(|_: &str| vec![5]));

        let chunks = chunker().chunk_async(text, &opts).await.unwrap();

        let spans: Vec<_> = chunks.iter().map(|c| (c.content.as_str(), c.start, c.end)).collect();
        assert_eq!(spans, vec![("head.", 0, 5), ("a b", 6, 9), ("c d", 10, 13), ("e", 14, 15)]);
        assert_eq!(chunks[1].metadata.source_type(), Some("neural-token"));
        assert_eq!(chunks[1].metadata.format(), Some("neural"));
        assert_eq!(chunks[3].id, "neural-3");
        for chunk in &chunks {
            assert_eq!(&text[chunk.start..chunk.end], chunk.content);
        }
    }

    #[tokio::test]
    async fn test_multibyte_boundary_is_snapped() {
        let text = "héllo world";
        let opts = ChunkOptions::new().detector(FnDetector::shared(|_: &str| vec![2]));
        let chunks = chunker().chunk_async(text, &opts).await.unwrap();
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[tokio::test]
    async fn test_requires_detector() {
        let err = chunker().chunk_async("text", &ChunkOptions::new()).await.unwrap_err();
        assert_eq!(err, ChunkError::missing("NeuralChunker", "a boundary detector"));
    }
}
