//! Semantic chunker that merges neighbouring sentence groups by embedding similarity.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::base::{AsyncChunker, Chunker};
use super::sentence_chunker::SentenceChunker;
use crate::error::ChunkError;
use crate::text::{average_embedding, cosine_similarity, default_tokenizer, LineMap, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions, DOC_ID_KEY, SOURCE_ID_KEY};
use crate::{DEFAULT_MAX_TOKENS, DEFAULT_SIMILARITY_THRESHOLD};

/// A seed chunk together with its (possibly averaged) embedding.
struct Unit {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Semantic chunker driven by an injected [`SemanticEmbedder`](super::SemanticEmbedder).
///
/// Seeds come from the sentence chunker. A single left-to-right pass merges
/// the running unit with the next one while their cosine similarity reaches
/// the threshold and the combined token count stays within 1.5x the budget.
/// Merged content is newline-joined and spans from the first unit's start to
/// the last unit's end.
pub struct SemanticChunker {
    tokenizer: Arc<dyn Tokenizer>,
    sentence_chunker: SentenceChunker,
}

impl SemanticChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            sentence_chunker: SentenceChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }

    pub fn name(&self) -> &'static str {
        "semantic"
    }
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncChunker for SemanticChunker {
    async fn chunk_async(&self, text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>, ChunkError> {
        let embedder = options
            .embedder
            .clone()
            .ok_or_else(|| ChunkError::missing("SemanticChunker", "an embedder"))?;

        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let threshold = options
            .similarity_threshold
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        let merge_budget = max_tokens as f32 * 1.5;
        let label = options.label_or("semantic");

        let seed_opts = options.delegate(max_tokens, &tokenizer, format!("{}-seed", label));
        let seeds = self.sentence_chunker.chunk(text, &seed_opts);
        let seed_count = seeds.len();

        // Embeddings are requested one at a time, in document order.
        let mut units = Vec::with_capacity(seeds.len());
        for chunk in seeds {
            let embedding = embedder.embed(&chunk.content).await?;
            units.push(Unit { chunk, embedding });
        }

        let mut units = units.into_iter();
        let Some(mut current) = units.next() else {
            return Ok(vec![]);
        };

        let mut merged: Vec<Chunk> = Vec::new();
        for candidate in units {
            let similarity = cosine_similarity(&current.embedding, &candidate.embedding);
            let current_tokens = current
                .chunk
                .tokens
                .unwrap_or_else(|| tokenizer.count_tokens(&current.chunk.content));
            let candidate_tokens = candidate
                .chunk
                .tokens
                .unwrap_or_else(|| tokenizer.count_tokens(&candidate.chunk.content));
            let combined = current_tokens + candidate_tokens;

            if similarity >= threshold && combined as f32 <= merge_budget {
                let mut chunk = current.chunk;
                chunk.content = format!("{}\n{}", chunk.content, candidate.chunk.content);
                chunk.end = candidate.chunk.end;
                chunk.tokens = Some(combined);
                chunk.metadata.insert("merged", true);
                chunk.metadata.insert("similarity", similarity);
                current = Unit {
                    chunk,
                    embedding: average_embedding(&current.embedding, &candidate.embedding),
                };
            } else {
                merged.push(current.chunk);
                current = candidate;
            }
        }
        merged.push(current.chunk);

        debug!(seeds = seed_count, chunks = merged.len(), threshold, "Semantic merge complete");

        let line_map = LineMap::new(text);
        let chunks = merged
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let mut metadata = MetadataBuilder::new("text", "semantic")
                    .base(options)
                    .extras(chunk.metadata.without_origin())
                    .extra("chunkIndex", index)
                    .extra("position", line_map.position(chunk.start, chunk.end))
                    .build();
                if let Some(doc_id) = &options.doc_id {
                    metadata.insert(DOC_ID_KEY, doc_id.as_str());
                }
                if let Some(source_id) = &options.source_id {
                    metadata.insert(SOURCE_ID_KEY, source_id.as_str());
                }
                Chunk {
                    id: format!("{}-{}", label, index),
                    label: Some(label.clone()),
                    metadata,
                    ..chunk
                }
            })
            .collect();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::{FnEmbedder, SemanticEmbedder};
    use crate::text::WhitespaceTokenizer;
    use pretty_assertions::assert_eq;

    fn chunker() -> SemanticChunker {
        SemanticChunker::with_tokenizer(Arc::new(WhitespaceTokenizer))
    }

    fn topic_embedder() -> Arc<dyn SemanticEmbedder> {
        FnEmbedder::shared(|text: &str| {
            let lower = text.to_lowercase();
            if lower.contains("cat") || lower.contains("feline") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            }
        })
    }

    struct FailingEmbedder;

    #[async_trait]
    impl SemanticEmbedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ChunkError> {
            Err(ChunkError::Embedding("backend unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_merges_similar_neighbours() {
        let text = "Cats purr softly. Felines nap often. Stock prices fell.";
        let opts = ChunkOptions::with_max_tokens(4)
            .similarity_threshold(0.7)
            .embedder(topic_embedder());

        let chunks = chunker().chunk_async(text, &opts).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Cats purr softly.\nFelines nap often.");
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 36);
        assert_eq!(chunks[0].tokens, Some(6));
        assert_eq!(chunks[0].metadata.get("merged"), Some(&serde_json::json!(true)));
        assert_eq!(chunks[1].content, "Stock prices fell.");
        assert!(!chunks[1].metadata.contains_key("merged"));
    }

    #[tokio::test]
    async fn test_output_tags_and_ids() {
        let opts = ChunkOptions::with_max_tokens(4)
            .doc_id("doc-9")
            .base_metadata("team", "search")
            .embedder(topic_embedder());

        let chunks = chunker()
            .chunk_async("Cats purr. Dogs bark loudly here.", &opts)
            .await
            .unwrap();

        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["semantic-0", "semantic-1"]);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.source_type(), Some("semantic"));
            assert_eq!(chunk.metadata.get_usize("chunkIndex"), Some(index));
            assert_eq!(chunk.metadata.doc_id(), Some("doc-9"));
            assert_eq!(chunk.metadata.get_str("team"), Some("search"));
            assert_eq!(chunk.label.as_deref(), Some("semantic"));
        }
    }

    #[tokio::test]
    async fn test_merge_respects_token_ceiling() {
        let text = "Cats purr softly. Felines nap often.";
        let opts = ChunkOptions::with_max_tokens(3)
            .similarity_threshold(0.5)
            .embedder(topic_embedder());

        let chunks = chunker().chunk_async(text, &opts).await.unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_requires_embedder() {
        let err = tokio_test::block_on(chunker().chunk_async("Some text.", &ChunkOptions::new())).unwrap_err();
        assert_eq!(err, ChunkError::missing("SemanticChunker", "an embedder"));
    }

    #[tokio::test]
    async fn test_embedder_failure_propagates() {
        let opts = ChunkOptions::new().embedder(Arc::new(FailingEmbedder));
        let err = chunker().chunk_async("One. Two.", &opts).await.unwrap_err();
        assert!(matches!(err, ChunkError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let opts = ChunkOptions::new().embedder(topic_embedder());
        assert!(chunker().chunk_async("   ", &opts).await.unwrap().is_empty());
    }
}
