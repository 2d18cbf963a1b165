//! Base traits for all chunkers and their injected collaborators.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ChunkError;
use crate::types::{Chunk, ChunkOptions};

/// The core trait that all synchronous chunkers implement.
///
/// A chunker splits text into ordered, bounded-size chunks suitable for
/// embedding and retrieval. Chunking never fails: empty input yields no
/// chunks and out-of-range options are clamped.
pub trait Chunker: Send + Sync {
    /// Get the name of this chunker.
    fn name(&self) -> &'static str;

    /// Chunk the given text with the provided options.
    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk>;

    /// Get the description of this chunker.
    fn description(&self) -> &'static str {
        "A text chunker"
    }
}

/// Chunkers that may await a collaborator.
///
/// Every [`Chunker`] is also an `AsyncChunker`, so wrappers such as the late
/// chunker accept either kind.
#[async_trait]
pub trait AsyncChunker: Send + Sync {
    async fn chunk_async(&self, text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>, ChunkError>;
}

#[async_trait]
impl<T> AsyncChunker for T
where
    T: Chunker + ?Sized,
{
    async fn chunk_async(&self, text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>, ChunkError> {
        Ok(self.chunk(text, options))
    }
}

/// Produces an embedding vector for a piece of text.
#[async_trait]
pub trait SemanticEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ChunkError>;
}

/// Returns candidate split offsets (bytes) within a text.
#[async_trait]
pub trait BoundaryDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Vec<usize>, ChunkError>;
}

/// Adapts a synchronous closure into a [`SemanticEmbedder`].
pub struct FnEmbedder<F>(pub F);

impl<F> FnEmbedder<F>
where
    F: Fn(&str) -> Vec<f32> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }

    pub fn shared(f: F) -> Arc<dyn SemanticEmbedder> {
        Arc::new(Self(f))
    }
}

#[async_trait]
impl<F> SemanticEmbedder for FnEmbedder<F>
where
    F: Fn(&str) -> Vec<f32> + Send + Sync,
{
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ChunkError> {
        Ok((self.0)(text))
    }
}

/// Adapts a synchronous closure into a [`BoundaryDetector`].
pub struct FnDetector<F>(pub F);

impl<F> FnDetector<F>
where
    F: Fn(&str) -> Vec<usize> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }

    pub fn shared(f: F) -> Arc<dyn BoundaryDetector> {
        Arc::new(Self(f))
    }
}

#[async_trait]
impl<F> BoundaryDetector for FnDetector<F>
where
    F: Fn(&str) -> Vec<usize> + Send + Sync,
{
    async fn detect(&self, text: &str) -> Result<Vec<usize>, ChunkError> {
        Ok((self.0)(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Chunker for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn chunk(&self, text: &str, _options: &ChunkOptions) -> Vec<Chunk> {
            vec![Chunk::new("echo-0", text, 0, text.len())]
        }
    }

    #[tokio::test]
    async fn test_sync_chunker_is_async_chunker() {
        let chunker: Arc<dyn AsyncChunker> = Arc::new(Echo);
        let chunks = chunker.chunk_async("hi", &ChunkOptions::new()).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hi");
    }

    #[tokio::test]
    async fn test_fn_adapters() {
        let embedder = FnEmbedder::shared(|text: &str| vec![text.len() as f32]);
        assert_eq!(embedder.embed("abc").await.unwrap(), vec![3.0]);

        let detector = FnDetector::shared(|text: &str| vec![text.len() / 2]);
        assert_eq!(detector.detect("abcd").await.unwrap(), vec![2]);
    }
}
