//! Late chunking: merge already-produced base chunks into sliding windows.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::base::AsyncChunker;
use super::recursive_chunker::RecursiveChunker;
use crate::error::ChunkError;
use crate::text::MetadataBuilder;
use crate::types::{Chunk, ChunkOptions};
use crate::{DEFAULT_LATE_STRIDE, DEFAULT_LATE_WINDOW};

/// Wraps a base chunker and merges `window_size` consecutive base chunks,
/// advancing by `stride`. Both are clamped to at least 1.
pub struct LateChunker {
    base: Arc<dyn AsyncChunker>,
}

impl LateChunker {
    /// Late chunker over a [`RecursiveChunker`].
    pub fn new() -> Self {
        Self::with_base(Arc::new(RecursiveChunker::new()))
    }

    pub fn with_base(base: Arc<dyn AsyncChunker>) -> Self {
        Self { base }
    }

    pub fn name(&self) -> &'static str {
        "late"
    }
}

impl Default for LateChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncChunker for LateChunker {
    async fn chunk_async(&self, text: &str, options: &ChunkOptions) -> Result<Vec<Chunk>, ChunkError> {
        let window_size = options.window_size.unwrap_or(DEFAULT_LATE_WINDOW).max(1);
        let stride = options.stride.unwrap_or(DEFAULT_LATE_STRIDE).max(1);
        let label = options.label_or("late");

        let mut base_opts = options.clone();
        base_opts.label = None;
        let base_chunks = self.base.chunk_async(text, &base_opts).await?;

        let mut merged = Vec::new();
        for start in (0..base_chunks.len()).step_by(stride) {
            let window = &base_chunks[start..(start + window_size).min(base_chunks.len())];
            let (Some(first), Some(last)) = (window.first(), window.last()) else {
                continue;
            };

            let content = window
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let merged_from: Vec<&str> = window.iter().map(|c| c.id.as_str()).collect();
            let metadata = MetadataBuilder::new("late", "late-window")
                .base(options)
                .extra("mergedFrom", json!(merged_from))
                .build();

            merged.push(
                Chunk::new(format!("{}-{}", label, merged.len()), content, first.start, last.end)
                    .with_tokens(window.iter().filter_map(|c| c.tokens).sum())
                    .with_label(label.as_str())
                    .with_metadata(metadata),
            );
        }

        Ok(merged)
    }
}
