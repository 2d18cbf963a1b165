//! JSON chunker that flattens documents into `path: value` lines.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::base::Chunker;
use super::TokenChunker;
use crate::text::{default_tokenizer, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

const SAMPLE_PATHS: usize = 5;

/// A scalar leaf and its dotted key path.
#[derive(Debug, Clone, PartialEq)]
struct PathValue {
    path: String,
    value: String,
    line: usize,
}

/// Depth-first walk producing one entry per scalar leaf, in document order.
fn walk(value: &Value, path: &mut Vec<String>, acc: &mut Vec<PathValue>) {
    let leaf = match value {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                path.push(idx.to_string());
                walk(item, path, acc);
                path.pop();
            }
            return;
        }
        Value::Object(map) => {
            for (key, item) in map {
                path.push(key.clone());
                walk(item, path, acc);
                path.pop();
            }
            return;
        }
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    acc.push(PathValue {
        path: path.join("."),
        value: leaf,
        line: acc.len() + 1,
    });
}

/// JSON chunker.
///
/// Invalid JSON is not an error: the raw text is token-chunked instead and
/// the chunks are marked with `jsonFallback: true`.
pub struct JsonChunker {
    tokenizer: Arc<dyn Tokenizer>,
    token_chunker: TokenChunker,
}

impl JsonChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            token_chunker: TokenChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }
}

impl Default for JsonChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for JsonChunker {
    fn name(&self) -> &'static str {
        "json"
    }

    fn description(&self) -> &'static str {
        "Flattens JSON into path: value lines and chunks them by tokens"
    }

    fn chunk(&self, json: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("json");
        let opts = options.delegate(max_tokens, &tokenizer, label.clone());

        let parsed: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Input is not valid JSON, chunking as text");
                return self
                    .token_chunker
                    .chunk(json, &opts)
                    .into_iter()
                    .enumerate()
                    .map(|(idx, chunk)| {
                        let metadata = MetadataBuilder::new("json", "token")
                            .base(options)
                            .extras(chunk.metadata.without_origin())
                            .extra("jsonFallback", true)
                            .build();
                        Chunk {
                            id: format!("{}-{}", label, idx),
                            metadata,
                            ..chunk
                        }
                    })
                    .collect();
            }
        };

        let mut leaves = Vec::new();
        walk(&parsed, &mut Vec::new(), &mut leaves);
        if leaves.is_empty() {
            return vec![];
        }

        let combined = leaves
            .iter()
            .map(|pv| format!("{}: {}", pv.path, pv.value))
            .collect::<Vec<_>>()
            .join("\n");
        let samples: Vec<Value> = leaves
            .iter()
            .take(SAMPLE_PATHS)
            .map(|pv| json!({ "path": pv.path, "line": pv.line }))
            .collect();

        self.token_chunker
            .chunk(&combined, &opts)
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let metadata = MetadataBuilder::new("json", "json")
                    .base(options)
                    .extras(chunk.metadata.without_origin())
                    .extra("fields", leaves.len())
                    .extra("samplePaths", samples.clone())
                    .build();
                Chunk {
                    id: format!("{}-{}", label, idx),
                    metadata,
                    ..chunk
                }
            })
            .collect()
    }
}
