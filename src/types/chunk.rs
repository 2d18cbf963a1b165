//! Chunk type definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved metadata keys.
pub const FORMAT_KEY: &str = "format";
pub const SOURCE_TYPE_KEY: &str = "sourceType";
pub const PATH_KEY: &str = "path";
pub const DOC_ID_KEY: &str = "docId";
pub const SOURCE_ID_KEY: &str = "sourceId";

/// A chunk of content extracted from a text segment.
///
/// `start`/`end` are byte offsets into the segment that was chunked. Chunks
/// produced by merging (late windows, semantic merges, slumber buffers) carry a
/// concatenated `content` and the bounds of the merged span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of this chunk, unique within one chunker invocation
    pub id: String,

    /// The text content of the chunk
    pub content: String,

    /// Starting byte offset in the chunked segment
    pub start: usize,

    /// Ending byte offset (exclusive) in the chunked segment
    pub end: usize,

    /// Number of tokens in this chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<usize>,

    /// Producer label, e.g. "recursive" or "markdown-code"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Canonical metadata map
    #[serde(default)]
    pub metadata: ChunkMetadata,

    /// Optional relevance score assigned downstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Chunk {
    /// Create a new chunk covering `[start, end)`.
    pub fn new(id: impl Into<String>, content: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            start,
            end,
            tokens: None,
            label: None,
            metadata: ChunkMetadata::default(),
            score: None,
        }
    }

    /// Set the token count.
    pub fn with_tokens(mut self, tokens: usize) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replace the metadata.
    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Shift both offsets by `base`, translating them into an outer segment.
    pub fn shifted(mut self, base: usize) -> Self {
        self.start += base;
        self.end += base;
        self
    }

    /// Get the length of the chunk content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Free-form chunk metadata with reserved keys.
///
/// Reserved keys are `format`, `sourceType`, `path`, `docId` and `sourceId`;
/// everything else is chunker specific (`blockKind`, `headingPath`,
/// `tokenStart`, `position`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkMetadata(Map<String, Value>);

impl ChunkMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a string-valued entry.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Get an unsigned integer entry.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
    }

    /// Get a list-of-strings entry such as `headingPath` or `blockPath`.
    pub fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        self.0.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Insert only when the key is absent.
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<Value>) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_string(), value.into());
        }
    }

    /// Overlay every entry of `other`, overwriting existing keys.
    pub fn merge(&mut self, other: ChunkMetadata) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Copy of this map without the `format`/`sourceType` pair, used when a
    /// chunker re-tags a delegate's chunk with its own origin.
    pub fn without_origin(&self) -> ChunkMetadata {
        let mut copy = self.clone();
        copy.0.remove(FORMAT_KEY);
        copy.0.remove(SOURCE_TYPE_KEY);
        copy
    }

    pub fn format(&self) -> Option<&str> {
        self.get_str(FORMAT_KEY)
    }

    pub fn source_type(&self) -> Option<&str> {
        self.get_str(SOURCE_TYPE_KEY)
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.get_str(DOC_ID_KEY)
    }

    pub fn source_id(&self) -> Option<&str> {
        self.get_str(SOURCE_ID_KEY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ChunkMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_serializes_as_plain_object() {
        let mut meta = ChunkMetadata::new();
        meta.insert("format", "text");
        meta.insert("tokenStart", 3);
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({"format": "text", "tokenStart": 3}));
    }

    #[test]
    fn test_without_origin_keeps_extras() {
        let mut meta = ChunkMetadata::new();
        meta.insert(FORMAT_KEY, "text");
        meta.insert(SOURCE_TYPE_KEY, "token");
        meta.insert("tokenEnd", 7);
        let stripped = meta.without_origin();
        assert!(stripped.format().is_none());
        assert!(stripped.source_type().is_none());
        assert_eq!(stripped.get_usize("tokenEnd"), Some(7));
    }

    #[test]
    fn test_shifted_translates_offsets() {
        let chunk = Chunk::new("c-0", "abc", 2, 5).shifted(10);
        assert_eq!((chunk.start, chunk.end), (12, 15));
    }
}
