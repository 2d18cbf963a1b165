//! Canonical metadata assembly shared by every chunker.

use serde_json::Value;

use crate::types::{
    ChunkMetadata, ChunkOptions, DOC_ID_KEY, FORMAT_KEY, PATH_KEY, SOURCE_ID_KEY, SOURCE_TYPE_KEY,
};

/// Builds chunk metadata in a fixed merge order:
///
/// 1. `format` and `sourceType`
/// 2. `path`, when non-empty
/// 3. caller `docId`/`sourceId`, when not already present
/// 4. caller `baseMetadata`, filling gaps only
/// 5. chunker extras, always winning
#[derive(Debug, Clone)]
pub struct MetadataBuilder<'a> {
    format: &'a str,
    source_type: &'a str,
    path: Vec<String>,
    base: Option<&'a ChunkOptions>,
    extra: ChunkMetadata,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(format: &'a str, source_type: &'a str) -> Self {
        Self {
            format,
            source_type,
            path: Vec::new(),
            base: None,
            extra: ChunkMetadata::new(),
        }
    }

    pub fn path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Caller identifiers and free-form metadata.
    pub fn base(mut self, options: &'a ChunkOptions) -> Self {
        self.base = Some(options);
        self
    }

    /// Merge a whole map of extras.
    pub fn extras(mut self, extra: ChunkMetadata) -> Self {
        self.extra.merge(extra);
        self
    }

    /// Add a single extra field.
    pub fn extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn build(self) -> ChunkMetadata {
        let mut meta = ChunkMetadata::new();
        meta.insert(FORMAT_KEY, self.format);
        meta.insert(SOURCE_TYPE_KEY, self.source_type);

        if !self.path.is_empty() {
            meta.insert(PATH_KEY, self.path);
        }

        if let Some(base) = self.base {
            if let Some(doc_id) = &base.doc_id {
                meta.insert_if_absent(DOC_ID_KEY, doc_id.as_str());
            }
            if let Some(source_id) = &base.source_id {
                meta.insert_if_absent(SOURCE_ID_KEY, source_id.as_str());
            }
            for (key, value) in &base.base_metadata {
                meta.insert_if_absent(key, value.clone());
            }
        }

        meta.merge(self.extra);
        meta
    }
}

/// Shorthand for the common `format`/`sourceType`/base/extra case.
pub fn build_metadata(
    format: &str,
    source_type: &str,
    options: &ChunkOptions,
    extra: ChunkMetadata,
) -> ChunkMetadata {
    MetadataBuilder::new(format, source_type)
        .base(options)
        .extras(extra)
        .build()
}
