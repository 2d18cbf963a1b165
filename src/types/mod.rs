//! Core types for the chunking pipeline.

mod chunk;
mod config;
mod document;

pub use chunk::{
    Chunk, ChunkMetadata, DOC_ID_KEY, FORMAT_KEY, PATH_KEY, SOURCE_ID_KEY, SOURCE_TYPE_KEY,
};
pub use config::{ChunkOptions, ChunkingConfig};
pub use document::{DocInput, DocNode, Link, LinkKind};
