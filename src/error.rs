//! Error types for the chunking pipeline.
//!
//! Synchronous chunkers never fail: empty input yields no chunks and
//! out-of-range options are clamped. Only chunkers that depend on an injected
//! collaborator (embedder, boundary detector) can return an error.

use thiserror::Error;

/// Errors raised by chunkers that depend on external collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// A chunker was invoked without the collaborator it requires.
    #[error("{chunker} requires {collaborator}")]
    MissingCollaborator {
        chunker: &'static str,
        collaborator: &'static str,
    },

    /// The injected embedder reported a failure.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The injected boundary detector reported a failure.
    #[error("boundary detection failed: {0}")]
    Detection(String),

    /// A tokenizer could not be constructed.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

impl ChunkError {
    pub(crate) fn missing(chunker: &'static str, collaborator: &'static str) -> Self {
        Self::MissingCollaborator {
            chunker,
            collaborator,
        }
    }
}
