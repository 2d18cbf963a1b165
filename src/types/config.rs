//! Configuration types for chunking.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::ast_engine::CodeParser;
use crate::chunkers::{BoundaryDetector, SemanticEmbedder};
use crate::router::Strategy;
use crate::text::Tokenizer;
use crate::{DEFAULT_LATE_STRIDE, DEFAULT_LATE_WINDOW, DEFAULT_SIMILARITY_THRESHOLD};

/// Process-level chunking configuration.
///
/// Loaded from `CHUNKER_*` environment variables, optionally seeded from a
/// `.env` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Strategy used when a caller does not name one ("auto" by default)
    pub default_strategy: String,

    /// Token budget applied to every call; each chunker keeps its own default when unset
    pub max_tokens: Option<usize>,

    /// BPE encoding for the default tokenizer ("whitespace" selects the whitespace tokenizer)
    pub encoding: String,

    /// Cosine similarity needed to merge neighbouring semantic units
    pub similarity_threshold: f32,

    /// Base chunks per late-chunking window
    pub window_size: usize,

    /// Base chunks to advance between late-chunking windows
    pub stride: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            default_strategy: "auto".to_string(),
            max_tokens: None,
            encoding: "cl100k_base".to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            window_size: DEFAULT_LATE_WINDOW,
            stride: DEFAULT_LATE_STRIDE,
        }
    }
}

impl ChunkingConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_environment().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid chunker configuration, using defaults");
            Self::default()
        })
    }

    /// Load configuration after reading the given `.env` file.
    pub fn from_env_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::from_path(path.as_ref())?;
        Ok(Self::from_environment()?)
    }

    fn from_environment() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("CHUNKER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// The configured default strategy.
    pub fn strategy(&self) -> Strategy {
        Strategy::from(self.default_strategy.as_str())
    }

    /// Per-call options seeded from this configuration.
    pub fn options(&self) -> ChunkOptions {
        ChunkOptions {
            max_tokens: self.max_tokens,
            similarity_threshold: Some(self.similarity_threshold),
            window_size: Some(self.window_size),
            stride: Some(self.stride),
            ..Default::default()
        }
    }
}

/// Options for an individual chunk call.
///
/// Every numeric option is optional; each chunker applies its own default and
/// clamps out-of-range values instead of rejecting them.
#[derive(Clone, Default)]
pub struct ChunkOptions {
    /// Maximum tokens per chunk
    pub max_tokens: Option<usize>,

    /// Tokens shared between consecutive token windows
    pub overlap: Option<usize>,

    /// Overlap filler size for recursive and slumber smoothing
    pub overlap_tokens: Option<usize>,

    /// Sentences carried over between sentence groups
    pub overlap_sentences: Option<usize>,

    /// Minimum buffered tokens before a slumber flush
    pub min_tokens: Option<usize>,

    /// Label stamped on produced chunks
    pub label: Option<String>,

    /// Tokenizer overriding the chunker's own
    pub tokenizer: Option<Arc<dyn Tokenizer>>,

    /// Caller-assigned document identifier
    pub doc_id: Option<String>,

    /// Caller-assigned source identifier
    pub source_id: Option<String>,

    /// Free-form metadata that only fills gaps
    pub base_metadata: Map<String, Value>,

    /// Embedder for semantic chunking
    pub embedder: Option<Arc<dyn SemanticEmbedder>>,

    /// Boundary detector for neural chunking
    pub detector: Option<Arc<dyn BoundaryDetector>>,

    /// Parser overriding the registry lookup for code segments
    pub parser: Option<Arc<dyn CodeParser>>,

    /// Base chunks per late window
    pub window_size: Option<usize>,

    /// Base chunks advanced between late windows
    pub stride: Option<usize>,

    /// Similarity needed for a semantic merge
    pub similarity_threshold: Option<f32>,
}

impl ChunkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options with the given token budget.
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }

    pub fn overlap(mut self, overlap: usize) -> Self {
        self.overlap = Some(overlap);
        self
    }

    pub fn overlap_tokens(mut self, overlap_tokens: usize) -> Self {
        self.overlap_tokens = Some(overlap_tokens);
        self
    }

    pub fn overlap_sentences(mut self, overlap_sentences: usize) -> Self {
        self.overlap_sentences = Some(overlap_sentences);
        self
    }

    pub fn min_tokens(mut self, min_tokens: usize) -> Self {
        self.min_tokens = Some(min_tokens);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    pub fn source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn base_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.base_metadata.insert(key.into(), value.into());
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn SemanticEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn BoundaryDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn CodeParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = Some(window_size);
        self
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Token budget clamped to at least 1.
    pub fn max_tokens_or(&self, default: usize) -> usize {
        self.max_tokens.unwrap_or(default).max(1)
    }

    /// Label or the chunker's default.
    pub fn label_or(&self, default: &str) -> String {
        self.label.clone().unwrap_or_else(|| default.to_string())
    }

    /// Tokenizer from the options, falling back to `fallback`.
    pub fn tokenizer_or(&self, fallback: &Arc<dyn Tokenizer>) -> Arc<dyn Tokenizer> {
        self.tokenizer.clone().unwrap_or_else(|| Arc::clone(fallback))
    }

    /// Options for a delegate call: identifiers, base metadata and tokenizer
    /// carry over, everything else is reset.
    pub fn delegate(&self, max_tokens: usize, tokenizer: &Arc<dyn Tokenizer>, label: String) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            label: Some(label),
            tokenizer: Some(Arc::clone(tokenizer)),
            doc_id: self.doc_id.clone(),
            source_id: self.source_id.clone(),
            base_metadata: self.base_metadata.clone(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for ChunkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkOptions")
            .field("max_tokens", &self.max_tokens)
            .field("overlap", &self.overlap)
            .field("overlap_tokens", &self.overlap_tokens)
            .field("overlap_sentences", &self.overlap_sentences)
            .field("min_tokens", &self.min_tokens)
            .field("label", &self.label)
            .field("doc_id", &self.doc_id)
            .field("source_id", &self.source_id)
            .field("base_metadata", &self.base_metadata)
            .field("window_size", &self.window_size)
            .field("stride", &self.stride)
            .field("similarity_threshold", &self.similarity_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_max_tokens_clamped() {
        assert_eq!(ChunkOptions::with_max_tokens(0).max_tokens_or(200), 1);
        assert_eq!(ChunkOptions::new().max_tokens_or(200), 200);
    }

    #[test]
    fn test_delegate_keeps_identifiers() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(crate::text::WhitespaceTokenizer);
        let opts = ChunkOptions::with_max_tokens(10)
            .overlap(3)
            .doc_id("doc-1")
            .base_metadata("team", "search");
        let delegated = opts.delegate(5, &tokenizer, "inner".to_string());
        assert_eq!(delegated.max_tokens, Some(5));
        assert_eq!(delegated.overlap, None);
        assert_eq!(delegated.doc_id.as_deref(), Some("doc-1"));
        assert_eq!(delegated.base_metadata.get("team"), Some(&Value::from("search")));
    }

    #[test]
    fn test_config_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CHUNKER_WINDOW_SIZE=4").unwrap();
        writeln!(file, "CHUNKER_DEFAULT_STRATEGY=markdown").unwrap();

        let config = ChunkingConfig::from_env_file(file.path()).unwrap();
        assert_eq!(config.window_size, 4);
        assert_eq!(config.strategy(), Strategy::Markdown);
        assert_eq!(config.stride, DEFAULT_LATE_STRIDE);
    }
}
