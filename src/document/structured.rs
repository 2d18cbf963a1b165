//! Structured document aggregate: nodes, extraction, chunking and links.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::extractors::{extract_keywords, extract_questions, extract_summary, extract_title};
use crate::router::{chunk_by_strategy, ChunkingRouter, Strategy};
use crate::types::{Chunk, ChunkOptions, DocInput, DocNode, Link, LinkKind, DOC_ID_KEY};
use crate::DEFAULT_KEYWORD_COUNT;

/// Which extractors to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub title: bool,
    pub summary: bool,
    pub keywords: bool,
    pub questions: bool,
    /// Number of keywords kept
    pub keyword_count: usize,
}

impl ExtractOptions {
    /// Every extractor enabled.
    pub fn all() -> Self {
        Self {
            title: true,
            summary: true,
            keywords: true,
            questions: true,
            keyword_count: DEFAULT_KEYWORD_COUNT,
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            title: false,
            summary: false,
            keywords: false,
            questions: false,
            keyword_count: DEFAULT_KEYWORD_COUNT,
        }
    }
}

/// A set of document nodes with metadata extraction and chunk links.
///
/// Nodes are created once at construction and live as long as the document.
/// The link graph is derived from node links on every call.
pub struct StructuredDocument {
    nodes: Vec<DocNode>,
    router: Option<Arc<ChunkingRouter>>,
}

impl StructuredDocument {
    /// One node per input. Nodes without a `doc_id` get a generated `doc-<uuid>` id.
    pub fn new(docs: Vec<DocInput>) -> Self {
        let nodes = docs
            .into_iter()
            .map(|doc| {
                let mut metadata: Map<String, Value> = doc.metadata;
                if let Some(doc_id) = &doc.doc_id {
                    metadata.insert(DOC_ID_KEY.to_string(), Value::from(doc_id.as_str()));
                }
                DocNode {
                    id: doc.doc_id.unwrap_or_else(|| format!("doc-{}", Uuid::new_v4())),
                    text: doc.text,
                    metadata,
                    links: Vec::new(),
                }
            })
            .collect();

        Self { nodes, router: None }
    }

    /// A single-node document.
    pub fn from_text(text: impl Into<String>, metadata: Option<Map<String, Value>>) -> Self {
        Self::new(vec![DocInput::new(text).with_metadata(metadata.unwrap_or_default())])
    }

    /// Chunk through `router` instead of the process-wide default router.
    pub fn with_router(mut self, router: Arc<ChunkingRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn nodes(&self) -> &[DocNode] {
        &self.nodes
    }

    /// Record a typed link from `node_id` to `related_id`. Unknown node ids are ignored.
    pub fn add_link(&mut self, node_id: &str, related_id: impl Into<String>, kind: LinkKind) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.links.push(Link {
                node_id: related_id.into(),
                kind,
                metadata: None,
            });
        }
    }

    /// Run the selected extractors in order: title, summary, keywords, questions.
    pub fn extract(&mut self, options: &ExtractOptions) -> &mut Self {
        let mut nodes = std::mem::take(&mut self.nodes);
        if options.title {
            nodes = extract_title(nodes);
        }
        if options.summary {
            nodes = extract_summary(nodes);
        }
        if options.keywords {
            nodes = extract_keywords(nodes, options.keyword_count);
        }
        if options.questions {
            nodes = extract_questions(nodes);
        }
        self.nodes = nodes;
        self
    }

    /// Chunk every node with `strategy`.
    ///
    /// Each chunk's `docId` is set to its node id and a `chunk` link is
    /// recorded from the node to the chunk id.
    pub fn chunk(&mut self, strategy: Strategy, max_tokens: Option<usize>) -> Vec<Chunk> {
        let options = ChunkOptions {
            max_tokens,
            ..Default::default()
        };

        let mut all = Vec::new();
        for node in &mut self.nodes {
            let chunks = match &self.router {
                Some(router) => router.chunk(strategy, &node.text, &options),
                None => chunk_by_strategy(strategy, &node.text, &options),
            };
            debug!(node = %node.id, %strategy, chunks = chunks.len(), "Chunked document node");

            for mut chunk in chunks {
                chunk.metadata.insert(DOC_ID_KEY, node.id.as_str());
                node.links.push(Link {
                    node_id: chunk.id.clone(),
                    kind: LinkKind::Chunk,
                    metadata: None,
                });
                all.push(chunk);
            }
        }

        all
    }

    /// Map from node id to linked ids, in link order. Nodes without links are omitted.
    pub fn link_graph(&self) -> BTreeMap<String, Vec<String>> {
        self.nodes
            .iter()
            .filter(|node| !node.links.is_empty())
            .map(|node| {
                (
                    node.id.clone(),
                    node.links.iter().map(|link| link.node_id.clone()).collect(),
                )
            })
            .collect()
    }
}
