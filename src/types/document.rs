//! Document node types owned by a structured document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a directed edge from a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Document,
    Section,
    Chunk,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::Document => write!(f, "document"),
            LinkKind::Section => write!(f, "section"),
            LinkKind::Chunk => write!(f, "chunk"),
        }
    }
}

/// A typed edge from a node to another identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Identifier the edge points to
    pub node_id: String,

    /// Kind of relationship
    #[serde(rename = "type")]
    pub kind: LinkKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// One text block of a structured document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Input used to construct a document node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocInput {
    pub text: String,
    pub metadata: Map<String, Value>,
    pub doc_id: Option<String>,
}

impl DocInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
