//! Tree-sitter based structural block extraction.
//!
//! Walks a syntax tree and reports functions, classes and methods with byte
//! ranges and a dotted symbol path, for use as chunk boundaries.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

use super::languages::{get_language, get_node_types};

/// Kind of structural block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Function,
    Class,
    Method,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Function => "function",
            BlockKind::Class => "class",
            BlockKind::Method => "method",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural code unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub kind: BlockKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Start byte offset in the parsed source.
    pub start: usize,

    /// End byte offset (exclusive).
    pub end: usize,

    /// Names of the enclosing blocks followed by this block's own name,
    /// e.g. `["Greeter", "greet"]`.
    #[serde(default)]
    pub path: Vec<String>,
}

impl CodeBlock {
    pub fn new(kind: BlockKind, name: Option<String>, start: usize, end: usize) -> Self {
        let path = name.iter().cloned().collect();
        Self {
            kind,
            name,
            start,
            end,
            path,
        }
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Name of the innermost enclosing block.
    pub fn parent(&self) -> Option<&str> {
        let own = usize::from(self.name.is_some());
        self.path
            .len()
            .checked_sub(own + 1)
            .map(|idx| self.path[idx].as_str())
    }
}

/// Extracts structural blocks from source code.
///
/// Any `Fn(&str) -> Vec<CodeBlock>` closure is a parser.
pub trait CodeParser: Send + Sync {
    fn parse(&self, source: &str) -> Vec<CodeBlock>;
}

impl<F> CodeParser for F
where
    F: Fn(&str) -> Vec<CodeBlock> + Send + Sync,
{
    fn parse(&self, source: &str) -> Vec<CodeBlock> {
        self(source)
    }
}

/// Structural extractor backed by a tree-sitter grammar.
#[derive(Debug, Clone)]
pub struct TreeSitterParser {
    language: String,
}

impl TreeSitterParser {
    /// Create an extractor for a canonical language name, if a grammar exists.
    pub fn new(language: &str) -> Option<Self> {
        get_language(language).map(|_| Self {
            language: language.to_string(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Parse source code into structural blocks, deduplicated by range and
    /// sorted by start offset. Parse failures yield no blocks.
    pub fn extract(&self, source: &str) -> Vec<CodeBlock> {
        let Some(grammar) = get_language(&self.language) else {
            return Vec::new();
        };

        // Parser is not Sync; build one per call.
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            warn!(language = %self.language, error = %e, "Failed to load tree-sitter grammar");
            return Vec::new();
        }

        let Some(tree) = parser.parse(source.as_bytes(), None) else {
            debug!(language = %self.language, "Tree-sitter returned no tree");
            return Vec::new();
        };

        let node_types = get_node_types(&self.language);
        let mut blocks = Vec::new();
        let mut stack: Vec<Scope> = Vec::new();
        visit_node(tree.root_node(), source, &node_types, &mut stack, &mut blocks);

        let blocks = dedupe_and_sort(blocks);
        debug!(language = %self.language, blocks = blocks.len(), "Extracted code blocks");
        blocks
    }
}

impl CodeParser for TreeSitterParser {
    fn parse(&self, source: &str) -> Vec<CodeBlock> {
        self.extract(source)
    }
}

struct Scope {
    kind: BlockKind,
    name: Option<String>,
}

fn visit_node(
    node: Node,
    source: &str,
    node_types: &HashMap<&'static str, BlockKind>,
    stack: &mut Vec<Scope>,
    blocks: &mut Vec<CodeBlock>,
) {
    let mut pushed = false;

    if let Some(&mapped) = node_types.get(node.kind()) {
        if !is_forward_declaration(&node) {
            let kind = match (mapped, stack.last()) {
                (BlockKind::Function, Some(scope)) if scope.kind == BlockKind::Class => {
                    BlockKind::Method
                }
                _ => mapped,
            };
            let name = binding_name(&node, source).or_else(|| node_name(&node, source));

            let mut path: Vec<String> = stack.iter().filter_map(|s| s.name.clone()).collect();
            path.extend(name.iter().cloned());

            blocks.push(CodeBlock {
                kind,
                name: name.clone(),
                start: node.start_byte(),
                end: node.end_byte(),
                path,
            });
            stack.push(Scope { kind, name });
            pushed = true;
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_node(child, source, node_types, stack, blocks);
    }

    if pushed {
        stack.pop();
    }
}

/// `struct foo;` and `class Bar;` without a body are references, not blocks.
fn is_forward_declaration(node: &Node) -> bool {
    node.kind().ends_with("_specifier") && node.child_by_field_name("body").is_none()
}

fn is_identifier_like(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "name"
            | "constant"
            | "property_identifier"
            | "type_identifier"
            | "field_identifier"
            | "qualified_identifier"
            | "destructor_name"
            | "operator_name"
    )
}

fn node_text(node: &Node, source: &str) -> Option<String> {
    source
        .get(node.start_byte()..node.end_byte())
        .map(str::to_string)
}

/// Name from the `name` field, the declarator chain (C/C++), the `type`
/// field (Rust impl blocks) or the first identifier-like child.
fn node_name(node: &Node, source: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return node_text(&name, source);
    }

    if let Some(declarator) = node.child_by_field_name("declarator") {
        if is_identifier_like(declarator.kind()) {
            return node_text(&declarator, source);
        }
        return node_name(&declarator, source);
    }

    if let Some(ty) = node.child_by_field_name("type") {
        return node_text(&ty, source);
    }

    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|child| is_identifier_like(child.kind()));
    found.and_then(|child| node_text(&child, source))
}

/// `const handler = () => {}` names the arrow function after its binding.
fn binding_name(node: &Node, source: &str) -> Option<String> {
    let parent = node.parent()?;
    if parent.kind() != "variable_declarator" {
        return None;
    }
    let name = parent.child_by_field_name("name")?;
    node_text(&name, source)
}

/// Keep one block per byte range (the last one seen), ordered by start.
fn dedupe_and_sort(blocks: Vec<CodeBlock>) -> Vec<CodeBlock> {
    let mut unique: Vec<CodeBlock> = Vec::with_capacity(blocks.len());
    let mut index: HashMap<(usize, usize), usize> = HashMap::new();

    for block in blocks {
        match index.get(&(block.start, block.end)) {
            Some(&slot) => unique[slot] = block,
            None => {
                index.insert((block.start, block.end), unique.len());
                unique.push(block);
            }
        }
    }

    unique.sort_by_key(|b| b.start);
    unique
}
