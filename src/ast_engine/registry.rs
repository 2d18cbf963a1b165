//! Language-keyed code parser registry.
//!
//! Lookups lowercase the language tag, try a direct match, then resolve
//! through the alias table. Registration is last-write-wins and there is no
//! removal.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use tracing::debug;

use super::languages::SUPPORTED_LANGUAGES;
use super::parser::{CodeParser, TreeSitterParser};

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("c++", "cpp"),
    ("cc", "cpp"),
    ("hpp", "cpp"),
    ("c", "c"),
    ("rs", "rust"),
    ("golang", "go"),
    ("rb", "ruby"),
];

/// A set of code parsers keyed by language.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn CodeParser>>,
    aliases: HashMap<String, String>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Empty registry with the default alias table.
    pub fn new() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(alias, target)| (alias.to_string(), target.to_string()))
            .collect();
        Self {
            parsers: HashMap::new(),
            aliases,
        }
    }

    /// Registry with a tree-sitter extractor for every supported language.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for language in SUPPORTED_LANGUAGES {
            if let Some(parser) = TreeSitterParser::new(language) {
                registry.register(language, Arc::new(parser));
            }
        }
        registry
    }

    pub fn register(&mut self, language: &str, parser: Arc<dyn CodeParser>) {
        debug!(language, "Registered code parser");
        self.parsers.insert(language.to_lowercase(), parser);
    }

    pub fn register_alias(&mut self, alias: &str, target: &str) {
        self.aliases
            .insert(alias.to_lowercase(), target.to_lowercase());
    }

    /// Canonical language name for a tag.
    pub fn resolve(&self, language: &str) -> String {
        let key = language.to_lowercase();
        if self.parsers.contains_key(&key) {
            return key;
        }
        self.aliases.get(&key).cloned().unwrap_or(key)
    }

    pub fn get(&self, language: &str) -> Option<Arc<dyn CodeParser>> {
        if language.is_empty() {
            return None;
        }
        self.parsers.get(&self.resolve(language)).cloned()
    }

    /// Registered language names, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parsers.keys().cloned().collect();
        names.sort();
        names
    }
}

lazy_static! {
    static ref GLOBAL_REGISTRY: RwLock<ParserRegistry> = RwLock::new(ParserRegistry::with_defaults());
}

/// Register or replace the process-wide parser for a language.
pub fn register_code_parser(language: &str, parser: impl CodeParser + 'static) {
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register(language, Arc::new(parser));
}

/// Map an alias onto a language in the process-wide registry.
pub fn register_parser_alias(alias: &str, target: &str) {
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register_alias(alias, target);
}

/// Look up the process-wide parser for a language tag.
pub fn get_code_parser(language: &str) -> Option<Arc<dyn CodeParser>> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(language)
}
