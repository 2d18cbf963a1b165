//! Language-specific node type mappings for structural extraction.
//!
//! Maps tree-sitter node types to [`BlockKind`] for each supported grammar.

use std::collections::HashMap;

use tree_sitter::Language;

use crate::ast_engine::parser::BlockKind;

/// Languages with a built-in tree-sitter extractor.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "javascript",
    "typescript",
    "tsx",
    "python",
    "rust",
    "go",
    "java",
    "c",
    "cpp",
    "ruby",
];

/// Get the tree-sitter grammar for a canonical language name.
pub fn get_language(name: &str) -> Option<Language> {
    match name {
        "python" => Some(tree_sitter_python::language()),
        "javascript" => Some(tree_sitter_javascript::language()),
        "typescript" => Some(tree_sitter_typescript::language_typescript()),
        "tsx" => Some(tree_sitter_typescript::language_tsx()),
        "go" => Some(tree_sitter_go::language()),
        "rust" => Some(tree_sitter_rust::language()),
        "java" => Some(tree_sitter_java::language()),
        "c" => Some(tree_sitter_c::language()),
        "cpp" => Some(tree_sitter_cpp::language()),
        "ruby" => Some(tree_sitter_ruby::language()),
        _ => None,
    }
}

/// Get the node type mappings for a language.
pub fn get_node_types(language: &str) -> HashMap<&'static str, BlockKind> {
    match language {
        "python" => python_node_types(),
        "javascript" => javascript_node_types(),
        "typescript" | "tsx" => typescript_node_types(),
        "go" => go_node_types(),
        "rust" => rust_node_types(),
        "java" => java_node_types(),
        "c" => c_node_types(),
        "cpp" => cpp_node_types(),
        "ruby" => ruby_node_types(),
        _ => HashMap::new(),
    }
}

fn python_node_types() -> HashMap<&'static str, BlockKind> {
    [
        ("function_definition", BlockKind::Function),
        ("class_definition", BlockKind::Class),
    ]
    .into_iter()
    .collect()
}

fn javascript_node_types() -> HashMap<&'static str, BlockKind> {
    [
        ("function_declaration", BlockKind::Function),
        ("generator_function_declaration", BlockKind::Function),
        ("function", BlockKind::Function),
        ("function_expression", BlockKind::Function),
        ("arrow_function", BlockKind::Function),
        ("method_definition", BlockKind::Method),
        ("class_declaration", BlockKind::Class),
        ("class", BlockKind::Class),
    ]
    .into_iter()
    .collect()
}

/// TypeScript node type mappings (extends JavaScript).
fn typescript_node_types() -> HashMap<&'static str, BlockKind> {
    let mut types = javascript_node_types();
    types.extend([
        ("abstract_class_declaration", BlockKind::Class),
        ("interface_declaration", BlockKind::Class),
    ]);
    types
}

fn go_node_types() -> HashMap<&'static str, BlockKind> {
    [
        ("function_declaration", BlockKind::Function),
        ("method_declaration", BlockKind::Method),
        ("type_spec", BlockKind::Class),
    ]
    .into_iter()
    .collect()
}

fn rust_node_types() -> HashMap<&'static str, BlockKind> {
    [
        ("function_item", BlockKind::Function),
        ("struct_item", BlockKind::Class),
        ("enum_item", BlockKind::Class),
        ("trait_item", BlockKind::Class),
        ("impl_item", BlockKind::Class),
    ]
    .into_iter()
    .collect()
}

fn java_node_types() -> HashMap<&'static str, BlockKind> {
    [
        ("method_declaration", BlockKind::Method),
        ("constructor_declaration", BlockKind::Method),
        ("class_declaration", BlockKind::Class),
        ("interface_declaration", BlockKind::Class),
        ("enum_declaration", BlockKind::Class),
        ("record_declaration", BlockKind::Class),
    ]
    .into_iter()
    .collect()
}

fn c_node_types() -> HashMap<&'static str, BlockKind> {
    [("function_definition", BlockKind::Function)]
        .into_iter()
        .collect()
}

/// C++ node type mappings (extends C).
fn cpp_node_types() -> HashMap<&'static str, BlockKind> {
    let mut types = c_node_types();
    types.extend([
        ("class_specifier", BlockKind::Class),
        ("struct_specifier", BlockKind::Class),
    ]);
    types
}

fn ruby_node_types() -> HashMap<&'static str, BlockKind> {
    [
        ("method", BlockKind::Method),
        ("singleton_method", BlockKind::Method),
        ("class", BlockKind::Class),
        ("module", BlockKind::Class),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_mappings() {
        let types = get_node_types("python");
        assert_eq!(types.get("function_definition"), Some(&BlockKind::Function));
        assert_eq!(types.get("class_definition"), Some(&BlockKind::Class));
    }

    #[test]
    fn test_typescript_extends_javascript() {
        let types = get_node_types("typescript");
        assert_eq!(types.get("arrow_function"), Some(&BlockKind::Function));
        assert_eq!(types.get("interface_declaration"), Some(&BlockKind::Class));
    }

    #[test]
    fn test_every_supported_language_has_grammar() {
        for language in SUPPORTED_LANGUAGES {
            assert!(get_language(language).is_some(), "{language}");
            assert!(!get_node_types(language).is_empty(), "{language}");
        }
    }

    #[test]
    fn test_unknown_language() {
        assert!(get_node_types("unknown").is_empty());
        assert!(get_language("unknown").is_none());
    }
}
