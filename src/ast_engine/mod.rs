//! Structural code extraction.
//!
//! This module provides:
//! - Tree-sitter based function/class/method extraction for common languages
//! - A language-keyed parser registry with alias resolution

pub mod languages;
pub mod parser;
mod registry;

pub use parser::{BlockKind, CodeBlock, CodeParser, TreeSitterParser};
pub use registry::{get_code_parser, register_code_parser, register_parser_alias, ParserRegistry};
