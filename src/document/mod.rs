//! Structured documents: node ownership, metadata extraction, strategy
//! dispatch and the document-to-chunk link graph.

mod extractors;
mod structured;

pub use extractors::{extract_keywords, extract_questions, extract_summary, extract_title};
pub use structured::{ExtractOptions, StructuredDocument};
