//! Text utilities shared by the chunkers: tokenization, offsets, metadata
//! assembly, segmentation, similarity and format detection.

mod format;
mod metadata;
mod position;
mod segment;
mod similarity;
mod tokenizer;

pub use format::{detect_format, DetectedFormat};
pub use metadata::{build_metadata, MetadataBuilder};
pub use position::{position_for_range, LineCol, LineMap};
pub use segment::{normalize_text, split_into_paragraphs, split_into_sentences, Segment};
pub use similarity::{average_embedding, cosine_similarity};
pub use tokenizer::{
    count_tokens, default_tokenizer, floor_char_boundary, slice_by_token_range,
    tokenizer_for_encoding, TiktokenTokenizer, Token, Tokenizer, WhitespaceTokenizer,
};
