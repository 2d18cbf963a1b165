//! Offset-preserving tokenizers used for budget accounting.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A contiguous span of source text.
///
/// `start`/`end` are byte offsets into the tokenized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// Tokenizer trait shared by every chunker.
///
/// Tokens returned by `tokenize` are non-overlapping and strictly increasing
/// in `start`.
pub trait Tokenizer: Send + Sync {
    /// Get the name of this tokenizer.
    fn name(&self) -> &str;

    /// Split text into tokens with byte offsets.
    fn tokenize(&self, text: &str) -> Vec<Token>;

    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> usize {
        self.tokenize(text).len()
    }
}

lazy_static! {
    static ref NON_WHITESPACE: Regex = Regex::new(r"\S+").unwrap();
}

/// Tokenizer splitting on runs of non-whitespace characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn tokenize(&self, text: &str) -> Vec<Token> {
        NON_WHITESPACE
            .find_iter(text)
            .map(|m| Token {
                value: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        NON_WHITESPACE.find_iter(text).count()
    }
}

/// Byte-pair-encoding tokenizer compatible with OpenAI vocabularies.
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
    encoding: String,
}

impl TiktokenTokenizer {
    /// Create a tokenizer with the cl100k_base encoding (GPT-4/ChatGPT).
    pub fn new() -> anyhow::Result<Self> {
        Self::with_encoding("cl100k_base")
    }

    /// Create a tokenizer with a specific encoding.
    pub fn with_encoding(encoding_name: &str) -> anyhow::Result<Self> {
        let bpe = match encoding_name {
            "cl100k_base" => tiktoken_rs::cl100k_base()?,
            "p50k_base" => tiktoken_rs::p50k_base()?,
            "p50k_edit" => tiktoken_rs::p50k_edit()?,
            "r50k_base" => tiktoken_rs::r50k_base()?,
            other => anyhow::bail!("unknown encoding: {}", other),
        };
        Ok(Self {
            bpe,
            encoding: encoding_name.to_string(),
        })
    }

    /// Create a tokenizer matching a model name, e.g. "gpt-4".
    pub fn for_model(model: &str) -> anyhow::Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)?;
        Ok(Self {
            bpe,
            encoding: model.to_string(),
        })
    }

    /// Encoding or model this tokenizer was built from.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn name(&self) -> &str {
        "tiktoken"
    }

    /// Encode to ids, then decode ids one by one and lay the pieces end to end.
    ///
    /// Ids whose bytes are not valid UTF-8 on their own (multi-byte characters
    /// split across merges) are grouped until the group decodes, so every
    /// piece is a whole string and offsets stay on char boundaries.
    /// A piece can therefore cover several ids, so budgets are measured with
    /// [`Tokenizer::count_tokens`] rather than the number of pieces.
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let ids = self.bpe.encode_ordinary(text);
        let mut tokens = Vec::with_capacity(ids.len());
        let mut pending: Vec<usize> = Vec::new();
        let mut cursor = 0;

        for id in ids {
            pending.push(id);
            let Ok(piece) = self.bpe.decode(pending.clone()) else {
                continue;
            };
            pending.clear();
            if piece.is_empty() {
                continue;
            }
            let start = cursor;
            let end = (start + piece.len()).min(text.len());
            if end <= start {
                break;
            }
            tokens.push(Token {
                value: piece,
                start,
                end,
            });
            cursor = end;
        }

        // Trailing ids that never formed a valid piece cover the remainder.
        let cursor = floor_char_boundary(text, cursor);
        if !pending.is_empty() && cursor < text.len() {
            tokens.push(Token {
                value: text[cursor..].to_string(),
                start: cursor,
                end: text.len(),
            });
        }

        tokens
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

lazy_static! {
    static ref DEFAULT_TOKENIZER: Arc<dyn Tokenizer> = match TiktokenTokenizer::new() {
        Ok(tokenizer) => Arc::new(tokenizer),
        Err(e) => {
            warn!(error = %e, "Failed to load cl100k_base, falling back to whitespace tokenizer");
            Arc::new(WhitespaceTokenizer)
        }
    };
}

/// Process-wide default tokenizer (cl100k_base).
pub fn default_tokenizer() -> Arc<dyn Tokenizer> {
    Arc::clone(&DEFAULT_TOKENIZER)
}

/// Build a tokenizer by encoding name; "whitespace" selects [`WhitespaceTokenizer`].
pub fn tokenizer_for_encoding(encoding: &str) -> Arc<dyn Tokenizer> {
    match encoding {
        "whitespace" => Arc::new(WhitespaceTokenizer),
        "cl100k_base" => default_tokenizer(),
        other => match TiktokenTokenizer::with_encoding(other) {
            Ok(tokenizer) => Arc::new(tokenizer),
            Err(e) => {
                warn!(encoding = other, error = %e, "Unknown encoding, using default tokenizer");
                default_tokenizer()
            }
        },
    }
}

/// Helper function to count tokens using the default tokenizer.
pub fn count_tokens(text: &str) -> usize {
    DEFAULT_TOKENIZER.count_tokens(text)
}

/// Substring from the start of token `start` to the end of token `end`.
///
/// Indices are clamped to the token list; an empty list or an inverted range
/// yields an empty string.
pub fn slice_by_token_range<'a>(text: &'a str, tokens: &[Token], start: usize, end: usize) -> &'a str {
    if tokens.is_empty() {
        return "";
    }
    let last = tokens.len() - 1;
    let start = start.min(last);
    let end = end.min(last);
    let from = floor_char_boundary(text, tokens[start].start);
    let to = floor_char_boundary(text, tokens[end].end);
    if from >= to {
        return "";
    }
    &text[from..to]
}

/// Largest char boundary not above `index`, clamped to the text length.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_offsets() {
        let tokens = WhitespaceTokenizer.tokenize("  alpha  beta\ngamma");
        let spans: Vec<_> = tokens.iter().map(|t| (t.value.as_str(), t.start, t.end)).collect();
        assert_eq!(spans, vec![("alpha", 2, 7), ("beta", 9, 13), ("gamma", 14, 19)]);
    }

    #[test]
    fn test_slice_round_trip() {
        let text = "one  two\tthree four";
        let tokens = WhitespaceTokenizer.tokenize(text);
        assert_eq!(slice_by_token_range(text, &tokens, 0, tokens.len() - 1), text);
        assert_eq!(slice_by_token_range(text, &tokens, 1, 2), "two\tthree");
    }

    #[test]
    fn test_slice_clamps_and_handles_empty() {
        let text = "a b c";
        let tokens = WhitespaceTokenizer.tokenize(text);
        assert_eq!(slice_by_token_range(text, &tokens, 1, 99), "b c");
        assert_eq!(slice_by_token_range(text, &tokens, 2, 1), "");
        assert_eq!(slice_by_token_range(text, &[], 0, 3), "");
    }

    #[test]
    fn test_tiktoken_pieces_cover_text() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        let text = "Hello, world! Ünïcödé 日本語 text.";
        let tokens = tokenizer.tokenize(text);
        assert!(!tokens.is_empty());
        let rebuilt: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(rebuilt, text);
        for pair in tokens.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(tokens.last().unwrap().end, text.len());
    }

    #[test]
    fn test_tiktoken_count_matches_encoding() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        assert_eq!(tokenizer.count_tokens("Hello, world!"), 4);
        assert_eq!(tokenizer.count_tokens(""), 0);
    }

    #[test]
    fn test_tiktoken_grouped_pieces_count_every_id() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        let text = "😀".repeat(10);
        let pieces = tokenizer.tokenize(&text);
        assert!(!pieces.is_empty());
        assert!(tokenizer.count_tokens(&text) > pieces.len());
    }

    #[test]
    fn test_unknown_encoding_is_error() {
        assert!(TiktokenTokenizer::with_encoding("nope").is_err());
    }
}
