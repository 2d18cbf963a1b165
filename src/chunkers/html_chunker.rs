//! HTML chunker: strips markup to text, then chunks recursively.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::base::Chunker;
use super::RecursiveChunker;
use crate::text::{default_tokenizer, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

lazy_static! {
    static ref SCRIPT: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref STYLE: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
    static ref BLOCK_TAG: Regex = Regex::new(
        r"(?i)</?(p|div|section|article|header|footer|main|nav|ul|ol|li|table|tr|td|th|h1|h2|h3|h4|h5|h6|br)\b[^>]*>"
    )
    .unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref DECIMAL_ENTITY: Regex = Regex::new(r"&#(\d+);").unwrap();
    static ref HEX_ENTITY: Regex = Regex::new(r"&#[xX]([0-9a-fA-F]+);").unwrap();
    static ref SPACE_BEFORE_NEWLINE: Regex = Regex::new(r"\s+\n").unwrap();
    static ref SPACE_AFTER_NEWLINE: Regex = Regex::new(r"\n\s+").unwrap();
}

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    // Last, so "&amp;lt;" decodes to "&lt;" rather than "<"
    ("&amp;", "&"),
];

fn decode_char_ref(caps: &Captures<'_>, radix: u32) -> String {
    u32::from_str_radix(&caps[1], radix)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_else(|| caps[0].to_string())
}

/// Convert HTML into newline-separated plain text.
pub fn normalize_html(html: &str) -> String {
    let text = SCRIPT.replace_all(html, "");
    let text = STYLE.replace_all(&text, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");

    let mut text = text.into_owned();
    for (entity, replacement) in NAMED_ENTITIES {
        text = text.replace(entity, replacement);
    }
    let text = DECIMAL_ENTITY.replace_all(&text, |caps: &Captures<'_>| decode_char_ref(caps, 10));
    let text = HEX_ENTITY.replace_all(&text, |caps: &Captures<'_>| decode_char_ref(caps, 16));

    let text = SPACE_BEFORE_NEWLINE.replace_all(&text, "\n");
    let text = SPACE_AFTER_NEWLINE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// HTML chunker.
///
/// Script and style blocks are dropped, block-level tags become line breaks,
/// remaining tags are stripped and common entities decoded. Offsets refer to
/// the normalized text.
pub struct HtmlChunker {
    tokenizer: Arc<dyn Tokenizer>,
    recursive_chunker: RecursiveChunker,
}

impl HtmlChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            recursive_chunker: RecursiveChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }
}

impl Default for HtmlChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for HtmlChunker {
    fn name(&self) -> &'static str {
        "html"
    }

    fn description(&self) -> &'static str {
        "Strips HTML markup and chunks the remaining text recursively"
    }

    fn chunk(&self, html: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("html");

        let cleaned = normalize_html(html);
        if cleaned.is_empty() {
            return vec![];
        }

        let opts = options.delegate(max_tokens, &tokenizer, label.clone());
        self.recursive_chunker
            .chunk(&cleaned, &opts)
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let metadata = MetadataBuilder::new("html", "html")
                    .base(options)
                    .extras(chunk.metadata.without_origin())
                    .build();
                Chunk {
                    id: format!("{}-{}", label, idx),
                    metadata,
                    ..chunk
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WhitespaceTokenizer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_html() {
        let html = "<html><head><style>p { color: red; }</style><script type=\"x\">alert(1)</script></head>\
                    <body><h1>Title</h1><p>Fish &amp; chips &lt;3 &#65;&#x42;</p><span>inline</span> text</body></html>";
        assert_eq!(normalize_html(html), "Title\nFish & chips <3 AB\ninline text");
    }

    #[test]
    fn test_chunks_are_tagged_html() {
        let chunker = HtmlChunker::with_tokenizer(Arc::new(WhitespaceTokenizer));
        let chunks = chunker.chunk("<p>Hello there.</p><p>General Kenobi.</p>", &ChunkOptions::new().doc_id("d1"));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "html-0");
        assert_eq!(chunks[0].content, "Hello there.\nGeneral Kenobi.");
        assert_eq!(chunks[0].metadata.format(), Some("html"));
        assert_eq!(chunks[0].metadata.source_type(), Some("html"));
        assert_eq!(chunks[0].metadata.doc_id(), Some("d1"));
        assert_eq!(chunks[0].metadata.get_usize("paragraphIndex"), Some(0));
    }

    #[test]
    fn test_markup_only_is_empty() {
        let chunker = HtmlChunker::with_tokenizer(Arc::new(WhitespaceTokenizer));
        assert!(chunker.chunk("<div><script>x()</script></div>", &ChunkOptions::new()).is_empty());
    }
}
