//! Table chunker for pipe tables and CSV-like rows embedded in prose.

use std::sync::Arc;

use super::base::Chunker;
use super::{SentenceChunker, TokenChunker};
use crate::text::{default_tokenizer, MetadataBuilder, Tokenizer};
use crate::types::{Chunk, ChunkOptions};
use crate::DEFAULT_MAX_TOKENS;

/// Pipe-delimited, or at least two commas without trailing sentence punctuation.
fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('|') {
        return true;
    }
    trimmed.matches(',').count() >= 2 && !trimmed.ends_with(['.', ';', '!', '?'])
}

/// A run of consecutive lines of one kind, as a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    table: bool,
    start: usize,
    end: usize,
    lines: usize,
}

fn line_runs(text: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut offset = 0;

    for line in text.split('\n') {
        let start = offset;
        let end = start + line.len();
        offset = end + 1;

        let table = is_table_line(line);
        match runs.last_mut() {
            Some(run) if run.table == table => {
                run.end = end;
                run.lines += 1;
            }
            _ => runs.push(Run {
                table,
                start,
                end,
                lines: 1,
            }),
        }
    }
    runs
}

/// Table chunker.
///
/// Table runs within budget become a single `type: "table"` chunk; larger
/// ones are split into token windows without row alignment. Prose between
/// tables is chunked by sentences. Chunks come out in document order with
/// offsets into the input text.
pub struct TableChunker {
    tokenizer: Arc<dyn Tokenizer>,
    sentence_chunker: SentenceChunker,
    token_chunker: TokenChunker,
}

impl TableChunker {
    pub fn new() -> Self {
        Self::with_tokenizer(default_tokenizer())
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            sentence_chunker: SentenceChunker::with_tokenizer(Arc::clone(&tokenizer)),
            token_chunker: TokenChunker::with_tokenizer(Arc::clone(&tokenizer)),
            tokenizer,
        }
    }
}

impl Default for TableChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for TableChunker {
    fn name(&self) -> &'static str {
        "table"
    }

    fn description(&self) -> &'static str {
        "Keeps pipe and CSV tables together and chunks surrounding prose by sentences"
    }

    fn chunk(&self, text: &str, options: &ChunkOptions) -> Vec<Chunk> {
        let tokenizer = options.tokenizer_or(&self.tokenizer);
        let max_tokens = options.max_tokens_or(DEFAULT_MAX_TOKENS);
        let label = options.label_or("table");
        let mut chunks = Vec::new();

        for run in line_runs(text) {
            let raw = &text[run.start..run.end];
            if raw.trim().is_empty() {
                continue;
            }

            if !run.table {
                let opts = options.delegate(max_tokens, &tokenizer, format!("{}-text", label));
                for chunk in self.sentence_chunker.chunk(raw, &opts) {
                    let metadata = MetadataBuilder::new("table", "text")
                        .base(options)
                        .extras(chunk.metadata.without_origin())
                        .build();
                    chunks.push(Chunk {
                        id: format!("{}-text-{}", label, chunks.len()),
                        metadata,
                        ..chunk.shifted(run.start)
                    });
                }
                continue;
            }

            let table_tokens = tokenizer.count_tokens(raw);
            if table_tokens <= max_tokens {
                let metadata = MetadataBuilder::new("table", "table")
                    .base(options)
                    .extra("type", "table")
                    .extra("rows", run.lines)
                    .build();
                chunks.push(
                    Chunk::new(format!("{}-{}", label, chunks.len()), raw, run.start, run.end)
                        .with_tokens(table_tokens)
                        .with_label(label.as_str())
                        .with_metadata(metadata),
                );
                continue;
            }

            let mut opts = options.delegate(max_tokens, &tokenizer, format!("{}-row", label));
            opts.overlap = Some(0);
            for chunk in self.token_chunker.chunk(raw, &opts) {
                let metadata = MetadataBuilder::new("table", "table")
                    .base(options)
                    .extra("type", "table")
                    .extras(chunk.metadata.without_origin())
                    .build();
                chunks.push(Chunk {
                    id: format!("{}-{}", label, chunks.len()),
                    metadata,
                    ..chunk.shifted(run.start)
                });
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WhitespaceTokenizer;
    use pretty_assertions::assert_eq;

    fn whitespace_chunker() -> TableChunker {
        TableChunker::with_tokenizer(Arc::new(WhitespaceTokenizer))
    }

    #[test]
    fn test_line_classification() {
        assert!(is_table_line("| a | b |"));
        assert!(is_table_line("name,age,city"));
        assert!(!is_table_line("Apples, pears, and plums are fruit."));
        assert!(!is_table_line("   "));
        assert!(!is_table_line("Plain prose"));
    }

    #[test]
    fn test_table_between_prose() {
        let text = "Here is the data.\n| name | qty |\n| --- | --- |\n| apple | 3 |\nThat is all.";
        let chunks = whitespace_chunker().chunk(text, &ChunkOptions::new());

        let tables: Vec<_> = chunks
            .iter()
            .filter(|c| c.metadata.get_str("type") == Some("table"))
            .collect();
        assert_eq!(tables.len(), 1);
        assert!(tables[0].content.starts_with("| name | qty |"));
        assert_eq!(tables[0].metadata.get_usize("rows"), Some(3));
        assert_eq!(&text[tables[0].start..tables[0].end], tables[0].content);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Here is the data.");
        assert_eq!(chunks[0].id, "table-text-0");
        assert_eq!(chunks[2].content, "That is all.");
        assert_eq!(&text[chunks[2].start..chunks[2].end], "That is all.");
        assert_eq!(chunks[2].metadata.format(), Some("table"));
        assert_eq!(chunks[2].metadata.source_type(), Some("text"));
    }

    #[test]
    fn test_oversized_table_is_token_split() {
        let text = "a,b,c\nd,e,f\ng,h,i";
        let chunks = whitespace_chunker().chunk(text, &ChunkOptions::with_max_tokens(1));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, "d,e,f");
        assert_eq!(chunks[1].start, 6);
        assert_eq!(chunks[1].label.as_deref(), Some("table-row"));
        assert_eq!(chunks[1].metadata.get_str("type"), Some("table"));
    }
}
