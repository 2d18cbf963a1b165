//! End-to-end chunking scenarios across the public API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rag_chunker::ast_engine::{register_code_parser, register_parser_alias, BlockKind, CodeBlock};
use rag_chunker::prelude::*;

fn whitespace() -> Arc<dyn Tokenizer> {
    Arc::new(WhitespaceTokenizer)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn contents(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.content.as_str()).collect()
}

#[test]
fn token_windows_overlap() {
    let chunker = TokenChunker::with_tokenizer(whitespace());
    let opts = ChunkOptions::with_max_tokens(4).overlap(1);
    let chunks = chunker.chunk("one two three four five six seven eight nine ten", &opts);

    assert_eq!(
        contents(&chunks),
        vec!["one two three four", "four five six seven", "seven eight nine ten"]
    );
}

#[test]
fn token_windows_cover_text_without_overlap() {
    let text = "alpha beta gamma delta epsilon zeta eta";
    let chunks = TokenChunker::with_tokenizer(whitespace()).chunk(text, &ChunkOptions::with_max_tokens(3));
    assert_eq!(contents(&chunks).join(" "), text);
    for chunk in &chunks {
        assert!(chunk.tokens.unwrap() <= 3);
        assert_eq!(&text[chunk.start..chunk.end], chunk.content);
    }
}

fn assert_bpe_budget(chunks: &[Chunk], max_tokens: usize) {
    let tokenizer = rag_chunker::text::default_tokenizer();
    assert!(!chunks.is_empty());
    for chunk in chunks {
        let count = tokenizer.count_tokens(&chunk.content);
        assert!(count <= max_tokens, "{:?} holds {} tokens", chunk.id, count);
        assert_eq!(chunk.tokens, Some(count));
    }
}

#[test]
fn bpe_budget_holds_for_emoji_and_cjk() {
    let emoji = "😀🎉🚀".repeat(20);
    let cjk = "東京は日本の首都です。大阪は食べ物で有名です。".repeat(6);
    let mixed = format!("{}\n\n{} 😀 emoji and 漢字 mixed together. {}", cjk, emoji, cjk);
    let opts = ChunkOptions::with_max_tokens(6);

    for text in [&emoji, &cjk, &mixed] {
        assert_bpe_budget(&TokenChunker::new().chunk(text, &opts), 6);
        assert_bpe_budget(&RecursiveChunker::new().chunk(text, &opts), 6);
        assert_bpe_budget(&CodeChunker::new().chunk_code(text, None, &opts), 6);
    }
}

#[test]
fn sentence_minimal_budget() {
    let chunks = SentenceChunker::with_tokenizer(whitespace()).chunk("A. B. C.", &ChunkOptions::with_max_tokens(1));
    assert!(chunks.len() >= 3);
    assert!(chunks.iter().all(|c| c.tokens.unwrap() <= 2));
}

#[test]
fn json_fallback_on_invalid_input() {
    let chunks = JsonChunker::with_tokenizer(whitespace()).chunk("{invalid json", &ChunkOptions::new());
    assert!(!chunks.is_empty());
    assert_eq!(chunks[0].metadata.get("jsonFallback"), Some(&serde_json::json!(true)));
}

#[test]
fn table_between_prose() {
    let text = "Quarterly numbers follow.\n| region | sales |\n| --- | --- |\n| north | 10 |\n| south | 12 |\nNorth grew slower than south.";
    let chunks = TableChunker::with_tokenizer(whitespace()).chunk(text, &ChunkOptions::new());

    let tables: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.get_str("type") == Some("table"))
        .collect();
    assert_eq!(tables.len(), 1);
    assert!(tables[0].content.starts_with("| region | sales |"));
    assert!(chunks.iter().any(|c| c.content.contains("Quarterly numbers follow.")));
    assert!(chunks.iter().any(|c| c.content.contains("North grew slower")));
}

#[test]
fn markdown_heading_paths() {
    let chunks = MarkdownChunker::with_tokenizer(whitespace())
        .chunk("# Title\nIntro.\n\n## Details\nMore.", &ChunkOptions::new());

    let intro = chunks.iter().find(|c| c.content.contains("Intro.")).unwrap();
    let more = chunks.iter().find(|c| c.content.contains("More.")).unwrap();
    assert_eq!(intro.metadata.get_strings("headingPath"), Some(vec!["Title".to_string()]));
    assert_eq!(
        more.metadata.get_strings("headingPath"),
        Some(vec!["Title".to_string(), "Details".to_string()])
    );
}

#[test]
fn registered_parser_drives_code_blocks() {
    init_tracing();
    register_code_parser("toylang", |source: &str| {
        source
            .match_indices("def ")
            .map(|(start, _)| {
                let end = source[start..].find("\n\n").map_or(source.trim_end().len(), |i| start + i);
                CodeBlock::new(BlockKind::Function, Some("f".to_string()), start, end)
            })
            .collect::<Vec<_>>()
    });
    register_parser_alias("toy", "toylang");

    let text = "Intro text.\n```toy\ndef one\n\ndef two\n```";
    let chunks = CodeChunker::with_tokenizer(whitespace()).chunk(text, &ChunkOptions::new());

    let blocks: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.get_str("blockKind") == Some("function"))
        .collect();
    let bodies: Vec<&str> = blocks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(bodies, vec!["def one", "def two"]);
    for block in blocks {
        assert_eq!(&text[block.start..block.end], block.content);
    }
}

#[tokio::test]
async fn semantic_merge_of_related_sentences() {
    let embedder = FnEmbedder::shared(|text: &str| {
        let lower = text.to_lowercase();
        if lower.contains("cat") || lower.contains("feline") {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        }
    });
    let opts = ChunkOptions::with_max_tokens(6)
        .similarity_threshold(0.7)
        .embedder(embedder);
    let text = "Cats love warm naps. Felines enjoy sunny spots. Bonds yield steady income.";

    let chunks = SemanticChunker::with_tokenizer(whitespace())
        .chunk_async(text, &opts)
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].content.contains("Cats") && chunks[0].content.contains("Felines"));
    assert_eq!(chunks[1].content, "Bonds yield steady income.");
}

#[tokio::test]
async fn late_windows_over_async_base() {
    let base: Arc<dyn AsyncChunker> = Arc::new(SentenceChunker::with_tokenizer(whitespace()));
    let chunker = LateChunker::with_base(base);
    let opts = ChunkOptions::with_max_tokens(2).window_size(3).stride(2);

    let chunks = chunker.chunk_async("A b. C d. E f. G h.", &opts).await.unwrap();
    assert_eq!(contents(&chunks), vec!["A b.\nC d.\nE f.", "E f.\nG h."]);
}

#[tokio::test]
async fn collaborator_chunkers_fail_fast() {
    let semantic = SemanticChunker::new().chunk_async("text", &ChunkOptions::new()).await;
    assert!(matches!(semantic, Err(ChunkError::MissingCollaborator { .. })));

    let neural = NeuralChunker::new().chunk_async("text", &ChunkOptions::new()).await;
    assert!(matches!(neural, Err(ChunkError::MissingCollaborator { .. })));
}

#[test]
fn structured_document_pipeline() {
    init_tracing();
    let router = Arc::new(ChunkingRouter::with_tokenizer(whitespace()));
    let mut doc = StructuredDocument::new(vec![
        DocInput::new("Why chunk? Retrieval needs small pieces.").with_doc_id("prose"),
        DocInput::new(r#"{"service": "search", "replicas": 3}"#).with_doc_id("config"),
    ])
    .with_router(router);

    doc.extract(&ExtractOptions::all());
    assert_eq!(doc.nodes()[1].metadata.get("title"), Some(&serde_json::json!("Why chunk? Retrieval needs small pieces.")));

    let chunks = doc.chunk(Strategy::Auto, Some(50));
    let json_chunk = chunks.iter().find(|c| c.metadata.doc_id() == Some("config")).unwrap();
    assert_eq!(json_chunk.metadata.source_type(), Some("json"));
    assert_eq!(json_chunk.content, "service: search\nreplicas: 3");

    let graph = doc.link_graph();
    assert_eq!(graph.len(), 2);
    assert_eq!(graph["config"], vec![json_chunk.id.clone()]);
}

#[test]
fn chunking_is_deterministic() {
    let router = ChunkingRouter::with_tokenizer(whitespace());
    let text = "# Notes\n\nFirst paragraph here. Second sentence.\n\n- item one\n- item two";
    let first = router.chunk(Strategy::Auto, text, &ChunkOptions::with_max_tokens(5));
    let second = router.chunk(Strategy::Auto, text, &ChunkOptions::with_max_tokens(5));
    assert_eq!(first, second);
}
