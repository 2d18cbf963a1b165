//! Heuristic metadata extractors over document nodes.
//!
//! Each extractor takes ownership of the node list and returns it with one
//! metadata key added to every node.

use std::collections::HashMap;

use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::DocNode;

fn stamp(nodes: Vec<DocNode>, key: &str, value: Value) -> Vec<DocNode> {
    nodes
        .into_iter()
        .map(|mut node| {
            node.metadata.insert(key.to_string(), value.clone());
            node
        })
        .collect()
}

/// `title`: first line of the first node, trimmed. Nodes are returned
/// unchanged when that line is empty.
pub fn extract_title(nodes: Vec<DocNode>) -> Vec<DocNode> {
    let title = nodes
        .first()
        .and_then(|node| node.text.lines().next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if title.is_empty() {
        return nodes;
    }
    stamp(nodes, "title", Value::from(title))
}

/// `summary`: the first two non-empty period-delimited sentences across all
/// nodes, joined with ". ".
pub fn extract_summary(nodes: Vec<DocNode>) -> Vec<DocNode> {
    if nodes.is_empty() {
        return nodes;
    }
    let text = nodes.iter().map(|n| n.text.as_str()).collect::<Vec<_>>().join(" ");
    let summary = text
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(". ");
    stamp(nodes, "summary", Value::from(summary))
}

/// `keywords`: the `top_n` most frequent runs of three or more ASCII letters,
/// lowercased. Ties keep first-occurrence order.
pub fn extract_keywords(nodes: Vec<DocNode>, top_n: usize) -> Vec<DocNode> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for node in &nodes {
        let lower = node.text.to_lowercase();
        let letters = lower
            .unicode_words()
            .flat_map(|word| word.split(|c: char| !c.is_ascii_lowercase()));
        for word in letters {
            if word.len() < 3 {
                continue;
            }
            let count = counts.entry(word.to_string()).or_insert_with(|| {
                order.push(word.to_string());
                0
            });
            *count += 1;
        }
    }

    // sort_by is stable, so equal counts stay in first-seen order
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(top_n);
    stamp(nodes, "keywords", Value::from(order))
}

/// `questions`: every trimmed fragment ending in `?`, split right after each
/// question mark.
pub fn extract_questions(nodes: Vec<DocNode>) -> Vec<DocNode> {
    let questions: Vec<String> = nodes
        .iter()
        .flat_map(|node| node.text.split_inclusive('?'))
        .map(str::trim)
        .filter(|q| q.ends_with('?'))
        .map(String::from)
        .collect();
    stamp(nodes, "questions", Value::from(questions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn node(text: &str) -> DocNode {
        DocNode {
            id: "n".to_string(),
            text: text.to_string(),
            metadata: Default::default(),
            links: vec![],
        }
    }

    #[test]
    fn test_title() {
        let nodes = extract_title(vec![node("  Title line  \nbody"), node("Other")]);
        assert_eq!(nodes[1].metadata.get("title"), Some(&json!("Title line")));

        let untouched = extract_title(vec![node("\nbody")]);
        assert!(untouched[0].metadata.get("title").is_none());
    }

    #[test]
    fn test_summary() {
        let nodes = extract_summary(vec![node("First. Second."), node("Third.")]);
        assert_eq!(nodes[0].metadata.get("summary"), Some(&json!("First. Second")));
    }

    #[test]
    fn test_keywords_by_frequency() {
        let nodes = extract_keywords(vec![node("dog cat dog bird cat dog an it's")], 2);
        assert_eq!(nodes[0].metadata.get("keywords"), Some(&json!(["dog", "cat"])));
    }

    #[test]
    fn test_keywords_from_contractions_and_mixed_words() {
        let nodes = extract_keywords(vec![node("Don't stop. don't wait. café naïve")], 5);
        assert_eq!(nodes[0].metadata.get("keywords"), Some(&json!(["don", "stop", "wait", "caf"])));
    }

    #[test]
    fn test_keyword_ties_keep_first_seen_order() {
        let nodes = extract_keywords(vec![node("Zebra apple mango")], 5);
        assert_eq!(nodes[0].metadata.get("keywords"), Some(&json!(["zebra", "apple", "mango"])));
    }

    #[test]
    fn test_questions() {
        let nodes = extract_questions(vec![node("Why? Because. How so? Done")]);
        assert_eq!(nodes[0].metadata.get("questions"), Some(&json!(["Why?", "Because. How so?"])));
    }
}
