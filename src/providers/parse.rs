//! Parsing of model replies into triples.
//!
//! Replies may wrap the JSON in markdown fences or surround it with prose.
//! The first well-formed JSON object is taken and validated against
//! [`TripleExtraction`].

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::Triple;
use crate::{Error, Result};

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("valid regex"));
static FENCE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("valid regex"));

/// Structured reply expected from every extractor backend.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TripleExtraction {
    pub triples: Vec<Triple>,
}

pub fn strip_code_fences(content: &str) -> &str {
    let s = content.trim();
    let start = FENCE_OPEN.find(s).map(|m| m.end()).unwrap_or(0);
    let s = &s[start..];
    let end = FENCE_CLOSE.find(s).map(|m| m.start()).unwrap_or(s.len());
    s[..end].trim()
}

/// First `{...}` in `text` that parses as a complete JSON object.
pub fn first_json_object(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(i, _)| {
            let mut values = serde_json::Deserializer::from_str(&text[i..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(value)) if value.is_object() => Some(value),
                _ => None,
            }
        })
}

/// Parses and validates a reply; fields are returned as sent, untrimmed.
pub fn parse_triples(provider: &'static str, content: &str) -> Result<Vec<Triple>> {
    let raw = strip_code_fences(content);

    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => first_json_object(raw)
            .ok_or_else(|| Error::extraction(provider, "model did not return valid JSON"))?,
    };

    let parsed: TripleExtraction = serde_json::from_value(value)
        .map_err(|e| Error::extraction(provider, format!("JSON schema invalid: {}", e)))?;

    for (i, triple) in parsed.triples.iter().enumerate() {
        let empty = [
            ("source", &triple.source),
            ("relation", &triple.relation),
            ("target", &triple.target),
        ]
        .into_iter()
        .find(|(_, v)| v.is_empty());
        if let Some((field, _)) = empty {
            return Err(Error::extraction(
                provider,
                format!("JSON schema invalid: triples[{}].{} is empty", i, field),
            ));
        }
    }

    Ok(parsed.triples)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{"triples": [{"source": "Rust", "relation": "created at", "target": "Mozilla"}]}"#;

    #[test]
    fn test_plain_json() {
        let triples = parse_triples("ollama", REPLY).unwrap();
        assert_eq!(triples, vec![Triple::new("Rust", "created at", "Mozilla")]);
    }

    #[test]
    fn test_fenced_json() {
        let fenced = format!("```JSON\n{}\n```", REPLY);
        assert_eq!(parse_triples("ollama", &fenced).unwrap().len(), 1);
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_json_surrounded_by_prose() {
        let reply = format!("Sure! Here is the graph: {} Let me know {{if}} you need more.", REPLY);
        assert_eq!(parse_triples("ollama", &reply).unwrap().len(), 1);
    }

    #[test]
    fn test_skips_malformed_leading_braces() {
        let reply = format!("{{not json}} {}", REPLY);
        let value = first_json_object(&reply).unwrap();
        assert!(value.get("triples").is_some());
    }

    #[test]
    fn test_no_json_is_an_error() {
        let err = parse_triples("ollama", "I cannot help with that.").unwrap_err();
        assert!(err.to_string().contains("valid JSON"));
    }

    #[test]
    fn test_schema_violations() {
        let missing_field = r#"{"triples": [{"source": "A", "target": "B"}]}"#;
        assert!(parse_triples("ollama", missing_field)
            .unwrap_err()
            .to_string()
            .contains("schema invalid"));

        let empty_field = r#"{"triples": [{"source": "A", "relation": "", "target": "B"}]}"#;
        let err = parse_triples("ollama", empty_field).unwrap_err();
        assert!(err.to_string().contains("triples[0].relation is empty"));

        assert!(parse_triples("ollama", "[1, 2, 3]").is_err());
    }

    #[test]
    fn test_empty_triples_are_valid() {
        assert!(parse_triples("ollama", r#"{"triples": []}"#).unwrap().is_empty());
    }
}
