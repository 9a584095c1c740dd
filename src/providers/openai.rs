//! OpenAI backend using the Responses API with strict structured output.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::Instrument;

use super::TripleExtractor;
use super::parse::{TripleExtraction, parse_triples};
use super::schema::strict_schema;
use crate::config::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::graph::Triple;
use crate::observability::ExtractionSpan;
use crate::{Error, Result};

const NAME: &str = "openai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_OUTPUT_TOKENS: u32 = 600;
const MIN_ENTITY_CHARS: usize = 3;

/// Pronouns that make useless graph entities.
const STOP_ENTITIES: &[&str] = &[
    "esto", "esta", "este", "esa", "ese", "ello", "él", "ella", "ellos", "ellas", "it", "this",
    "that",
];

const SYSTEM_PROMPT: &str = "\
You extract a compact, visually connected knowledge graph from text.

Rules:
- First, identify 1 to 3 CENTRAL HUB entities (organizations, concepts or people).
- ALL triples must connect to at least one of these hubs.
- Output between 12 and 22 triples total.
- Reuse entity names exactly (no synonyms, no abbreviations).
- Avoid generic entities unless they are hubs.
- Relations must be short verb phrases (2-6 words), in Spanish if the input is Spanish.
- Do NOT invent facts.
- The goal is a single connected graph suitable for visualization.";

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText {
        text: String,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            model: if model.trim().is_empty() {
                DEFAULT_OPENAI_MODEL.to_string()
            } else {
                model
            },
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "input": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": format!(
                        "Text:\n\"\"\"{}\"\"\"\n\nExtract a compact connected graph following the rules.",
                        text
                    ),
                },
            ],
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": "triple_extraction",
                    "schema": strict_schema::<TripleExtraction>(),
                    "strict": true,
                }
            },
            "max_output_tokens": MAX_OUTPUT_TOKENS,
        })
    }

    async fn respond(&self, text: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/v1/responses", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| Error::extraction(NAME, format!("OpenAI error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorReply>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::extraction(
                NAME,
                format!("HTTP {}: {}", status.as_u16(), message.trim()),
            ));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|e| Error::extraction(NAME, format!("unreadable response: {}", e)))?;
        output_text(reply)
    }
}

fn output_text(reply: ResponsesReply) -> Result<String> {
    let mut text = String::new();
    for content in reply.output.into_iter().flat_map(|item| item.content) {
        match content {
            OutputContent::OutputText { text: chunk } => text.push_str(&chunk),
            OutputContent::Refusal { refusal } => {
                return Err(Error::extraction(NAME, format!("model refused: {}", refusal)));
            }
            OutputContent::Other => {}
        }
    }

    if text.trim().is_empty() {
        return Err(Error::extraction(NAME, "empty response"));
    }
    Ok(text)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes model output into graph-worthy triples.
///
/// Whitespace is collapsed; triples with a blank field, a pronoun entity or an
/// entity shorter than three characters are dropped, as are case-insensitive
/// duplicates after the first.
pub fn clean_triples(triples: Vec<Triple>) -> Vec<Triple> {
    let mut seen = HashSet::new();
    let mut clean = Vec::with_capacity(triples.len());

    for triple in triples {
        let source = collapse_whitespace(&triple.source);
        let relation = collapse_whitespace(&triple.relation);
        let target = collapse_whitespace(&triple.target);

        if source.is_empty() || relation.is_empty() || target.is_empty() {
            continue;
        }

        let (s, r, t) = (
            source.to_lowercase(),
            relation.to_lowercase(),
            target.to_lowercase(),
        );
        if STOP_ENTITIES.contains(&s.as_str()) || STOP_ENTITIES.contains(&t.as_str()) {
            continue;
        }
        if source.chars().count() < MIN_ENTITY_CHARS || target.chars().count() < MIN_ENTITY_CHARS {
            continue;
        }
        if !seen.insert((s, r, t)) {
            continue;
        }

        clean.push(Triple::new(source, relation, target));
    }

    clean
}

#[async_trait]
impl TripleExtractor for OpenAiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn extract_triples(&self, text: &str) -> Result<Vec<Triple>> {
        let span = ExtractionSpan::new(NAME, &self.model);
        span.record_input(text);

        let result = async {
            let content = self.respond(text).await?;
            let raw = parse_triples(NAME, &content)?;
            let parsed = raw.len();
            let clean = clean_triples(raw);
            if clean.len() < parsed {
                tracing::debug!(parsed, kept = clean.len(), "dropped low-quality triples");
            }
            Ok::<_, Error>((parsed, clean))
        }
        .instrument(span.span().clone())
        .await;

        let result = result.map(|(parsed, clean)| {
            span.record_triples(parsed, clean.len());
            clean
        });
        span.finish();
        result
    }
}
