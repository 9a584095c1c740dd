//! Local Ollama backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::TripleExtractor;
use super::parse::parse_triples;
use crate::config::Settings;
use crate::graph::Triple;
use crate::observability::ExtractionSpan;
use crate::{Error, Result};

const NAME: &str = "ollama";
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "\
You extract a compact, visually connected knowledge graph from text.

Return ONLY valid JSON matching this schema:
{
  \"triples\": [
    {\"source\": \"...\", \"relation\": \"...\", \"target\": \"...\"}
  ]
}

Rules:
- Output between 12 and 22 triples.
- Prefer 1-3 hub entities and connect everything to them.
- Reuse entity strings consistently.
- Relations must be short verb phrases (2-6 words), in Spanish if input is Spanish.
- Do NOT invent facts.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: if model.trim().is_empty() {
                crate::config::DEFAULT_OLLAMA_MODEL.to_string()
            } else {
                model
            },
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.ollama_base_url, &settings.ollama_model)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn probe(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let reachable = self
            .http
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);

        if reachable {
            Ok(())
        } else {
            Err(Error::extraction(
                NAME,
                format!("Ollama is not available (expected at {})", self.base_url),
            ))
        }
    }

    async fn chat(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!("Text:\n\"\"\"{}\"\"\"\n\nReturn JSON only.", text),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .timeout(CHAT_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::extraction(NAME, format!("Ollama error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::extraction(
                NAME,
                format!("Ollama error: HTTP {}: {}", status.as_u16(), body.trim()),
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::extraction(NAME, format!("Ollama error: {}", e)))?;

        body.message
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::extraction(NAME, "Ollama returned empty response"))
    }
}

#[async_trait]
impl TripleExtractor for OllamaProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn extract_triples(&self, text: &str) -> Result<Vec<Triple>> {
        let span = ExtractionSpan::new(NAME, &self.model);
        span.record_input(text);

        let result = async {
            self.probe().await?;
            let content = self.chat(text).await?;
            let triples = parse_triples(NAME, &content)?;
            Ok::<_, Error>(
                triples
                    .into_iter()
                    .map(|t| Triple::new(t.source.trim(), t.relation.trim(), t.target.trim()))
                    .collect::<Vec<_>>(),
            )
        }
        .instrument(span.span().clone())
        .await;

        if let Ok(ref triples) = result {
            span.record_triples(triples.len(), triples.len());
        }
        span.finish();
        result
    }
}
