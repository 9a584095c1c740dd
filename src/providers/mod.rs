//! Language-model backends that turn text into triples.

mod ollama;
mod openai;
pub mod parse;
pub mod schema;

pub use ollama::OllamaProvider;
pub use openai::{OpenAiProvider, clean_triples};
pub use parse::{TripleExtraction, parse_triples};

use async_trait::async_trait;

use crate::config::{ConfigError, Settings};
use crate::graph::Triple;
use crate::{Error, Result};

/// Extracts raw triples from free text.
///
/// Output is unvalidated graph input: callers pass it through
/// [`crate::graph::connect_to_hub`] which tolerates blanks and duplicates.
#[async_trait]
pub trait TripleExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract_triples(&self, text: &str) -> Result<Vec<Triple>>;
}

/// Closed set of supported backends.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(OpenAiProvider),
    Ollama(OllamaProvider),
}

impl Provider {
    /// Resolves a provider by name; blank selects `settings.ai_provider`.
    pub fn from_name(name: &str, settings: &Settings) -> Result<Self> {
        let requested = name.trim().to_lowercase();
        let effective = if requested.is_empty() {
            settings.ai_provider.trim().to_lowercase()
        } else {
            requested
        };

        match effective.as_str() {
            "ollama" => Ok(Provider::Ollama(OllamaProvider::from_settings(settings))),
            "openai" => {
                let key = settings
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| ConfigError::Missing {
                        key: "OPENAI_API_KEY".into(),
                    })?;
                Ok(Provider::OpenAi(
                    OpenAiProvider::new(key, &settings.openai_model)
                        .with_base_url(&settings.openai_base_url),
                ))
            }
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }

    /// Whether calls are billed against the monthly budget.
    pub fn is_metered(&self) -> bool {
        matches!(self, Provider::OpenAi(_))
    }
}

#[async_trait]
impl TripleExtractor for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi(p) => p.name(),
            Provider::Ollama(p) => p.name(),
        }
    }

    async fn extract_triples(&self, text: &str) -> Result<Vec<Triple>> {
        match self {
            Provider::OpenAi(p) => p.extract_triples(text).await,
            Provider::Ollama(p) => p.extract_triples(text).await,
        }
    }
}
