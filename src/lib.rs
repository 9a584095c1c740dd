//! # kg-visualizer
//!
//! Turns free text into a knowledge graph suitable for visualization.
//!
//! A pluggable language-model backend extracts subject–relation–object
//! triples, [`graph::connect_to_hub`] keeps the component around the most
//! connected entity, and [`budget::BudgetGuard`] gates the metered backend
//! behind a monthly spend cap.
//!
//! ```rust,no_run
//! use kg_visualizer::{Provider, Settings, TripleExtractor, connect_to_hub};
//!
//! # async fn example() -> Result<(), kg_visualizer::Error> {
//! let settings = Settings::from_env()?;
//! let provider = Provider::from_name("ollama", &settings)?;
//! let triples = provider.extract_triples("Rust was created at Mozilla.").await?;
//! let graph = connect_to_hub(&triples);
//! println!("{} nodes, {} links", graph.nodes.len(), graph.links.len());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod budget;
pub mod config;
pub mod extract;
pub mod graph;
pub mod observability;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;

pub use budget::{BudgetConfig, BudgetGuard, BudgetStatus, Clock, CostSource, SystemClock};
pub use config::{ConfigError, Settings};
pub use extract::TextExtractor;
pub use graph::{Graph, Link, Node, Triple, connect_to_hub};
pub use providers::{OllamaProvider, OpenAiProvider, Provider, TripleExtractor};

/// Error type for kg-visualizer operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing credential, unknown provider or invalid setting.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The triple extractor was unreachable or returned unusable output.
    #[error("{provider} extraction failed: {message}")]
    Extraction {
        provider: &'static str,
        message: String,
    },

    /// Month-to-date spend reached the configured cap.
    #[error("Monthly budget exceeded ({spent:.2}$ / {limit:.2}$).")]
    BudgetExceeded { spent: f64, limit: f64 },

    /// Fetching or reading a web page failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Request parameters are invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system or socket operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration, credentials or request validation
    Configuration,
    /// Extractor or page content could not be turned into triples/text
    Extraction,
    /// Spend cap reached; the caller may retry next month or after a raise
    ResourceLimit,
    /// Network errors that may succeed on retry
    Transient,
    /// Internal errors (IO, JSON, unexpected states)
    Internal,
}

impl Error {
    pub fn extraction(provider: &'static str, message: impl Into<String>) -> Self {
        Error::Extraction {
            provider,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidRequest(_) => ErrorCategory::Configuration,
            Error::Extraction { .. } | Error::Fetch(_) => ErrorCategory::Extraction,
            Error::BudgetExceeded { .. } => ErrorCategory::ResourceLimit,
            Error::Network(_) => ErrorCategory::Transient,
            Error::Json(_) | Error::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_budget_exceeded(&self) -> bool {
        self.category() == ErrorCategory::ResourceLimit
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
