//! Service configuration loaded from environment variables.
//!
//! ```rust,no_run
//! use kg_visualizer::config::Settings;
//!
//! # fn example() -> Result<(), kg_visualizer::config::ConfigError> {
//! let settings = Settings::from_env()?;
//! println!("default provider: {}", settings.ai_provider);
//! # Ok(())
//! # }
//! ```

mod env;
mod settings;

pub use settings::{
    DEFAULT_BIND_ADDR, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, Settings,
};

use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The environment key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// Required value missing for the requested feature
    #[error("{key} is missing")]
    Missing {
        /// The environment key that was not set
        key: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Missing {
            key: "OPENAI_API_KEY".to_string(),
        };
        assert_eq!(err.to_string(), "OPENAI_API_KEY is missing");
    }
}
