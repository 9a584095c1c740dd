//! Service settings.
//!
//! Every field maps to an upper-cased environment variable of the same name
//! (`monthly_budget_usd` reads `MONTHLY_BUDGET_USD`). Blank values fall back
//! to the defaults below.

use secrecy::SecretString;

use super::env::EnvReader;
use super::{ConfigError, ConfigResult};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MONTHLY_BUDGET_USD: f64 = 5.0;
pub const DEFAULT_BUDGET_CACHE_SECONDS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_env: String,
    /// Provider used when a request does not name one.
    pub ai_provider: String,
    pub monthly_budget_usd: f64,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub budget_enforce: bool,
    pub budget_cache_seconds: u64,
    /// Admin key for the organization costs endpoint; without it the hard cap is off.
    pub openai_admin_key: Option<SecretString>,
    pub openai_project_id: Option<String>,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub frontend_origin: String,
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_env: "dev".into(),
            ai_provider: DEFAULT_PROVIDER.into(),
            monthly_budget_usd: DEFAULT_MONTHLY_BUDGET_USD,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            budget_enforce: true,
            budget_cache_seconds: DEFAULT_BUDGET_CACHE_SECONDS,
            openai_admin_key: None,
            openai_project_id: None,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.into(),
            ollama_model: DEFAULT_OLLAMA_MODEL.into(),
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from any key → value source; keys are upper-case env names.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader::new(lookup);
        let defaults = Self::default();

        let settings = Self {
            app_env: env.string("app_env", &defaults.app_env),
            ai_provider: env.string("ai_provider", &defaults.ai_provider).to_lowercase(),
            monthly_budget_usd: env.parse("monthly_budget_usd", defaults.monthly_budget_usd)?,
            openai_api_key: env.secret("openai_api_key"),
            openai_model: env.string("openai_model", &defaults.openai_model),
            openai_base_url: env
                .string("openai_base_url", &defaults.openai_base_url)
                .trim_end_matches('/')
                .to_string(),
            budget_enforce: env.flag("budget_enforce", defaults.budget_enforce)?,
            budget_cache_seconds: env
                .parse("budget_cache_seconds", defaults.budget_cache_seconds)?,
            openai_admin_key: env.secret("openai_admin_key"),
            openai_project_id: env.optional("openai_project_id"),
            ollama_base_url: env
                .string("ollama_base_url", &defaults.ollama_base_url)
                .trim_end_matches('/')
                .to_string(),
            ollama_model: env.string("ollama_model", &defaults.ollama_model),
            frontend_origin: env.string("frontend_origin", &defaults.frontend_origin),
            bind_addr: env.string("bind_addr", &defaults.bind_addr),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> ConfigResult<()> {
        if !self.monthly_budget_usd.is_finite() || self.monthly_budget_usd < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "MONTHLY_BUDGET_USD".into(),
                message: format!("{} is not a non-negative amount", self.monthly_budget_usd),
            });
        }
        Ok(())
    }

    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_openai_admin_key(mut self, key: impl Into<String>) -> Self {
        self.openai_admin_key = Some(SecretString::from(key.into()));
        self
    }
}
