//! Typed reads over an environment-style key lookup.
//!
//! Keys are written in dotted or snake case and upper-cased before lookup, so
//! `openai.api_key` and `openai_api_key` both read `OPENAI_API_KEY`.

use std::fmt::Display;
use std::str::FromStr;

use secrecy::SecretString;

use super::{ConfigError, ConfigResult};

fn env_key(key: &str) -> String {
    key.to_uppercase().replace('.', "_")
}

pub(crate) struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub(crate) fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Trimmed value; blank counts as unset.
    pub(crate) fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(&env_key(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    pub(crate) fn secret(&self, key: &str) -> Option<SecretString> {
        self.optional(key).map(SecretString::from)
    }

    pub(crate) fn parse<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: env_key(key),
                message: format!("{:?}: {}", raw, e),
            }),
        }
    }

    pub(crate) fn flag(&self, key: &str, default: bool) -> ConfigResult<bool> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: env_key(key),
                message: format!("{:?} is not a boolean", raw),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn reader(pairs: &[(&str, &str)]) -> EnvReader<impl Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvReader::new(move |k| map.get(k).cloned())
    }

    #[test]
    fn test_env_key_conversion() {
        assert_eq!(env_key("openai.api_key"), "OPENAI_API_KEY");
        assert_eq!(env_key("app_env"), "APP_ENV");
    }

    #[test]
    fn test_blank_is_unset() {
        let env = reader(&[("OPENAI_PROJECT_ID", "   ")]);
        assert_eq!(env.optional("openai_project_id"), None);
        assert_eq!(env.string("openai_project_id", "fallback"), "fallback");
    }

    #[test]
    fn test_flag_values() {
        let env = reader(&[("A", "Yes"), ("B", "0"), ("C", "maybe")]);
        assert!(env.flag("a", false).unwrap());
        assert!(!env.flag("b", true).unwrap());
        assert!(env.flag("missing", true).unwrap());
        assert!(matches!(
            env.flag("c", true),
            Err(ConfigError::InvalidValue { key, .. }) if key == "C"
        ));
    }

    #[test]
    fn test_parse_error_names_key() {
        let env = reader(&[("BUDGET_CACHE_SECONDS", "ten")]);
        let err = env.parse::<u64>("budget_cache_seconds", 600).unwrap_err();
        assert!(err.to_string().contains("BUDGET_CACHE_SECONDS"));
    }
}
