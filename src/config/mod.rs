//! Application configuration

pub mod prompts;
pub mod settings;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use prompts::{builtin as prompts_builtin, PromptError, PromptTemplate};
pub use settings::{ConfigError, DisplayConfig, GenerationConfig, Settings, DEFAULT_ENDPOINT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Chat-completions URL
    pub endpoint: String,
    /// Bearer credential, `None` when the configured variable is unset or blank
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let settings = match lookup("HEALTHPK_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                tracing::info!("Loading settings from {}", path.display());
                Settings::from_file(&path)?
            }
            None => Settings::default(),
        };

        let endpoint = lookup("DEEPSEEK_API_URL")
            .filter(|url| !url.trim().is_empty())
            .or_else(|| settings.llm.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let api_key = lookup(settings.llm.api_key_env.as_str()).filter(|key| !key.trim().is_empty());

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            endpoint,
            api_key,
            settings,
        })
    }

    /// The bearer credential, or the name of the variable that should have held it
    pub fn credential(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::Missing(self.settings.llm.api_key_env.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.api_key.is_none());
        assert!(matches!(
            config.credential(),
            Err(ConfigError::Missing(var)) if var == "DEEPSEEK_API_KEY"
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("DEEPSEEK_API_URL", "http://localhost:9000/v1/chat/completions"),
            ("DEEPSEEK_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.endpoint, "http://localhost:9000/v1/chat/completions");
        assert_eq!(config.credential().unwrap(), "sk-test");
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = Config::from_lookup(lookup(&[("DEEPSEEK_API_KEY", "  ")])).unwrap();
        assert!(config.credential().is_err());
    }

    #[test]
    fn test_missing_settings_file_fails_fast() {
        let result = Config::from_lookup(lookup(&[("HEALTHPK_CONFIG", "/nonexistent/healthpk.toml")]));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
