//! Assistant settings loaded from a TOML file
//!
//! Every section is optional; a missing file section falls back to the defaults the
//! assistant ships with.
//!
//! ```toml
//! [llm]
//! model = "deepseek-r1-distill-llama-70b"
//! endpoint = "https://api.deepseek.com/v1/chat/completions"
//! api_key_env = "DEEPSEEK_API_KEY"
//! timeout_secs = 60
//!
//! [generation]
//! max_tokens = 1500
//! temperature = 0.7
//! top_p = 0.9
//!
//! [history]
//! max_messages = 20
//! truncation = "exchanges"
//!
//! [display]
//! base_delay_ms = 400
//! per_char_delay_ms = 15
//! max_delay_ms = 3000
//!
//! [prompt]
//! file = "configs/prompts/healthpk.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conversation::{Truncation, DEFAULT_MAX_MESSAGES};

/// Root settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Completion endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Sampling parameters sent with every request
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Conversation window
    #[serde(default)]
    pub history: HistoryConfig,

    /// Typing-delay hint for the UI
    #[serde(default)]
    pub display: DisplayConfig,

    /// System prompt override
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the completion endpoint or the store cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_messages == 0 {
            return Err(ConfigError::Validation(
                "history.max_messages must be at least 2".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Validation(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }
        if !(self.generation.top_p > 0.0 && self.generation.top_p <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "generation.top_p must be within (0.0, 1.0], got {}",
                self.generation.top_p
            )));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "generation.max_tokens must be positive".into(),
            ));
        }
        if self.display.base_delay_ms > self.display.max_delay_ms {
            return Err(ConfigError::Validation(
                "display.base_delay_ms exceeds display.max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Full chat-completions URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the bearer credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";

fn default_model() -> String {
    "deepseek-r1-distill-llama-70b".to_string()
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Sampling parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Conversation window configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Non-system messages kept per conversation (odd values are rounded up)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    #[serde(default)]
    pub truncation: Truncation,

    /// Seconds without activity before a session is dropped; 0 keeps sessions forever
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

impl HistoryConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            truncation: Truncation::default(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

/// Typing-delay hint: `base + per_char * chars`, capped at `max`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_per_char_delay_ms")]
    pub per_char_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    400
}

fn default_per_char_delay_ms() -> u64 {
    15
}

fn default_max_delay_ms() -> u64 {
    3000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            per_char_delay_ms: default_per_char_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl DisplayConfig {
    /// How long the UI should show the typing indicator before revealing `text`
    pub fn typing_delay(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        let ms = self
            .base_delay_ms
            .saturating_add(self.per_char_delay_ms.saturating_mul(chars))
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// System prompt override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Persona TOML file replacing the built-in prompt
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SETTINGS: &str = r#"
[llm]
model = "deepseek-chat"
endpoint = "http://localhost:8000/v1/chat/completions"
api_key_env = "HEALTHPK_KEY"
timeout_secs = 15

[generation]
max_tokens = 800
temperature = 0.3

[history]
max_messages = 8
truncation = "messages"
idle_timeout_secs = 600

[display]
max_delay_ms = 1000

[prompt]
file = "configs/prompts/healthpk.toml"
"#;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_str(SAMPLE_SETTINGS).unwrap();

        assert_eq!(settings.llm.model, "deepseek-chat");
        assert_eq!(settings.llm.api_key_env, "HEALTHPK_KEY");
        assert_eq!(settings.llm.timeout_secs, 15);
        assert_eq!(settings.generation.max_tokens, 800);
        assert!((settings.generation.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(settings.history.max_messages, 8);
        assert_eq!(settings.history.truncation, Truncation::Messages);
        assert_eq!(
            settings.history.idle_timeout(),
            Some(Duration::from_secs(600))
        );
        assert_eq!(settings.display.max_delay_ms, 1000);
        assert_eq!(settings.display.base_delay_ms, 400);
        assert_eq!(
            settings.prompt.file,
            Some(PathBuf::from("configs/prompts/healthpk.toml"))
        );
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = Settings::from_str("").unwrap();

        assert_eq!(settings.llm.model, "deepseek-r1-distill-llama-70b");
        assert_eq!(settings.llm.api_key_env, "DEEPSEEK_API_KEY");
        assert!(settings.llm.endpoint.is_none());
        assert_eq!(settings.generation.max_tokens, 1500);
        assert_eq!(settings.history.max_messages, 20);
        assert_eq!(settings.history.truncation, Truncation::Exchanges);
        assert_eq!(settings.history.idle_timeout_secs, 1800);
    }

    #[test]
    fn test_zero_idle_timeout_keeps_sessions() {
        let settings = Settings::from_str("[history]\nidle_timeout_secs = 0\n").unwrap();
        assert_eq!(settings.history.idle_timeout(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_window = "[history]\nmax_messages = 0\n";
        assert!(matches!(
            Settings::from_str(zero_window),
            Err(ConfigError::Validation(_))
        ));

        let hot = "[generation]\ntemperature = 3.5\n";
        assert!(matches!(
            Settings::from_str(hot),
            Err(ConfigError::Validation(_))
        ));

        let no_nucleus = "[generation]\ntop_p = 0.0\n";
        assert!(matches!(
            Settings::from_str(no_nucleus),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_typing_delay_is_capped() {
        let display = DisplayConfig::default();

        assert_eq!(display.typing_delay(""), Duration::from_millis(400));
        assert_eq!(display.typing_delay("abcd"), Duration::from_millis(460));
        assert_eq!(
            display.typing_delay(&"x".repeat(10_000)),
            Duration::from_millis(3000)
        );
    }
}
