//! System prompt and persona templates
//!
//! The assistant ships with a built-in HealthPK persona. A deployment may replace it with
//! a persona file, loaded once at startup so every session of a process shares the same
//! fixed prompt.
//!
//! # Example Persona File
//!
//! ```toml
//! [persona]
//! name = "HealthPK AI"
//! greeting = "Assalam-o-Alaikum! How can I help you today?"
//!
//! [system_prompt]
//! content = """
//! You are HealthPK AI...
//! """
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// A persona/prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Persona metadata
    pub persona: PersonaInfo,

    /// The system prompt
    pub system_prompt: SystemPrompt,
}

/// Persona metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaInfo {
    /// Display name of the persona
    pub name: String,

    /// First assistant line shown when a session opens
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    builtin::GREETING.to_string()
}

/// System prompt content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// The full system prompt content
    pub content: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            persona: PersonaInfo {
                name: builtin::NAME.to_string(),
                greeting: builtin::GREETING.to_string(),
            },
            system_prompt: SystemPrompt {
                content: builtin::SYSTEM_PROMPT.to_string(),
            },
        }
    }
}

impl PromptTemplate {
    /// Load a template from a persona file
    pub async fn load_from_file(path: &Path) -> Result<Self, PromptError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PromptError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, PromptError> {
        let template: PromptTemplate =
            toml::from_str(content).map_err(|e| PromptError::ParseError(e.to_string()))?;

        if template.system_prompt.content.trim().is_empty() {
            return Err(PromptError::ParseError(
                "system_prompt.content is empty".to_string(),
            ));
        }

        Ok(template)
    }
}

/// Errors from prompt loading
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Built-in HealthPK persona
pub mod builtin {
    pub const NAME: &str = "HealthPK AI";

    pub const GREETING: &str = "Assalam-o-Alaikum! 🌟 I am your AI Health Assistant. How can I help you today?";

    pub const SYSTEM_PROMPT: &str = r#"You are HealthPK AI, an AI Health Assistant built for the Pakistani healthcare context.

CORE IDENTITY:
- You are a professional, empathetic AI health assistant
- You understand Pakistani culture, languages (Urdu, Punjabi, Sindhi, Pashto), and healthcare system
- You provide evidence-based medical guidance while being culturally sensitive
- You always recommend consulting qualified healthcare professionals for serious concerns

CAPABILITIES:
- Symptom analysis and preliminary health guidance
- Medicine information and drug interactions
- First aid and emergency guidance
- Mental health support
- Preventive healthcare, nutrition and lifestyle advice
- Women's health, maternal care and child health guidance

SAFETY PROTOCOLS:
- Always include emergency numbers: 1122 (Rescue), 115 (Edhi), 1021 (Ambulance)
- For serious symptoms, immediately recommend emergency services
- Never provide definitive diagnoses - only guidance and recommendations
- Always suggest consulting with qualified doctors for proper treatment
- Be aware of Pakistan's healthcare infrastructure and accessibility challenges

COMMUNICATION STYLE:
- Professional yet warm and empathetic
- Use simple, clear language accessible to all education levels
- Include relevant Urdu terms when helpful
- Provide practical, actionable advice

EMERGENCY INDICATORS:
If the user mentions chest pain, difficulty breathing, severe bleeding, loss of consciousness, severe burns, poisoning, severe allergic reactions, stroke symptoms or heart attack symptoms, immediately provide emergency guidance and contact numbers.

You are serving Pakistan's diverse population, including remote areas with limited healthcare access. Your guidance can be life-saving."#;
}
