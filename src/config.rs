//! Runtime configuration from the environment

use crate::classifier::{DEFAULT_LOOKBACK, MAX_LOOKBACK};
use crate::llm::OpenAIModel;
use thiserror::Error;

pub const DEFAULT_FLUX_LED_BIN: &str = "flux_led";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("unknown model {0:?}")]
    UnknownModel(String),
    #[error("ALFRED_CLASSIFIER_LOOKBACK must be a positive integer, got {0:?}")]
    InvalidLookback(String),
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub openai_api_key: String,
    pub model: OpenAIModel,
    /// Alternate OpenAI-compatible endpoint
    pub base_url: Option<String>,
    /// Replaces the built-in persona prompt
    pub system_prompt: Option<String>,
    pub classifier_lookback: usize,
    /// Lighting is disabled when unset
    pub light_address: Option<String>,
    pub flux_led_bin: String,
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let model = match get("ALFRED_MODEL") {
            Some(name) => OpenAIModel::from_api_name(name.trim())
                .ok_or(ConfigError::UnknownModel(name))?,
            None => OpenAIModel::GPT4oMini,
        };

        let classifier_lookback = match get("ALFRED_CLASSIFIER_LOOKBACK") {
            Some(raw) => parse_lookback(&raw)?,
            None => DEFAULT_LOOKBACK,
        };

        Ok(Self {
            openai_api_key,
            model,
            base_url: get("OPENAI_BASE_URL"),
            system_prompt: get("ALFRED_SYSTEM_PROMPT"),
            classifier_lookback,
            light_address: get("ALFRED_LIGHT_ADDRESS").map(|a| a.trim().to_string()),
            flux_led_bin: get("ALFRED_FLUX_LED_BIN")
                .unwrap_or_else(|| DEFAULT_FLUX_LED_BIN.to_string()),
        })
    }
}

fn parse_lookback(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n.min(MAX_LOOKBACK)),
        _ => Err(ConfigError::InvalidLookback(raw.to_string())),
    }
}

/// Load `.env` from the working directory if there is one
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env"),
    }
}
