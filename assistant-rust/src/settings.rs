use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

pub const DEFAULT_MODEL_ID: &str = "gemini-3-flash-preview";
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_STORE_DIR: &str = ".genie";
pub const DEFAULT_STORE_KEY: &str = "genie_config";

/// Checked in order; the first non-blank value wins.
const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Runtime configuration of the assistant.
/// # Default Values
/// - `api_key`: `None`
/// - `model_id`: `gemini-3-flash-preview`
/// - `base_url`: `None` (the public Generative Language API)
/// - `temperature`: `0.4`
/// - `max_output_tokens`: `None`
/// - `store_dir`: `.genie`
/// - `store_key`: `genie_config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub api_key: Option<String>,
    pub model_id: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
    /// Directory holding the saved store configuration.
    pub store_dir: PathBuf,
    /// Name of the saved configuration slot.
    pub store_key: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: None,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            store_key: DEFAULT_STORE_KEY.to_string(),
        }
    }
}

impl AssistantSettings {
    /// Reads settings from the process environment, loading a `.env` file
    /// first when one exists.
    ///
    /// Recognized variables: `GEMINI_API_KEY` / `GOOGLE_API_KEY` / `API_KEY`,
    /// `GENIE_MODEL`, `GENIE_BASE_URL`, `GENIE_TEMPERATURE`,
    /// `GENIE_MAX_OUTPUT_TOKENS`, `GENIE_STORE_DIR`, `GENIE_STORE_KEY`.
    /// Unparsable numbers keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: API_KEY_VARS.iter().find_map(|name| value(*name)),
            model_id: value("GENIE_MODEL").unwrap_or(defaults.model_id),
            base_url: value("GENIE_BASE_URL"),
            temperature: value("GENIE_TEMPERATURE")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.temperature),
            max_output_tokens: value("GENIE_MAX_OUTPUT_TOKENS").and_then(|raw| raw.parse().ok()),
            store_dir: value("GENIE_STORE_DIR").map_or(defaults.store_dir, PathBuf::from),
            store_key: value("GENIE_STORE_KEY").unwrap_or(defaults.store_key),
        }
    }

    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
