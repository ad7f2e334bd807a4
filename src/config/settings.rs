// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for convo
//!
//! Handles loading and saving settings from ~/.convo/settings.json

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chat::session::{HistoryMode, SessionOptions, SubmitPolicy};
use crate::error::{ConvoError, Result};

mod io;
mod validation;

/// Keys accepted by `Settings::set_value`
pub const SETTABLE_KEYS: &[&str] = &[
    "model",
    "base_url",
    "api_key_env",
    "timeout_secs",
    "system_prompt",
    "history_mode",
    "submit_policy",
];

/// Main settings structure, stored in ~/.convo/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Completion endpoint configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Conversation behavior
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Configuration for completion providers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// OpenAI-compatible endpoint configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Full URL of the chat completions endpoint
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. None keeps the transport default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_openai_api_key_env(),
            model: default_openai_model(),
            base_url: default_openai_base_url(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Conversation behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// System instruction sent ahead of the user turn
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Which part of the log is sent with each request
    #[serde(default)]
    pub history_mode: HistoryMode,

    /// What happens when the user submits while a reply is pending
    #[serde(default)]
    pub submit_policy: SubmitPolicy,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_mode: HistoryMode::default(),
            submit_policy: SubmitPolicy::default(),
        }
    }
}

impl Settings {
    /// Session options derived from these settings.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            model: self.providers.openai.model.clone(),
            system_prompt: self.conversation.system_prompt.clone(),
            history_mode: self.conversation.history_mode,
            submit_policy: self.conversation.submit_policy,
        }
    }
}

impl Settings {
    /// Set one value by key, parsing it into the field's type.
    ///
    /// The credential itself is not settable here; it belongs in the
    /// environment variable named by `api_key_env`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let openai = &mut self.providers.openai;
        match key {
            "model" => openai.model = value.to_string(),
            "base_url" => openai.base_url = value.to_string(),
            "api_key_env" => openai.api_key_env = value.to_string(),
            "timeout_secs" => {
                openai.timeout_secs = match value {
                    "" | "none" => None,
                    secs => Some(secs.parse().map_err(|_| {
                        ConvoError::InvalidInput(format!(
                            "timeout_secs must be a whole number of seconds, got '{}'",
                            secs
                        ))
                    })?),
                }
            }
            "system_prompt" => self.conversation.system_prompt = value.to_string(),
            "history_mode" => self.conversation.history_mode = parse_choice(key, value)?,
            "submit_policy" => self.conversation.submit_policy = parse_choice(key, value)?,
            "api_key" => {
                return Err(ConvoError::InvalidInput(format!(
                    "refusing to store the API key from the command line; export ${} instead",
                    openai.api_key_env
                )))
            }
            _ => {
                return Err(ConvoError::InvalidInput(format!(
                    "unknown key '{}' (expected one of: {})",
                    key,
                    SETTABLE_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Parse a snake_case enum value the same way the settings file spells it.
fn parse_choice<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| ConvoError::InvalidInput(format!("invalid value '{}' for {}", value, key)))
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_openai_config_default() {
        let config = OpenAiConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert!(config.base_url.ends_with("/v1/chat/completions"));
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_conversation_config_default() {
        let config = ConversationConfig::default();
        assert_eq!(config.system_prompt, "You are a helpful assistant.");
        assert_eq!(config.history_mode, HistoryMode::LatestTurn);
        assert_eq!(config.submit_policy, SubmitPolicy::Allow);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = OpenAiConfig::default();
        config.api_key = Some("sk-very-secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"providers":{"openai":{"model":"gpt-4o-mini"}}}"#).unwrap();
        assert_eq!(settings.providers.openai.model, "gpt-4o-mini");
        assert_eq!(settings.providers.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(settings.conversation.history_mode, HistoryMode::LatestTurn);
    }

    #[test]
    fn test_history_mode_serializes_snake_case() {
        let settings: Settings = serde_json::from_str(
            r#"{"conversation":{"history_mode":"full","submit_policy":"reject_while_pending"}}"#,
        )
        .unwrap();
        assert_eq!(settings.conversation.history_mode, HistoryMode::Full);
        assert_eq!(
            settings.conversation.submit_policy,
            SubmitPolicy::RejectWhilePending
        );
    }

    #[test]
    fn test_session_options_from_settings() {
        let mut settings = Settings::default();
        settings.providers.openai.model = "local-model".to_string();
        settings.conversation.system_prompt = "Be terse.".to_string();

        let options = settings.session_options();
        assert_eq!(options.model, "local-model");
        assert_eq!(options.system_prompt, "Be terse.");
    }

    #[test]
    fn test_set_value_updates_fields() {
        let mut settings = Settings::default();
        settings.set_value("model", "gpt-4o").unwrap();
        settings.set_value("timeout_secs", "30").unwrap();
        settings.set_value("history_mode", "full").unwrap();
        settings
            .set_value("submit_policy", "reject_while_pending")
            .unwrap();
        settings.set_value("system_prompt", "Be terse.").unwrap();

        assert_eq!(settings.providers.openai.model, "gpt-4o");
        assert_eq!(settings.providers.openai.timeout_secs, Some(30));
        assert_eq!(settings.conversation.history_mode, HistoryMode::Full);
        assert_eq!(
            settings.conversation.submit_policy,
            SubmitPolicy::RejectWhilePending
        );
        assert_eq!(settings.conversation.system_prompt, "Be terse.");

        settings.set_value("timeout_secs", "none").unwrap();
        assert!(settings.providers.openai.timeout_secs.is_none());
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set_value("colour", "blue"),
            Err(ConvoError::InvalidInput(_))
        ));
        assert!(matches!(
            settings.set_value("history_mode", "everything"),
            Err(ConvoError::InvalidInput(_))
        ));
        assert!(matches!(
            settings.set_value("timeout_secs", "soon"),
            Err(ConvoError::InvalidInput(_))
        ));
        assert_eq!(settings.conversation.history_mode, HistoryMode::LatestTurn);
    }

    #[test]
    fn test_set_value_refuses_api_key() {
        let mut settings = Settings::default();
        let err = settings.set_value("api_key", "sk-secret").unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(settings.providers.openai.api_key.is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.providers.openai.model = "gpt-4o".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.providers.openai.model, "gpt-4o");
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.json");

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.providers.openai.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"custom":{"keep":true},"providers":{}}"#).unwrap();

        Settings::default().save_to(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["custom"]["keep"], true);
        assert_eq!(raw["providers"]["openai"]["model"], "gpt-3.5-turbo");
    }
}
