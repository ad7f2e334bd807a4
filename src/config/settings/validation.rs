// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{ConvoError, Result};

use super::Settings;

impl Settings {
    /// Get the API key for the completion endpoint, checking env var first.
    pub fn get_openai_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.providers.openai.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.providers.openai.api_key.clone())
    }

    /// Resolve the API key or fail with a configuration error naming the variable.
    pub fn require_openai_api_key(&self) -> Result<String> {
        self.get_openai_api_key().ok_or_else(|| {
            ConvoError::Config(format!(
                "no API key found; set {} or providers.openai.api_key in {}",
                self.providers.openai.api_key_env,
                Self::default_path().display()
            ))
        })
    }

    /// Reject settings that cannot produce a usable request.
    pub fn validate(&self) -> Result<()> {
        let openai = &self.providers.openai;
        if openai.model.trim().is_empty() {
            return Err(ConvoError::Config(
                "providers.openai.model must not be empty".to_string(),
            ));
        }
        if !(openai.base_url.starts_with("http://") || openai.base_url.starts_with("https://")) {
            return Err(ConvoError::Config(format!(
                "providers.openai.base_url must be an http(s) URL, got '{}'",
                openai.base_url
            )));
        }
        if openai.timeout_secs == Some(0) {
            return Err(ConvoError::Config(
                "providers.openai.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
