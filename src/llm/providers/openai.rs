// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible chat completions client
//!
//! Posts a `CompletionRequest` to a chat completions endpoint and hands the
//! raw body back to the caller. Any server speaking the OpenAI schema works
//! (OpenAI itself, OpenRouter, llama-server, vLLM).

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{ApiError, ConvoError, Result};
use crate::llm::message::CompletionRequest;
use crate::llm::provider::CompletionClient;

use super::common::{
    parse_retry_after_seconds, server_error, transport_error, DEFAULT_RATE_LIMIT_SECS,
};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiClient {
    /// Create a client for the public OpenAI endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    /// Create with a custom endpoint URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Apply a whole-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Build a client from settings, resolving the credential from the environment
    /// or the settings file.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_openai_api_key()?;
        let openai = &settings.providers.openai;
        let client = Self::with_base_url(api_key, &openai.base_url);
        match openai.timeout_secs {
            Some(secs) => client.with_timeout(Duration::from_secs(secs)),
            None => Ok(client),
        }
    }

    /// Endpoint this client posts to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a non-2xx response onto the API error taxonomy
    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> ConvoError {
        let retry_after = || {
            parse_retry_after_seconds(headers)
                .map(|s| s.min(u32::MAX as u64) as u32)
                .unwrap_or(DEFAULT_RATE_LIMIT_SECS)
        };

        let detail = serde_json::from_str::<OpenAiErrorResponse>(body)
            .ok()
            .map(|r| r.error);

        if let Some(detail) = detail {
            match detail.code.as_deref().unwrap_or("") {
                "invalid_api_key" => return ConvoError::Api(ApiError::AuthenticationFailed),
                "model_not_found" => {
                    return ConvoError::Api(ApiError::ModelNotFound(detail.message))
                }
                "rate_limit_exceeded" => {
                    return ConvoError::Api(ApiError::RateLimited(retry_after()))
                }
                _ => {}
            }
            return match status {
                401 | 403 => ConvoError::Api(ApiError::AuthenticationFailed),
                429 => ConvoError::Api(ApiError::RateLimited(retry_after())),
                _ => server_error(status, detail.message),
            };
        }

        match status {
            401 | 403 => ConvoError::Api(ApiError::AuthenticationFailed),
            429 => ConvoError::Api(ApiError::RateLimited(retry_after())),
            _ => server_error(status, body),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String> {
        tracing::debug!(
            target: "convo.llm.openai",
            model = %request.model,
            messages = request.messages.len(),
            "posting completion request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            tracing::debug!(target: "convo.llm.openai", status = status.as_u16(), "completion request rejected");
            return Err(self.parse_error(status.as_u16(), &headers, &body));
        }

        Ok(body)
    }
}

// ===== Error envelope =====

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}
