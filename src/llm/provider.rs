// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Completion client trait
//!
//! The transport seam between a conversation session and the remote
//! completion endpoint.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::message::CompletionRequest;

/// Stateless request/response transport to a completion endpoint
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Get the client name (e.g., "openai", "mock")
    fn name(&self) -> &str;

    /// Send one request and return the raw response body.
    ///
    /// Only 2xx responses produce `Ok`; the body is not interpreted here so
    /// that envelope parsing stays with the session.
    async fn send(&self, request: &CompletionRequest) -> Result<String>;
}
