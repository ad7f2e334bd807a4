// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock completion client for testing
//!
//! Provides a configurable mock implementation of the CompletionClient trait
//! that can be used in tests without making real API calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{ApiError, ConvoError, Result};
use crate::llm::message::CompletionRequest;
use crate::llm::provider::CompletionClient;

/// A mock completion client for testing
#[derive(Clone)]
pub struct MockClient {
    /// Client name
    name: String,
    /// Queued replies, consumed front to back
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A pre-configured outcome for one `send` call
#[derive(Clone, Debug)]
pub struct MockReply {
    /// What the call produces
    pub outcome: MockOutcome,
    /// Simulated latency before the outcome is returned
    pub delay: Option<Duration>,
}

/// Outcome of a mocked call
#[derive(Clone, Debug)]
pub enum MockOutcome {
    /// 2xx with this raw body
    Body(String),
    /// Non-2xx status with this body
    Status(u16, String),
    /// Transport failure
    Network(String),
}

impl MockReply {
    /// A well-formed envelope carrying `text` as the assistant reply
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self::body(completion_body(&text))
    }

    /// An arbitrary raw 2xx body
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Body(body.into()),
            delay: None,
        }
    }

    /// A non-2xx response
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Status(status, body.into()),
            delay: None,
        }
    }

    /// A transport failure
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Network(message.into()),
            delay: None,
        }
    }

    /// Delay this reply
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Render a minimal chat completions envelope around `text`
pub fn completion_body(text: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    /// Create a new mock client. With nothing queued it answers "Mock response".
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Queue a text reply
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.with_reply(MockReply::text(text))
    }

    /// Queue an arbitrary reply
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Queue a reply on a shared handle
    pub fn push(&self, reply: MockReply) {
        lock_recovering(&self.replies).push_back(reply);
    }

    /// Get the number of times send() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        lock_recovering(&self.recorded_requests).clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock_recovering(&self.recorded_requests).last().cloned()
    }

    fn next_reply(&self) -> MockReply {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock_recovering(&self.replies)
            .pop_front()
            .unwrap_or_else(|| MockReply::text("Mock response"))
    }
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock client lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String> {
        lock_recovering(&self.recorded_requests).push(request.clone());
        let reply = self.next_reply();

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        match reply.outcome {
            MockOutcome::Body(body) => Ok(body),
            MockOutcome::Status(status, message) => {
                Err(ConvoError::Api(ApiError::ServerError { status, message }))
            }
            MockOutcome::Network(message) => Err(ConvoError::Api(ApiError::Network(message))),
        }
    }
}
