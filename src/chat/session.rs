// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation session
//!
//! Owns the message log and mediates every exchange with the completion
//! client. Network calls run on spawned tasks; their results come back over a
//! channel and are applied by whoever owns the session, so the log and the
//! pending flag are only ever mutated through `&mut self`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{ApiError, ConvoError, Result};
use crate::llm::provider::CompletionClient;

use super::exchange;
use super::message::Message;

/// Which part of the log is sent with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    /// System instruction plus the text just submitted
    #[default]
    LatestTurn,
    /// System instruction plus every log entry
    Full,
}

/// What happens when the user submits while a reply is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    /// Dispatch anyway; replies are applied in completion order
    #[default]
    Allow,
    /// Refuse with `ConvoError::Busy`
    RejectWhilePending,
}

/// Per-session request options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub model: String,
    pub system_prompt: String,
    pub history_mode: HistoryMode,
    pub submit_policy: SubmitPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Settings::default().session_options()
    }
}

/// Ticket for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(u64);

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What applying a reply did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// An assistant turn was appended
    Replied {
        exchange: ExchangeId,
        message_id: Uuid,
    },
    /// The exchange failed; the log is unchanged
    Failed { exchange: ExchangeId, error: String },
    /// The exchange was unknown or already settled
    Ignored { exchange: ExchangeId },
}

/// Read-only view published to observers after every state change
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub log: Vec<Message>,
    pub awaiting_reply: bool,
    pub last_error: Option<String>,
}

struct CompletedExchange {
    exchange: ExchangeId,
    result: Result<String>,
}

/// Conversation state plus the machinery to run exchanges
pub struct ConversationSession {
    client: Arc<dyn CompletionClient>,
    options: SessionOptions,
    log: Vec<Message>,
    in_flight: HashSet<ExchangeId>,
    last_error: Option<String>,
    next_exchange: u64,
    replies_tx: mpsc::UnboundedSender<CompletedExchange>,
    replies_rx: mpsc::UnboundedReceiver<CompletedExchange>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl ConversationSession {
    /// Create an empty session
    pub fn new(client: Arc<dyn CompletionClient>, options: SessionOptions) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            client,
            options,
            log: Vec::new(),
            in_flight: HashSet::new(),
            last_error: None,
            next_exchange: 1,
            replies_tx,
            replies_rx,
            snapshot_tx,
        }
    }

    /// Submit a user turn.
    ///
    /// The user message is appended before the request is dispatched. The
    /// reply arrives later through `next_reply` / `try_next_reply`. Must be
    /// called from within a Tokio runtime.
    pub fn submit(&mut self, text: impl Into<String>) -> Result<ExchangeId> {
        if self.options.submit_policy == SubmitPolicy::RejectWhilePending && self.awaiting_reply() {
            tracing::debug!(target: "convo.chat.session", in_flight = self.in_flight.len(), "submission rejected while reply pending");
            return Err(ConvoError::Busy);
        }

        let text = text.into();
        let request = exchange::build_request(&self.options, &self.log, &text);

        self.log.push(Message::user(text));
        let exchange = ExchangeId(self.next_exchange);
        self.next_exchange += 1;
        self.in_flight.insert(exchange);
        self.last_error = None;
        self.publish();

        tracing::debug!(
            target: "convo.chat.session",
            exchange = %exchange,
            client = self.client.name(),
            messages = request.messages.len(),
            "dispatching exchange"
        );

        let client = Arc::clone(&self.client);
        let tx = self.replies_tx.clone();
        tokio::spawn(async move {
            // A panicking client still settles its exchange.
            let result = match tokio::spawn(async move { client.send(&request).await }).await {
                Ok(result) => result,
                Err(join_err) => Err(ConvoError::Api(ApiError::Network(format!(
                    "completion task aborted: {}",
                    join_err
                )))),
            };
            // The receiver lives as long as the session; a dropped session discards late replies.
            let _ = tx.send(CompletedExchange { exchange, result });
        });

        Ok(exchange)
    }

    /// Apply the result of an exchange.
    ///
    /// `result` is the raw response body or the transport error. Failures of
    /// any kind leave the log untouched and are reported through tracing and
    /// `last_error`.
    pub fn on_reply(&mut self, exchange: ExchangeId, result: Result<String>) -> ExchangeOutcome {
        if !self.in_flight.remove(&exchange) {
            tracing::warn!(target: "convo.chat.session", exchange = %exchange, "reply for unknown or settled exchange ignored");
            return ExchangeOutcome::Ignored { exchange };
        }

        let outcome = match result.and_then(|body| exchange::parse_reply(&body)) {
            Ok(reply) => {
                let message = Message::assistant(reply);
                let message_id = message.id();
                self.log.push(message);
                self.last_error = None;
                tracing::debug!(target: "convo.chat.session", exchange = %exchange, "reply appended");
                ExchangeOutcome::Replied {
                    exchange,
                    message_id,
                }
            }
            Err(err) => {
                tracing::warn!(target: "convo.chat.session", exchange = %exchange, error = %err, "exchange failed");
                let error = err.to_string();
                self.last_error = Some(error.clone());
                ExchangeOutcome::Failed { exchange, error }
            }
        };

        self.publish();
        outcome
    }

    /// Wait for the next completed exchange and apply it.
    ///
    /// Returns `None` when nothing is in flight. Cancel safe.
    pub async fn next_reply(&mut self) -> Option<ExchangeOutcome> {
        if self.in_flight.is_empty() {
            return None;
        }
        let completed = self.replies_rx.recv().await?;
        Some(self.on_reply(completed.exchange, completed.result))
    }

    /// Apply a completed exchange if one is ready, without waiting.
    pub fn try_next_reply(&mut self) -> Option<ExchangeOutcome> {
        let completed = self.replies_rx.try_recv().ok()?;
        Some(self.on_reply(completed.exchange, completed.result))
    }

    /// Wait until every in-flight exchange has settled.
    pub async fn settle(&mut self) -> Vec<ExchangeOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_reply().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Ordered, append-only message log
    pub fn log(&self) -> &[Message] {
        &self.log
    }

    /// True while at least one exchange is outstanding
    pub fn awaiting_reply(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Number of outstanding exchanges
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Error from the most recent failed exchange, cleared by the next submission or reply
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Current state as an owned snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            log: self.log.clone(),
            awaiting_reply: self.awaiting_reply(),
            last_error: self.last_error.clone(),
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
