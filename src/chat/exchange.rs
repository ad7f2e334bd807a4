// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Request construction and reply extraction
//!
//! Both directions are pure functions so the session can stay a thin state
//! holder and the contract can be tested without a runtime.

use serde::Deserialize;

use crate::error::{ApiError, ConvoError, Result};
use crate::llm::message::{CompletionRequest, WireMessage};

use super::message::Message;
use super::session::{HistoryMode, SessionOptions};

/// Build the request for a new user turn.
///
/// `history` is the log as it stood before `text` was submitted. Under
/// `HistoryMode::LatestTurn` it is ignored and the request carries exactly the
/// system instruction and `text`.
pub fn build_request(options: &SessionOptions, history: &[Message], text: &str) -> CompletionRequest {
    let mut messages = Vec::with_capacity(2);
    messages.push(WireMessage::system(&options.system_prompt));

    if options.history_mode == HistoryMode::Full {
        messages.reserve(history.len());
        messages.extend(history.iter().map(Message::to_wire));
    }

    messages.push(WireMessage::user(text));
    CompletionRequest::new(&options.model, messages)
}

/// Extract `choices[0].message.content` from a response body.
///
/// Every way the path can fail (bad JSON, missing field, empty array, null or
/// empty content) yields `ApiError::InvalidResponse`.
pub fn parse_reply(body: &str) -> Result<String> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;

    let choice = envelope
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| invalid("No choices in response"))?;

    match choice.message.content {
        Some(content) if !content.is_empty() => Ok(content),
        Some(_) => Err(invalid("Empty reply content")),
        None => Err(invalid("Reply has no content")),
    }
}

fn invalid(reason: impl Into<String>) -> ConvoError {
    ConvoError::Api(ApiError::InvalidResponse(reason.into()))
}

#[derive(Debug, Deserialize)]
struct Envelope {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
