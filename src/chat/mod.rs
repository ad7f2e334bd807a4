// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation core: message log, exchange contract, and the session that ties them together.

pub mod exchange;
pub mod message;
pub mod session;

pub use message::{Author, Message};
pub use session::{
    ConversationSession, ExchangeId, ExchangeOutcome, HistoryMode, SessionOptions,
    SessionSnapshot, SubmitPolicy,
};
