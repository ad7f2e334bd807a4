// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation log entries

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::message::{Role, WireMessage};

/// Who wrote a log entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn label(&self) -> &'static str {
        match self {
            Author::User => "you",
            Author::Assistant => "assistant",
        }
    }
}

impl From<Author> for Role {
    fn from(author: Author) -> Self {
        match author {
            Author::User => Role::User,
            Author::Assistant => Role::Assistant,
        }
    }
}

/// One turn in the conversation log. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: Uuid,
    text: String,
    author: Author,
}

impl Message {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text)
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Author::Assistant, text)
    }

    fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> Author {
        self.author
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    /// Wire form of this turn
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: self.author.into(),
            content: self.text.clone(),
        }
    }
}
