// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! convo - terminal chat client for OpenAI-compatible completion endpoints.
//!
//! This crate exposes the runtime used by the `convo` CLI (`src/main.rs`).
//!
//! Architecture:
//! - `chat`: conversation session, message log, request/reply contract
//! - `llm`: wire types, the `CompletionClient` seam, and its implementations
//! - `config`: settings file and credential resolution
//! - `cli`: argument definitions

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;

pub use error::{ConvoError, Result};
