// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for convo.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// convo - chat with an OpenAI-compatible model from your terminal
#[derive(Parser, Debug)]
#[command(name = "convo")]
#[command(version, about = "Chat with an OpenAI-compatible model from your terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (defaults to ~/.convo/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive chat session (default when no command given)
    Chat(ChatArgs),

    /// Ask a single question (non-interactive)
    Ask(AskArgs),

    /// Show or change configuration
    Config(ConfigArgs),
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Model to use (overrides settings)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System instruction (overrides settings)
    #[arg(short, long)]
    pub system: Option<String>,

    /// Send the whole conversation with every request
    #[arg(long)]
    pub full_history: bool,

    /// Refuse new input while a reply is pending
    #[arg(long)]
    pub reject_while_pending: bool,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    pub prompt: String,

    /// Model to use (overrides settings)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System instruction (overrides settings)
    #[arg(short, long)]
    pub system: Option<String>,
}

/// Arguments for the config subcommand
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Print only the settings file path
    #[arg(long)]
    pub path: bool,

    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a configuration value and save it
    Set {
        /// Configuration key (e.g., "model", "history_mode")
        key: String,

        /// Value to set
        value: String,
    },
}
