// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! convo - chat with an OpenAI-compatible model from your terminal
//!
//! Entry point for the convo CLI application.

use std::process::ExitCode;

use clap::Parser;

use convo::cli::{ChatArgs, Cli, Commands};
use convo::config::Settings;
use convo::error::Result;

#[path = "main/chat_ui.rs"]
mod chat_ui;
#[path = "main/cli_commands.rs"]
mod cli_commands;

use cli_commands::{run_ask, run_chat, run_config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Tracing goes to stderr so it never interleaves with the conversation on stdout.
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` enables session and transport diagnostics. `RUST_LOG` still takes precedence.
    if cli.verbose > 0 {
        for directive in [
            "convo.chat.session=debug",
            "convo.llm.openai=debug",
            "convo.config=debug",
        ] {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match cli.config.as_deref() {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        None => run_chat(ChatArgs::default(), settings).await,
        Some(Commands::Chat(args)) => run_chat(args, settings).await,
        Some(Commands::Ask(args)) => run_ask(args, settings).await,
        Some(Commands::Config(args)) => run_config(args, &settings, cli.config.as_deref()),
    }
}
