// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};

use crossterm::{
    style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
    ExecutableCommand,
};

use convo::chat::{Author, Message, SessionOptions};
use convo::error::Result;

/// Print the banner shown when an interactive session starts
pub(super) fn print_welcome(options: &SessionOptions, endpoint: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    println!("convo v{}", env!("CARGO_PKG_VERSION"));
    stdout.execute(ResetColor)?;
    println!("Model: {}", options.model);
    println!("Endpoint: {}", endpoint);
    println!("Type /history to reprint the conversation, /quit to exit.");
    println!();
    Ok(())
}

/// Print the input prompt
pub(super) fn print_prompt() -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    print!("you: ");
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

/// Print one log entry
pub(super) fn print_message(message: &Message) -> Result<()> {
    let mut stdout = io::stdout();
    let color = match message.author() {
        Author::User => Color::Green,
        Author::Assistant => Color::Cyan,
    };
    stdout.execute(SetForegroundColor(color))?;
    print!("{}: ", message.author().label());
    stdout.execute(ResetColor)?;
    println!("{}", message.text());
    Ok(())
}

/// Print log entries from `from` onward, skipping user turns the terminal already echoed.
/// Returns the new render cursor.
pub(super) fn print_new_replies(log: &[Message], from: usize) -> Result<usize> {
    for message in log.iter().skip(from).filter(|m| !m.is_user()) {
        print_message(message)?;
    }
    Ok(log.len())
}

/// Reprint the whole conversation
pub(super) fn print_history(log: &[Message]) -> Result<()> {
    if log.is_empty() {
        print_notice("(no messages yet)")?;
        return Ok(());
    }
    for message in log {
        print_message(message)?;
    }
    Ok(())
}

pub(super) fn print_typing_indicator() -> Result<()> {
    print_notice("assistant is typing...")
}

/// Report a failed exchange outside the log
pub(super) fn print_failure(error: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Red))?;
    println!("(no reply: {})", error);
    stdout.execute(ResetColor)?;
    Ok(())
}

pub(super) fn print_notice(text: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetAttribute(Attribute::Dim))?;
    stdout.execute(SetAttribute(Attribute::Italic))?;
    println!("{}", text);
    stdout.execute(SetAttribute(Attribute::Reset))?;
    Ok(())
}
