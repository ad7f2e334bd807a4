// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use convo::chat::{ConversationSession, ExchangeOutcome, HistoryMode, SubmitPolicy};
use convo::cli::{AskArgs, ChatArgs, ConfigArgs, ConfigCommands};
use convo::config::Settings;
use convo::error::{ConvoError, Result};
use convo::llm::providers::OpenAiClient;

use super::chat_ui::{
    print_failure, print_history, print_new_replies, print_notice, print_prompt,
    print_typing_indicator, print_welcome,
};

/// Apply command-line overrides and build a session against the configured endpoint
fn build_session(
    settings: &Settings,
    model: Option<String>,
    system: Option<String>,
) -> Result<(ConversationSession, String)> {
    let mut settings = settings.clone();
    if let Some(model) = model {
        settings.providers.openai.model = model;
    }
    if let Some(system) = system {
        settings.conversation.system_prompt = system;
    }
    settings.validate()?;

    let client = OpenAiClient::from_settings(&settings)?;
    let endpoint = client.base_url().to_string();
    let session = ConversationSession::new(Arc::new(client), settings.session_options());
    Ok((session, endpoint))
}

/// Run interactive chat mode
pub(super) async fn run_chat(args: ChatArgs, mut settings: Settings) -> Result<()> {
    if args.full_history {
        settings.conversation.history_mode = HistoryMode::Full;
    }
    if args.reject_while_pending {
        settings.conversation.submit_policy = SubmitPolicy::RejectWhilePending;
    }

    let (mut session, endpoint) = build_session(&settings, args.model, args.system)?;
    print_welcome(session.options(), &endpoint)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rendered = 0usize;
    print_prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match line.trim() {
                    "/quit" | "/exit" => break,
                    "/history" => {
                        print_history(session.log())?;
                        print_prompt()?;
                        continue;
                    }
                    "" => {
                        print_prompt()?;
                        continue;
                    }
                    _ => {}
                }

                match session.submit(line) {
                    Ok(_) => {}
                    Err(ConvoError::Busy) => print_notice("still waiting for the previous reply")?,
                    Err(err) => return Err(err),
                }
                rendered = print_new_replies(session.log(), rendered)?;
                if session.awaiting_reply() {
                    print_typing_indicator()?;
                } else {
                    print_prompt()?;
                }
            }
            Some(outcome) = session.next_reply(), if session.awaiting_reply() => {
                rendered = print_new_replies(session.log(), rendered)?;
                if let ExchangeOutcome::Failed { error, .. } = outcome {
                    print_failure(&error)?;
                }
                if session.awaiting_reply() {
                    print_typing_indicator()?;
                }
                print_prompt()?;
            }
        }
    }

    println!();
    Ok(())
}

/// Run single question mode
pub(super) async fn run_ask(args: AskArgs, settings: Settings) -> Result<()> {
    let (mut session, _) = build_session(&settings, args.model, args.system)?;

    session.submit(args.prompt)?;
    match session.next_reply().await {
        Some(ExchangeOutcome::Replied { .. }) => {
            if let Some(reply) = session.log().last() {
                println!("{}", reply.text());
            }
            Ok(())
        }
        Some(ExchangeOutcome::Failed { error, .. }) => Err(ConvoError::NoReply(error)),
        Some(ExchangeOutcome::Ignored { .. }) | None => {
            Err(ConvoError::NoReply("exchange settled without a result".to_string()))
        }
    }
}

/// Show the effective configuration with the credential redacted, or change one value
pub(super) fn run_config(args: ConfigArgs, settings: &Settings, path: Option<&Path>) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_path);

    if let Some(ConfigCommands::Set { key, value }) = args.command {
        let mut updated = settings.clone();
        updated.set_value(&key, &value)?;
        updated.validate()?;
        updated.save_to(&path)?;
        tracing::debug!(target: "convo.config", key = %key, path = %path.display(), "setting saved");
        println!("{} = {}", key, value);
        return Ok(());
    }

    if args.path {
        println!("{}", path.display());
        return Ok(());
    }

    let mut shown = settings.clone();
    if shown.providers.openai.api_key.is_some() {
        shown.providers.openai.api_key = Some("<redacted>".to_string());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&shown)?);

    let openai = &settings.providers.openai;
    let credential = if std::env::var(&openai.api_key_env).is_ok_and(|v| !v.is_empty()) {
        format!("from ${}", openai.api_key_env)
    } else if openai.api_key.is_some() {
        "from settings file".to_string()
    } else {
        format!("missing (set ${})", openai.api_key_env)
    };
    println!("# credential: {}", credential);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn settings_for(server: &MockServer) -> Settings {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(server)
            .await;

        let mut settings = Settings::default();
        settings.providers.openai.api_key_env = "CONVO_CLI_TEST_UNSET_KEY".to_string();
        settings.providers.openai.api_key = Some("test-key".to_string());
        settings.providers.openai.base_url = format!("{}/v1/chat/completions", server.uri());
        settings
    }

    fn ask(prompt: &str) -> AskArgs {
        AskArgs {
            prompt: prompt.to_string(),
            model: None,
            system: None,
        }
    }

    #[tokio::test]
    async fn test_run_ask_returns_error_when_reply_missing() {
        let server = MockServer::start().await;
        let settings = settings_for(&server).await;

        let err = run_ask(ask("hi"), settings).await.unwrap_err();

        assert!(matches!(err, ConvoError::NoReply(_)));
        assert!(err.to_string().contains("Invalid API response"));
    }

    #[test]
    fn test_config_set_persists_and_keeps_unknown_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"custom":{"keep":true}}"#).unwrap();
        let settings = Settings::load_from(&path).unwrap();

        let args = ConfigArgs {
            path: false,
            command: Some(ConfigCommands::Set {
                key: "history_mode".to_string(),
                value: "full".to_string(),
            }),
        };
        run_config(args, &settings, Some(&path)).unwrap();

        let reloaded = Settings::load_from(&path).unwrap();
        assert_eq!(reloaded.conversation.history_mode, HistoryMode::Full);
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["custom"]["keep"], true);
    }

    #[test]
    fn test_config_set_rejects_invalid_value_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let args = ConfigArgs {
            path: false,
            command: Some(ConfigCommands::Set {
                key: "base_url".to_string(),
                value: "ftp://example.com".to_string(),
            }),
        };
        let err = run_config(args, &Settings::default(), Some(&path)).unwrap_err();

        assert!(matches!(err, ConvoError::Config(_)));
        assert!(!path.exists());
    }
}
