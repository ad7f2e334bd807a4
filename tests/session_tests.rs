// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io;
use std::sync::{Arc, Mutex};

use convo::chat::{Author, ConversationSession, ExchangeOutcome, SessionOptions};
use convo::llm::message::Role;
use convo::llm::mock_provider::{MockClient, MockReply};

fn session(client: &MockClient) -> ConversationSession {
    ConversationSession::new(Arc::new(client.clone()), SessionOptions::default())
}

fn entries(session: &ConversationSession) -> Vec<(Author, String)> {
    session
        .log()
        .iter()
        .map(|m| (m.author(), m.text().to_string()))
        .collect()
}

#[tokio::test]
async fn test_arithmetic_question_gets_answer() {
    let client = MockClient::new().with_reply(MockReply::body(
        r#"{"choices":[{"message":{"content":"4"}}]}"#,
    ));
    let mut session = session(&client);

    session.submit("2+2?").unwrap();
    assert_eq!(session.log().len(), 1);
    let outcome = session.next_reply().await.unwrap();

    let request = client.recorded_requests();
    assert_eq!(request.len(), 1);
    assert_eq!(request[0].messages[1].content, "2+2?");
    assert!(matches!(outcome, ExchangeOutcome::Replied { .. }));
    assert_eq!(
        entries(&session),
        vec![
            (Author::User, "2+2?".to_string()),
            (Author::Assistant, "4".to_string())
        ]
    );
    assert!(!session.awaiting_reply());
}

#[tokio::test]
async fn test_envelope_without_choices_is_dropped() {
    let client = MockClient::new().with_reply(MockReply::body("{}"));
    let mut session = session(&client);

    session.submit("hi").unwrap();
    let outcome = session.next_reply().await.unwrap();

    assert!(matches!(outcome, ExchangeOutcome::Failed { .. }));
    assert_eq!(entries(&session), vec![(Author::User, "hi".to_string())]);
    assert!(!session.awaiting_reply());
    assert!(session
        .last_error()
        .unwrap()
        .contains("Invalid API response"));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_envelope_without_choices_emits_warning() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    // Current-thread runtime, so the thread-local default covers the await below.
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = MockClient::new().with_reply(MockReply::body("{}"));
    let mut session = session(&client);
    session.submit("hi").unwrap();
    session.next_reply().await.unwrap();

    let output = logs.contents();
    let warning = output
        .lines()
        .find(|line| line.contains("WARN") && line.contains("exchange failed"))
        .unwrap_or_else(|| panic!("no warning emitted, got:\n{}", output));
    assert!(warning.contains("convo.chat.session"));
    assert!(warning.contains("Invalid API response"));
}

#[tokio::test]
async fn test_empty_submission_is_dispatched() {
    let client = MockClient::new();
    let mut session = session(&client);

    session.submit("").unwrap();
    assert_eq!(session.log().len(), 1);
    assert_eq!(session.log()[0].text(), "");

    session.settle().await;
    let request = client.last_request().unwrap();
    assert_eq!(request.messages[1].role, Role::User);
    assert_eq!(request.messages[1].content, "");
}

#[tokio::test]
async fn test_transport_failure_keeps_only_user_turn() {
    let client = MockClient::new()
        .with_reply(MockReply::network("connection refused"))
        .with_reply(MockReply::status(500, "internal error"));
    let mut session = session(&client);

    session.submit("one").unwrap();
    session.settle().await;
    assert_eq!(session.log().len(), 1);
    assert!(!session.awaiting_reply());

    session.submit("two").unwrap();
    session.settle().await;
    assert_eq!(session.log().len(), 2);
    assert!(session.log().iter().all(|m| m.author() == Author::User));
    assert!(session.last_error().unwrap().contains("500"));
}

#[tokio::test]
async fn test_log_growth_per_exchange() {
    let client = MockClient::new()
        .with_response("a")
        .with_reply(MockReply::body("not json"))
        .with_response("c");
    let mut session = session(&client);

    let mut expected = 0;
    for (text, replies) in [("first", true), ("second", false), ("third", true)] {
        session.submit(text).unwrap();
        expected += 1;
        assert_eq!(session.log().len(), expected);

        session.settle().await;
        if replies {
            expected += 1;
        }
        assert_eq!(session.log().len(), expected);
        assert!(!session.awaiting_reply());
    }
}

#[tokio::test]
async fn test_latest_turn_mode_sends_no_history() {
    let client = MockClient::new().with_response("one").with_response("two");
    let mut session = session(&client);

    session.submit("first").unwrap();
    session.settle().await;
    session.submit("second").unwrap();
    session.settle().await;

    for request in client.recorded_requests() {
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
    }
    assert_eq!(
        client.last_request().unwrap().messages[1].content,
        "second"
    );
}

#[tokio::test]
async fn test_existing_entries_never_change() {
    let client = MockClient::new().with_response("reply");
    let mut session = session(&client);

    session.submit("question").unwrap();
    let before = session.log()[0].clone();
    session.settle().await;

    assert_eq!(session.log()[0], before);
}

#[tokio::test]
async fn test_assistant_turns_follow_user_turns() {
    let client = MockClient::new();
    let mut session = session(&client);

    for text in ["a", "b", "c"] {
        session.submit(text).unwrap();
    }
    session.settle().await;

    let first_assistant = session
        .log()
        .iter()
        .position(|m| m.author() == Author::Assistant)
        .unwrap();
    assert!(session.log()[..first_assistant]
        .iter()
        .any(|m| m.author() == Author::User));
    assert_eq!(session.log().len(), 6);
}
