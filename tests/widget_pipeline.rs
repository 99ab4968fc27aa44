use httpmock::prelude::*;
use ocr_chat::chat_api::{ChatClient, ChatConfig};
use ocr_chat::error::ChatError;
use ocr_chat::notify::{NotificationId, Notifier};
use ocr_chat::prompt::PromptProfile;
use ocr_chat::render::Renderer;
use ocr_chat::transcript::{ChatMessage, ChatRole, GREETING};
use ocr_chat::widget::ChatWidget;
use serde_json::json;

#[derive(Debug, PartialEq)]
enum Note {
    Loading(String),
    Dismissed,
    Success(String),
    Error(String),
}

#[derive(Default)]
struct RecordingNotifier {
    notes: Vec<Note>,
    next: u64,
}

impl Notifier for RecordingNotifier {
    fn loading(&mut self, text: &str) -> NotificationId {
        self.notes.push(Note::Loading(text.to_string()));
        self.next += 1;
        NotificationId(self.next)
    }

    fn dismiss(&mut self, _id: NotificationId) {
        self.notes.push(Note::Dismissed);
    }

    fn success(&mut self, text: &str) {
        self.notes.push(Note::Success(text.to_string()));
    }

    fn error(&mut self, text: &str) {
        self.notes.push(Note::Error(text.to_string()));
    }
}

fn setup(server: &MockServer) -> (ChatWidget, ChatClient) {
    let config = ChatConfig {
        host: server.base_url(),
        api_key: Some("sk-test".to_string()),
        ..ChatConfig::default()
    };
    let widget = ChatWidget::new(
        "Lease agreement between Alice and Bob, rent 900 EUR.",
        config.clone(),
        PromptProfile::Detailed,
        |_| {},
    );
    (widget, ChatClient::new(config).unwrap())
}

#[tokio::test]
async fn mocked_success_ends_with_assistant_reply() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("Lease agreement between Alice and Bob");
        then.status(200)
            .json_body(json!({ "choices": [ { "message": { "content": "Hello" } } ] }));
    });
    let (mut widget, client) = setup(&server);
    let mut notes = RecordingNotifier::default();
    widget.set_input("Who are the parties?");

    assert!(widget.submit(&client, &mut notes).await);

    mock.assert();
    assert!(!widget.is_processing());
    assert!(!widget.transcript().has_placeholder());
    let messages = widget.transcript().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], ChatMessage::assistant(GREETING));
    assert_eq!(messages[1], ChatMessage::user("Who are the parties?"));
    assert_eq!(messages[2], ChatMessage::assistant("Hello"));
    assert_eq!(
        notes.notes,
        vec![
            Note::Loading("Asking the assistant...".to_string()),
            Note::Dismissed,
            Note::Success("Response received".to_string()),
        ]
    );
}

#[tokio::test]
async fn mocked_rate_limit_ends_with_classified_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429)
            .json_body(json!({ "error": { "message": "Too many requests" } }));
    });
    let (mut widget, client) = setup(&server);
    let mut notes = RecordingNotifier::default();
    widget.set_input("What is the rent?");

    widget.submit(&client, &mut notes).await;

    assert!(!widget.is_processing());
    assert!(!widget.transcript().has_placeholder());
    let last = widget.transcript().last().unwrap();
    assert_eq!(last.role, ChatRole::Assistant);
    assert!(last.content.contains("Rate limit exceeded"));
    assert_eq!(
        notes.notes.last(),
        Some(&Note::Error(ChatError::RateLimited.to_string()))
    );
}

#[tokio::test]
async fn submission_is_pending_until_settled() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .json_body(json!({ "choices": [ { "message": { "content": "900 EUR" } } ] }));
    });
    let (mut widget, client) = setup(&server);
    let mut notes = RecordingNotifier::default();

    widget.set_input("Rent?");
    let req = widget.begin_submit(&mut notes).expect("guard passes");
    assert_eq!(widget.transcript().len(), 3);
    assert!(widget.transcript().has_placeholder());

    widget.set_input("Another question");
    assert!(!widget.submit(&client, &mut notes).await);
    mock.assert_hits(0);

    let result = client.complete(&req).await;
    widget.settle(result, &mut notes);

    mock.assert_hits(1);
    assert_eq!(widget.transcript().len(), 3);
    assert_eq!(widget.transcript().last().unwrap().content, "900 EUR");
}

#[tokio::test]
async fn failures_keep_an_audit_trail() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(401);
    });
    let (mut widget, client) = setup(&server);
    let mut notes = RecordingNotifier::default();

    for question in ["one", "two"] {
        widget.set_input(question);
        widget.submit(&client, &mut notes).await;
    }

    let contents: Vec<&str> = widget
        .transcript()
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents.len(), 5);
    assert_eq!(contents[1], "one");
    assert!(contents[2].starts_with("Authentication error"));
    assert_eq!(contents[3], "two");
    assert!(contents[4].starts_with("Authentication error"));
}

#[tokio::test]
async fn assistant_markdown_renders_and_user_markup_does_not() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .json_body(json!({ "choices": [ { "message": { "content": "**bold**" } } ] }));
    });
    let (mut widget, client) = setup(&server);
    let mut notes = RecordingNotifier::default();
    widget.set_input("<i>really</i>?");

    widget.submit(&client, &mut notes).await;
    let html = widget.transcript().to_html(&Renderer::default());

    assert!(html.contains("<strong>bold</strong>"));
    assert!(html.contains("&lt;i&gt;really&lt;/i&gt;?"));
    assert!(!html.contains("<i>"));
}
