use tokio_util::sync::CancellationToken;
use wikichat::api::{ChatBackend, ChatRequest, ClientError, WikiClient};
use wikichat::core::messages::{Body, Role, Turn};
use wikichat::stream::{StreamEvent, StreamOutcome, pump};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

fn client(server: &MockServer) -> WikiClient {
    WikiClient::new(&format!("{}/api", server.uri()), None).unwrap()
}

fn chat_request() -> ChatRequest {
    ChatRequest {
        prompt_text: "Capital of France?".to_string(),
        model_name: "deepseek-chat".to_string(),
        model_provider: "deepseek".to_string(),
        assistant_message_id: "m-2".to_string(),
        is_online: false,
        is_deep_think: true,
    }
}

/// Opens the chat stream and collects every record the pump delivers.
async fn collect_chat(client: &WikiClient) -> (StreamOutcome, Vec<StreamEvent>) {
    let body = client.open_chat(&chat_request()).await.unwrap();
    let mut events = Vec::new();
    let outcome = pump(body, &CancellationToken::new(), |event| {
        events.push(event);
        true
    })
    .await;
    (outcome, events)
}

// ============================================================================
// Envelope Endpoints
// ============================================================================

#[tokio::test]
async fn test_find_conversations_decodes_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/find-conversations"))
        .and(body_partial_json(serde_json::json!({
            "tenantId": "t-1",
            "statuses": ["active"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "data": [
                {"id": "c1", "title": "Capitals", "status": "active", "updatedAt": "2026-03-01T10:00:00Z"},
                {"id": "c2", "title": "Rivers"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client(&server)
        .find_conversations(Some("t-1"), None, &["active".to_string()])
        .await
        .unwrap();

    let list = envelope.into_result().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].title, "Capitals");
    assert!(list[0].updated_at.is_some());
    assert_eq!(list[1].status, None);
}

#[tokio::test]
async fn test_rejected_envelope_is_a_value_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/create-message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": false,
            "message": "conversation is archived"
        })))
        .mount(&server)
        .await;

    let envelope = client(&server)
        .create_message("c1", "hello")
        .await
        .unwrap();

    assert!(!envelope.ok);
    assert_eq!(
        envelope.into_result(),
        Err("conversation is archived".to_string())
    );
}

#[tokio::test]
async fn test_create_message_accepts_id_alias() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/create-message"))
        .and(body_partial_json(serde_json::json!({
            "conversationId": "c1",
            "promptText": "hello",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "data": {"id": "m-2"}
        })))
        .mount(&server)
        .await;

    let created = client(&server)
        .create_message("c1", "hello")
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(created.assistant_message_id, "m-2");
}

#[tokio::test]
async fn test_find_messages_maps_to_turns() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/find-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "data": [
                {"id": "m-1", "role": "user", "content": "Capital of France?"},
                {"id": "m-2", "role": "assistant", "content": "Paris.", "thinking": "atlas"}
            ]
        })))
        .mount(&server)
        .await;

    let records = client(&server)
        .find_messages("c1")
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let turns: Vec<Turn> = records.into_iter().map(Turn::from).collect();

    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].body, Body::Text("Paris.".to_string()));
    assert_eq!(turns[1].thinking, "atlas");
}

#[tokio::test]
async fn test_http_error_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/find-messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = client(&server).find_messages("c1").await;

    assert!(matches!(
        result,
        Err(ClientError::Api { status: 401, ref message }) if message == "Unauthorized"
    ));
}

#[tokio::test]
async fn test_malformed_envelope_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/find-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client(&server).find_messages("c1").await;
    assert!(matches!(result, Err(ClientError::Decode(_))));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/find-messages"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = WikiClient::new(&format!("{}/api/", server.uri()), Some("secret-token".to_string())).unwrap();
    let envelope = client.find_messages("c1").await.unwrap();
    assert_eq!(envelope.into_result(), Ok(Vec::new()));
}

// ============================================================================
// Chat Stream
// ============================================================================

#[tokio::test]
async fn test_chat_stream_delivers_records_in_order() {
    let server = MockServer::start().await;

    let ndjson = concat!(
        r#"{"type":"retrieve_start","section":"wiki","delta":"searching"}"#,
        "\n",
        r#"{"type":"retrieve_end","section":"wiki","delta":"3 pages"}"#,
        "\n",
        r#"{"type":"thinking","delta":"The atlas says"}"#,
        "\n",
        "this line is not json\n",
        r#"{"type":"answer","delta":"Paris"}"#,
        "\n",
        r#"{"type":"answer","delta":"."}"#,
        "\n",
        r#"{"type":"done"}"#,
    );

    Mock::given(method("POST"))
        .and(path("/api/conversation/chat"))
        .and(body_partial_json(serde_json::json!({
            "assistantMessageId": "m-2",
            "isDeepThink": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .mount(&server)
        .await;

    let (outcome, events) = collect_chat(&client(&server)).await;

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(
        events,
        vec![
            StreamEvent::RetrieveStart {
                section: "wiki".to_string(),
                payload: "searching".to_string(),
            },
            StreamEvent::RetrieveEnd {
                section: "wiki".to_string(),
                payload: "3 pages".to_string(),
            },
            StreamEvent::Thinking("The atlas says".to_string()),
            StreamEvent::Answer("Paris".to_string()),
            StreamEvent::Answer(".".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_chat_with_empty_body_has_no_reader() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/chat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client(&server).open_chat(&chat_request()).await;
    assert!(matches!(result, Err(ClientError::NoBody)));
}

#[tokio::test]
async fn test_chat_http_error_before_stream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversation/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = client(&server).open_chat(&chat_request()).await;
    assert!(matches!(result, Err(ClientError::Api { status: 503, .. })));
}
