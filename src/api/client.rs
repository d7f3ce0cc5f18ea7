use std::fmt;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    ApiEnvelope, ChatRequest, ConversationSummary, CreateConversationRequest,
    CreateMessageRequest, CreatedMessage, FindConversationsRequest, FindMessagesRequest,
    MessageRecord,
};

/// Errors from talking to the backend. An `ok: false` envelope is not one
/// of these; it comes back as a value.
#[derive(Debug)]
pub enum ClientError {
    /// Client misconfigured (empty or malformed base URL).
    Config(String),
    /// Connection-level failure (DNS, refused, reset, timeout).
    Network(String),
    /// Non-2xx HTTP status.
    Api { status: u16, message: String },
    /// Response body was not the JSON we expected.
    Decode(String),
    /// The chat response has no readable body.
    NoBody,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "config error: {msg}"),
            ClientError::Network(msg) => write!(f, "network error: {msg}"),
            ClientError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ClientError::Decode(msg) => write!(f, "decode error: {msg}"),
            ClientError::NoBody => write!(f, "response has no body"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Raw chat body, chunk by chunk.
pub type ChatStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

/// Everything the chat flow needs from the backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn find_conversations(
        &self,
        tenant_id: Option<&str>,
        user_id: Option<&str>,
        statuses: &[String],
    ) -> Result<ApiEnvelope<Vec<ConversationSummary>>, ClientError>;

    async fn create_conversation(
        &self,
        tenant_id: Option<&str>,
        user_id: Option<&str>,
        title: &str,
    ) -> Result<ApiEnvelope<ConversationSummary>, ClientError>;

    async fn create_message(
        &self,
        conversation_id: &str,
        prompt_text: &str,
    ) -> Result<ApiEnvelope<CreatedMessage>, ClientError>;

    async fn find_messages(
        &self,
        conversation_id: &str,
    ) -> Result<ApiEnvelope<Vec<MessageRecord>>, ClientError>;

    /// Opens the streamed reply for an already created message.
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatStream, ClientError>;
}

/// HTTP client for the wiki chat backend.
pub struct WikiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl WikiClient {
    /// Creates a client rooted at `base_url` (e.g. `http://host/api`).
    /// `token` is sent as a bearer credential when present.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::Config("base URL is empty".to_string()));
        }
        reqwest::Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL {base_url}: {e}")))?;

        Ok(Self {
            base_url: base_url.to_string(),
            token: token.filter(|t| !t.is_empty()),
            client: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts a JSON body and returns the response once its status is 2xx.
    async fn send<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        debug!("{path} response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Backend error on {path}: {status} - {message}");
            return Err(ClientError::Api { status, message });
        }

        Ok(response)
    }

    async fn post_envelope<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(path, body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?;
        if !envelope.ok {
            info!(
                "{path} rejected: {}",
                envelope.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(envelope)
    }
}

#[async_trait]
impl ChatBackend for WikiClient {
    async fn find_conversations(
        &self,
        tenant_id: Option<&str>,
        user_id: Option<&str>,
        statuses: &[String],
    ) -> Result<ApiEnvelope<Vec<ConversationSummary>>, ClientError> {
        let body = FindConversationsRequest {
            tenant_id: tenant_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            statuses: statuses.to_vec(),
        };
        self.post_envelope("/conversation/find-conversations", &body)
            .await
    }

    async fn create_conversation(
        &self,
        tenant_id: Option<&str>,
        user_id: Option<&str>,
        title: &str,
    ) -> Result<ApiEnvelope<ConversationSummary>, ClientError> {
        let body = CreateConversationRequest {
            tenant_id: tenant_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            title: title.to_string(),
        };
        self.post_envelope("/conversation/create-conversation", &body)
            .await
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        prompt_text: &str,
    ) -> Result<ApiEnvelope<CreatedMessage>, ClientError> {
        let body = CreateMessageRequest {
            conversation_id: conversation_id.to_string(),
            prompt_text: prompt_text.to_string(),
        };
        self.post_envelope("/conversation/create-message", &body)
            .await
    }

    async fn find_messages(
        &self,
        conversation_id: &str,
    ) -> Result<ApiEnvelope<Vec<MessageRecord>>, ClientError> {
        let body = FindMessagesRequest {
            conversation_id: conversation_id.to_string(),
        };
        self.post_envelope("/conversation/find-messages", &body)
            .await
    }

    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatStream, ClientError> {
        info!(
            "Opening chat: model={}/{}, assistant_message_id={}, online={}, deep_think={}",
            request.model_provider,
            request.model_name,
            request.assistant_message_id,
            request.is_online,
            request.is_deep_think
        );

        let response = self.send("/conversation/chat", request).await?;
        if response.content_length() == Some(0) {
            warn!("Chat response declared an empty body");
            return Err(ClientError::NoBody);
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ClientError::Network(e.to_string()))
            })
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_base_url() {
        assert!(matches!(
            WikiClient::new("  ", None),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_new_rejects_malformed_base_url() {
        assert!(matches!(
            WikiClient::new("not a url", None),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_new_trims_trailing_slash_and_empty_token() {
        let client = WikiClient::new("http://localhost:3000/api/", Some(String::new())).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 502): bad gateway");
        assert_eq!(ClientError::NoBody.to_string(), "response has no body");
    }
}
