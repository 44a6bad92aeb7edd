//! REST client for the chat endpoints.

use crate::error::{ChatError, ChatResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use stockassist_core::{ChatId, OperationId, QueueResponse, StatusResponse, UsageSnapshot};
use tracing::debug;
use url::Url;

/// Default timeout for chat API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback when a failed submission carries no server message.
const SUBMIT_FAILED: &str = "Failed to send message.";

/// An image attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Empty for pasted images; a name is generated on upload.
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A message to submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitRequest {
    pub message: String,
    /// Comma-separated symbols, as typed.
    pub symbols: String,
    pub attachments: Vec<Attachment>,
    /// Explicit chat; the active chat is used when `None`.
    pub chat_id: Option<ChatId>,
}

impl SubmitRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_symbols(mut self, symbols: impl Into<String>) -> Self {
        self.symbols = symbols.into();
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_chat(mut self, chat_id: ChatId) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    fn attachment_names(&self) -> impl Iterator<Item = String> + '_ {
        self.attachments.iter().enumerate().map(|(idx, a)| {
            if a.file_name.is_empty() {
                format!("pasted_image_{}.png", idx + 1)
            } else {
                a.file_name.clone()
            }
        })
    }

    /// Display names of the attachments.
    pub fn attachment_labels(&self) -> Vec<String> {
        self.attachment_names().collect()
    }
}

/// A submission the server accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedOperation {
    pub operation_id: OperationId,
    pub chat_id: Option<ChatId>,
    pub messages_left: Option<i64>,
    pub images_left: Option<i64>,
}

impl TryFrom<QueueResponse> for QueuedOperation {
    type Error = ChatError;

    fn try_from(response: QueueResponse) -> ChatResult<Self> {
        if let Some(error) = response.error {
            return Err(ChatError::Transport(error));
        }
        let operation_id = response
            .operation_id
            .ok_or_else(|| ChatError::transport("Queue response is missing operation_id"))?;
        Ok(Self {
            operation_id,
            chat_id: response.chat_id,
            messages_left: response.messages_left,
            images_left: response.images_left,
        })
    }
}

/// Chat endpoints used by the coordinator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /api/chat/queue`.
    async fn queue(&self, request: &SubmitRequest) -> ChatResult<QueuedOperation>;

    /// `GET /api/chat/status/{operation_id}`.
    async fn status(&self, operation_id: &OperationId) -> ChatResult<StatusResponse>;

    /// `GET /api/metrics/usage`.
    async fn usage(&self) -> ChatResult<UsageSnapshot>;
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// `ChatApi` over HTTP.
pub struct HttpChatApi {
    client: Client,
    base_url: Url,
}

impl HttpChatApi {
    pub fn new(base_url: &str) -> ChatResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::transport(format!("Failed to create HTTP client: {e}")))?;
        Self::with_client(client, base_url)
    }

    /// Use a preconfigured client (session cookie, proxy).
    pub fn with_client(client: Client, base_url: &str) -> ChatResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ChatError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ChatError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> ChatResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ChatError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn build_form(request: &SubmitRequest) -> ChatResult<Form> {
        let mut form = Form::new()
            .text("message", request.message.clone())
            .text("symbols", request.symbols.clone());
        if let Some(chat_id) = &request.chat_id {
            form = form.text("chat_id", chat_id.to_string());
        }

        for (attachment, name) in request.attachments.iter().zip(request.attachment_names()) {
            let mut part = Part::bytes(attachment.data.clone()).file_name(name);
            if let Some(content_type) = &attachment.content_type {
                part = part.mime_str(content_type).map_err(|e| {
                    ChatError::transport(format!("Invalid content type {content_type}: {e}"))
                })?;
            }
            form = form.part("images", part);
        }
        Ok(form)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> ChatResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::transport(format!("Failed to read {what} response: {e}")))?;
        if !status.is_success() {
            return Err(ChatError::transport(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| ChatError::transport(format!("Malformed {what} response: {e}")))
    }
}

/// Message for a rejected submission: the server's `error` field when the
/// body is JSON, else the status line.
async fn submit_error(response: Response) -> ChatError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error.unwrap_or_else(|| SUBMIT_FAILED.to_string()),
        Err(_) => format!("Error: {status}"),
    };
    ChatError::Transport(message)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn queue(&self, request: &SubmitRequest) -> ChatResult<QueuedOperation> {
        let url = self.endpoint(&["api", "chat", "queue"])?;
        let form = Self::build_form(request)?;
        debug!(
            %url,
            chat_id = ?request.chat_id,
            attachments = request.attachments.len(),
            "Submitting chat message"
        );

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(submit_error(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::transport(format!("Failed to read queue response: {e}")))?;
        let parsed: QueueResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::transport(format!("Malformed queue response: {e}")))?;
        QueuedOperation::try_from(parsed)
    }

    async fn status(&self, operation_id: &OperationId) -> ChatResult<StatusResponse> {
        let url = self.endpoint(&["api", "chat", "status", operation_id.as_str()])?;
        self.get_json(url, "status").await
    }

    async fn usage(&self) -> ChatResult<UsageSnapshot> {
        let url = self.endpoint(&["api", "metrics", "usage"])?;
        self.get_json(url, "usage").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use stockassist_core::OperationStatus;

    fn api(server: &MockServer) -> HttpChatApi {
        HttpChatApi::new(&server.base_url()).unwrap()
    }

    #[tokio::test]
    async fn test_queue_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/queue");
                then.status(200).json_body(json!({
                    "operation_id": "5f0c-op",
                    "chat_id": 42,
                    "messages_left": 9
                }));
            })
            .await;

        let request = SubmitRequest::new("How is AAPL doing?")
            .with_symbols("AAPL")
            .with_attachment(Attachment {
                file_name: String::new(),
                content_type: Some("image/png".to_string()),
                data: vec![0x89, 0x50, 0x4e, 0x47],
            });
        let queued = api(&server).queue(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(queued.operation_id.as_str(), "5f0c-op");
        assert_eq!(queued.chat_id, Some(ChatId::from(42)));
        assert_eq!(queued.messages_left, Some(9));
    }

    #[tokio::test]
    async fn test_queue_error_prefers_server_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/queue");
                then.status(429).json_body(json!({"error": "Daily message limit reached"}));
            })
            .await;

        let err = api(&server)
            .queue(&SubmitRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Daily message limit reached");
    }

    #[tokio::test]
    async fn test_queue_error_without_json_uses_status_line() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/queue");
                then.status(500).body("<html>oops</html>");
            })
            .await;

        let err = api(&server)
            .queue(&SubmitRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error: 500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_queue_ok_with_error_field_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/queue");
                then.status(200).json_body(json!({"error": "Image limit reached"}));
            })
            .await;

        let err = api(&server)
            .queue(&SubmitRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Transport(ref m) if m == "Image limit reached"));
    }

    #[tokio::test]
    async fn test_queue_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat/queue");
                then.status(200).body("not json");
            })
            .await;

        let err = api(&server)
            .queue(&SubmitRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Malformed queue response"));
    }

    #[tokio::test]
    async fn test_status_and_usage() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/chat/status/op-7");
                then.status(200).json_body(json!({
                    "status": "processing",
                    "current_step": "Analyzing",
                    "steps": [{"description": "Analyzing"}],
                    "created_at": "2024-05-01T10:00:00"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/metrics/usage");
                then.status(200).json_body(json!({
                    "messages": {"used": 3, "limit": 10},
                    "images": {"used": 1, "limit": 5},
                    "next_reset": "2024-05-02T00:00:00"
                }));
            })
            .await;

        let api = api(&server);
        let status = api.status(&OperationId::new("op-7").unwrap()).await.unwrap();
        assert_eq!(status.status, OperationStatus::Processing);
        assert_eq!(status.steps().len(), 1);

        let usage = api.usage().await.unwrap();
        assert_eq!(usage.images.limit, 5);
    }

    #[tokio::test]
    async fn test_status_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/chat/status/missing");
                then.status(404).body("not found");
            })
            .await;

        let err = api(&server)
            .status(&OperationId::new("missing").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_attachment_labels() {
        let request = SubmitRequest::new("x")
            .with_attachment(Attachment {
                file_name: "chart.png".to_string(),
                content_type: None,
                data: Vec::new(),
            })
            .with_attachment(Attachment {
                file_name: String::new(),
                content_type: None,
                data: Vec::new(),
            });
        assert_eq!(
            request.attachment_labels(),
            vec!["chart.png", "pasted_image_2.png"]
        );
    }
}
