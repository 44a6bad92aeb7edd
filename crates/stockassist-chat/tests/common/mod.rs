//! Scripted chat backend for coordinator tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use stockassist_chat::{ChatApi, ChatError, ChatResult, QueuedOperation, SubmitRequest};
use stockassist_core::{ChatId, OperationId, StatusResponse, UsageSnapshot};

/// One scripted status poll reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Pending,
    Step(&'static str),
    Completed(&'static str),
    Failed(&'static str),
    TransportError,
}

impl Reply {
    fn into_result(self) -> ChatResult<StatusResponse> {
        let value = match self {
            Reply::Pending => serde_json::json!({"status": "pending"}),
            Reply::Step(step) => serde_json::json!({
                "status": "processing",
                "current_step": step,
                "steps": [{"description": "Fetching data"}, {"description": step}]
            }),
            Reply::Completed(text) => serde_json::json!({"status": "completed", "result": text}),
            Reply::Failed(error) => serde_json::json!({"status": "failed", "error": error}),
            Reply::TransportError => {
                return Err(ChatError::transport("HTTP 502 Bad Gateway: upstream"))
            }
        };
        Ok(serde_json::from_value(value).expect("valid status json"))
    }
}

/// Backend that replays a status script, then repeats `fallback`.
pub struct ScriptedApi {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    chat_id: u64,
    submissions: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub usage_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            chat_id: 100,
            submissions: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            usage_calls: AtomicUsize::new(0),
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for ScriptedApi {
    async fn queue(&self, _request: &SubmitRequest) -> ChatResult<QueuedOperation> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(QueuedOperation {
            operation_id: OperationId::new(format!("op-{n}")).expect("non-blank id"),
            chat_id: Some(ChatId::from(self.chat_id)),
            messages_left: Some(9),
            images_left: None,
        })
    }

    async fn status(&self, _operation_id: &OperationId) -> ChatResult<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        reply.into_result()
    }

    async fn usage(&self) -> ChatResult<UsageSnapshot> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(serde_json::json!({
            "messages": {"used": 1, "limit": 10},
            "images": {"used": 0, "limit": 1},
            "next_reset": "2030-01-01T00:00:00"
        }))
        .expect("valid usage json"))
    }
}
