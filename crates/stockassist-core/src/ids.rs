//! Server-assigned identifiers.
//!
//! Both ids are opaque to the client. The server emits operation ids as
//! UUID strings and chat ids as integers, so `ChatId` accepts either
//! representation when decoding and always carries a string.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of one server-side chat operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Create an operation id, rejecting blank input.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidOperationId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Create a chat id, rejecting blank input.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidChatId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ChatId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawChatId {
            Number(u64),
            Text(String),
        }

        match RawChatId::deserialize(deserializer)? {
            RawChatId::Number(n) => Ok(ChatId::from(n)),
            RawChatId::Text(s) => ChatId::new(s).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_rejects_blank() {
        assert!(OperationId::new("  ").is_err());
        assert_eq!(OperationId::new("op-1").unwrap().as_str(), "op-1");
    }

    #[test]
    fn test_chat_id_accepts_number_and_string() {
        let from_number: ChatId = serde_json::from_str("42").unwrap();
        let from_text: ChatId = serde_json::from_str(r#""42""#).unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(from_number.to_string(), "42");
    }

    #[test]
    fn test_chat_id_rejects_empty_string() {
        assert!(serde_json::from_str::<ChatId>(r#""""#).is_err());
    }
}
