//! Chat relay to third-party completion providers.
//!
//! # Responsibility
//! - Validate chat requests at the boundary.
//! - Forward conversations to OpenAI-compatible completion endpoints, whole
//!   or as a delta stream.
//! - Speak the Spark WebSocket protocol with its HMAC-signed handshake URL.
//!
//! # Invariants
//! - No retries: one upstream failure is one caller-visible failure.
//! - Message bodies and credentials are never logged.

pub mod completion;
pub mod spark_ws;
pub mod sse;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RelayResult<T> = Result<T, RelayError>;

/// Relay failure taxonomy.
#[derive(Debug)]
pub enum RelayError {
    /// Caller request is malformed.
    Validation(String),
    /// Required credentials are not configured.
    NotConfigured(&'static str),
    /// Configured relay settings are unusable (bad URL, bad secret).
    InvalidConfig(String),
    /// Upstream answered with a non-success status.
    UpstreamStatus { status: u16, message: String },
    /// Upstream body was not JSON.
    Format(String),
    /// Upstream JSON lacked the expected reply fields.
    MalformedResponse(String),
    /// Upstream reported an error inside an otherwise successful exchange.
    Upstream(String),
    /// HTTP transport failure.
    Transport(reqwest::Error),
    /// WebSocket transport failure, unparseable frame or abnormal close.
    Connection(String),
}

impl RelayError {
    /// HTTP status the outer surface should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::UpstreamStatus { status, .. } => *status,
            _ => 500,
        }
    }
}

impl Display for RelayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotConfigured(what) => write!(f, "missing configuration: {what}"),
            Self::InvalidConfig(message) => write!(f, "invalid relay configuration: {message}"),
            Self::UpstreamStatus { message, .. } => write!(f, "{message}"),
            Self::Format(provider) => write!(f, "{provider} API returned a non-JSON response"),
            Self::MalformedResponse(provider) => {
                write!(f, "{provider} API returned an unexpected response shape")
            }
            Self::Upstream(message) => write!(f, "upstream error: {message}"),
            Self::Transport(err) => write!(f, "upstream request failed: {err}"),
            Self::Connection(message) => write!(f, "connection error: {message}"),
        }
    }
}

impl Error for RelayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A validated relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    /// Parses a caller body of shape `{messages: [{role, content}], stream?}`.
    ///
    /// # Errors
    /// - `Validation` when `messages` is missing, not an array, or holds an
    ///   entry with an unknown role or non-string content.
    pub fn from_json(body: &Value) -> RelayResult<Self> {
        let Some(Value::Array(raw)) = body.get("messages") else {
            return Err(RelayError::Validation("invalid message format".to_string()));
        };

        let messages = raw
            .iter()
            .map(|entry| serde_json::from_value::<ChatMessage>(entry.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RelayError::Validation(format!("invalid message format: {err}")))?;

        let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);
        Ok(Self { messages, stream })
    }

    /// Content of the last message, which the Spark WebSocket variant sends.
    pub fn last_content(&self) -> Option<&str> {
        self.messages.last().map(|message| message.content.as_str())
    }
}
