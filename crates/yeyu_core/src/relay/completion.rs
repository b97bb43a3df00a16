//! OpenAI-compatible completion relay.
//!
//! # Responsibility
//! - Build provider-specific request bodies with fixed sampling settings.
//! - Translate upstream failures into [`RelayError`] with a readable message.
//! - Relay replies whole, or as a stream of content deltas.
//!
//! # Invariants
//! - A provider without an API key fails before any upstream call.
//! - The streaming relay stops at the upstream `[DONE]` sentinel and emits
//!   nothing after it.

use crate::relay::sse::{SseDecoder, SseEvent};
use crate::relay::{ChatMessage, RelayError, RelayResult};
use chrono::{SecondsFormat, Utc};
use futures::StreamExt;
use log::{info, warn};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub const RELAY_USER_AGENT: &str = "HappyBlog/1.0";
const SAMPLING_TEMPERATURE: f32 = 0.7;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const STREAM_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionProvider {
    Gpt,
    SparkHttp,
}

impl CompletionProvider {
    pub fn model(self) -> &'static str {
        match self {
            Self::Gpt => "gpt-4.1-mini",
            Self::SparkHttp => "pro",
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Gpt => 4096,
            Self::SparkHttp => 2048,
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            Self::Gpt => "https://tbai.xin/v1/chat/completions",
            Self::SparkHttp => "https://spark-api-open.xf-yun.com/v1/chat/completions",
        }
    }

    /// Name of the environment variable carrying this provider's key.
    pub fn key_variable(self) -> &'static str {
        match self {
            Self::Gpt => "GPT_API_KEY",
            Self::SparkHttp => "SPARK_API_PASSWORD",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Gpt => "GPT",
            Self::SparkHttp => "Spark",
        }
    }

    fn auth_hint(self) -> &'static str {
        match self {
            Self::Gpt => "authentication failed: check that the API key is correct",
            Self::SparkHttp => {
                "authentication failed: check the APIPassword and that the service is enabled"
            }
        }
    }

    fn is_auth_failure(self, message: &str, code: Option<&str>) -> bool {
        match self {
            Self::Gpt => message.contains("Unauthorized") || code == Some("invalid_api_key"),
            Self::SparkHttp => message.contains("AppIdNoAuthError") || code == Some("11200"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: CompletionProvider,
    pub api_url: String,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: CompletionProvider, api_key: Option<String>) -> Self {
        Self {
            provider,
            api_url: provider.default_url().to_string(),
            api_key,
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'static str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

/// Whole (non-streaming) relay reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub content: String,
    /// RFC 3339 time the reply was produced.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

impl ChatReply {
    pub fn now(content: String, model: Option<String>, usage: Option<Value>) -> Self {
        Self {
            content,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            model,
            usage,
        }
    }
}

/// Stream of content deltas; an `Err` item ends the stream.
pub type DeltaStream = ReceiverStream<RelayResult<String>>;

pub struct CompletionClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl CompletionClient {
    pub fn new(config: ProviderConfig) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: ProviderConfig) -> Self {
        Self { http, config }
    }

    pub fn provider(&self) -> CompletionProvider {
        self.config.provider
    }

    /// Fails with `NotConfigured` when the provider has no API key.
    pub fn ensure_configured(&self) -> RelayResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(RelayError::NotConfigured(self.config.provider.key_variable()))
    }

    /// Sends the conversation and returns the complete reply.
    ///
    /// # Errors
    /// - `NotConfigured` when no API key is set.
    /// - `UpstreamStatus` for a non-2xx upstream answer.
    /// - `Format` for a non-JSON body, `MalformedResponse` when
    ///   `choices[0].message` is missing.
    pub async fn complete(&self, messages: &[ChatMessage]) -> RelayResult<ChatReply> {
        let started_at = Instant::now();
        let provider = self.config.provider;
        let response = self.send(messages, false).await?;
        let text = response.text().await?;

        let body: Value = serde_json::from_str(&text)
            .map_err(|_| RelayError::Format(provider.label().to_string()))?;
        let message = body
            .pointer("/choices/0/message")
            .ok_or_else(|| RelayError::MalformedResponse(provider.label().to_string()))?;
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        info!(
            "event=relay_complete module=relay status=ok provider={} duration_ms={}",
            provider.label(),
            started_at.elapsed().as_millis()
        );
        Ok(ChatReply::now(
            content,
            Some(provider.model().to_string()),
            body.get("usage").cloned(),
        ))
    }

    /// Sends the conversation with `stream: true` and relays content deltas.
    ///
    /// Upstream status errors surface here, before any delta is produced.
    /// Must be called within a Tokio runtime.
    pub async fn stream(&self, messages: &[ChatMessage]) -> RelayResult<DeltaStream> {
        let provider = self.config.provider;
        let response = self.send(messages, true).await?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let started_at = Instant::now();
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut forwarded = 0_usize;
            let mut finished = false;

            'relay: while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(
                            "event=relay_stream module=relay status=error provider={} error={err}",
                            provider.label()
                        );
                        let _ = tx.send(Err(RelayError::Transport(err))).await;
                        return;
                    }
                };
                for event in decoder.push(&bytes) {
                    match event {
                        SseEvent::Delta(content) => {
                            if tx.send(Ok(content)).await.is_err() {
                                info!(
                                    "event=relay_stream module=relay status=cancelled provider={}",
                                    provider.label()
                                );
                                return;
                            }
                            forwarded += 1;
                        }
                        SseEvent::Done => {
                            finished = true;
                            break 'relay;
                        }
                    }
                }
            }

            if !finished {
                if let Some(SseEvent::Delta(content)) = decoder.finish() {
                    if tx.send(Ok(content)).await.is_ok() {
                        forwarded += 1;
                    }
                }
            }

            info!(
                "event=relay_stream module=relay status=ok provider={} chunks={forwarded} duration_ms={}",
                provider.label(),
                started_at.elapsed().as_millis()
            );
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> RelayResult<reqwest::Response> {
        let provider = self.config.provider;
        let api_key = self.ensure_configured()?;

        let user = match provider {
            CompletionProvider::Gpt => None,
            CompletionProvider::SparkHttp => {
                Some(format!("user_{}", Utc::now().timestamp_millis()))
            }
        };
        let body = CompletionBody {
            model: provider.model(),
            messages,
            stream,
            temperature: SAMPLING_TEMPERATURE,
            max_tokens: provider.max_tokens(),
            user,
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(USER_AGENT, RELAY_USER_AGENT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                "event=relay_upstream module=relay status=error provider={} http_status={}",
                provider.label(),
                status.as_u16()
            );
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                message: upstream_error_message(provider, &text),
            });
        }
        Ok(response)
    }
}

/// Builds a caller-facing message from an upstream error body.
pub fn upstream_error_message(provider: CompletionProvider, body: &str) -> String {
    let default = format!("{} API request failed", provider.label());
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(parsed) => {
            let message = parsed
                .pointer("/error/message")
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .or_else(|| parsed.get("message").and_then(Value::as_str))
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .unwrap_or(default);
            let code = parsed.pointer("/error/code").map(|code| match code {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
            if provider.is_auth_failure(&message, code.as_deref()) {
                provider.auth_hint().to_string()
            } else {
                message
            }
        }
        Err(_) if body.is_empty() => default,
        Err(_) => body.to_string(),
    };
    format!("{} API error: {detail}", provider.label())
}
