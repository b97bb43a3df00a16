//! Spark WebSocket chat relay.
//!
//! # Responsibility
//! - Sign the handshake URL with HMAC-SHA256 over host, date and request line.
//! - Send one request frame and accumulate reply fragments until the final
//!   frame arrives.
//!
//! # Invariants
//! - Only the last message of the conversation is sent upstream.
//! - A frame with a non-zero `header.code` fails the exchange.
//! - Any close other than a normal (1000) close before the final frame is a
//!   connection error.

use crate::relay::{ChatMessage, RelayError, RelayResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use hmac::{Hmac, Mac};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const SPARK_WS_DEFAULT_URL: &str = "wss://spark-api.xf-yun.com/v3.1/chat";
const SPARK_DOMAIN: &str = "generalv3";
const SPARK_TEMPERATURE: f32 = 0.5;
const SPARK_MAX_TOKENS: u32 = 2048;
const FINAL_FRAME_STATUS: i64 = 2;
const EMPTY_REPLY_FALLBACK: &str = "no reply content";
const CLOSED_EMPTY_FALLBACK: &str = "connection closed normally without reply content";

#[derive(Debug, Clone)]
pub struct SparkWsConfig {
    pub host_url: String,
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl SparkWsConfig {
    fn credentials(&self) -> RelayResult<(&str, &str, &str)> {
        fn present<'a>(value: &'a Option<String>, name: &'static str) -> RelayResult<&'a str> {
            value
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .ok_or(RelayError::NotConfigured(name))
        }
        Ok((
            present(&self.app_id, "SPARK_APP_ID")?,
            present(&self.api_key, "SPARK_API_KEY")?,
            present(&self.api_secret, "SPARK_API_SECRET")?,
        ))
    }
}

/// Formats `at` as an RFC 1123 GMT date, the form the signature covers.
pub fn rfc1123_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds the signed handshake URL for `host_url` at `date`.
pub fn build_auth_url(
    host_url: &str,
    api_key: &str,
    api_secret: &str,
    date: &str,
) -> RelayResult<String> {
    let url = Url::parse(host_url)
        .map_err(|err| RelayError::InvalidConfig(format!("bad host url `{host_url}`: {err}")))?;
    let host_name = url
        .host_str()
        .ok_or_else(|| RelayError::InvalidConfig(format!("host url `{host_url}` has no host")))?;
    let host = match url.port() {
        Some(port) => format!("{host_name}:{port}"),
        None => host_name.to_string(),
    };

    let signature_origin = format!("host: {host}\ndate: {date}\nGET {} HTTP/1.1", url.path());
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|err| RelayError::InvalidConfig(format!("hmac init: {err}")))?;
    mac.update(signature_origin.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        "api_key=\"{api_key}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", signature=\"{signature}\""
    );
    let authorization = BASE64.encode(authorization_origin.as_bytes());

    Ok(format!(
        "{host_url}?authorization={}&date={}&host={}",
        urlencoding::encode(&authorization),
        urlencoding::encode(date),
        urlencoding::encode(&host)
    ))
}

#[derive(Debug, Serialize)]
struct RequestFrame<'a> {
    header: RequestHeader<'a>,
    parameter: RequestParameter,
    payload: RequestPayload<'a>,
}

#[derive(Debug, Serialize)]
struct RequestHeader<'a> {
    app_id: &'a str,
    uid: String,
}

#[derive(Debug, Serialize)]
struct RequestParameter {
    chat: ChatParameter,
}

#[derive(Debug, Serialize)]
struct ChatParameter {
    domain: &'static str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct RequestPayload<'a> {
    message: RequestText<'a>,
}

#[derive(Debug, Serialize)]
struct RequestText<'a> {
    text: [TextEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextEntry<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponseFrame {
    #[serde(default)]
    header: Option<ResponseHeader>,
    #[serde(default)]
    payload: Option<ResponsePayload>,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ResponsePayload {
    #[serde(default)]
    choices: Option<ResponseChoices>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoices {
    #[serde(default)]
    text: Vec<ResponseText>,
}

#[derive(Debug, Deserialize)]
struct ResponseText {
    #[serde(default)]
    content: Option<String>,
}

enum FrameOutcome {
    Continue,
    Final,
}

fn apply_frame(raw: &str, reply: &mut String) -> RelayResult<FrameOutcome> {
    let frame: ResponseFrame = serde_json::from_str(raw)
        .map_err(|err| RelayError::Connection(format!("failed to parse response: {err}")))?;

    if let Some(header) = &frame.header {
        if header.code != 0 {
            return Err(RelayError::Upstream(
                header
                    .message
                    .clone()
                    .unwrap_or_else(|| header.code.to_string()),
            ));
        }
    }

    if let Some(content) = frame
        .payload
        .and_then(|payload| payload.choices)
        .and_then(|choices| choices.text.into_iter().next())
        .and_then(|text| text.content)
    {
        reply.push_str(&content);
    }

    match frame.header.and_then(|header| header.status) {
        Some(FINAL_FRAME_STATUS) => Ok(FrameOutcome::Final),
        _ => Ok(FrameOutcome::Continue),
    }
}

pub struct SparkWsClient {
    config: SparkWsConfig,
}

impl SparkWsClient {
    pub fn new(config: SparkWsConfig) -> Self {
        Self { config }
    }

    /// Fails with `NotConfigured` when app id, key or secret is missing.
    pub fn ensure_configured(&self) -> RelayResult<()> {
        self.config.credentials().map(|_| ())
    }

    /// Relays the last message of `messages` and returns the whole reply.
    ///
    /// # Errors
    /// - `NotConfigured` when app id, key or secret is missing.
    /// - `Validation` when `messages` is empty.
    /// - `Upstream` when a frame carries a non-zero code.
    /// - `Connection` for transport errors, bad frames and abnormal closes.
    pub async fn chat(&self, messages: &[ChatMessage]) -> RelayResult<String> {
        let (app_id, api_key, api_secret) = self.config.credentials()?;
        let last = messages
            .last()
            .ok_or_else(|| RelayError::Validation("at least one message is required".to_string()))?;

        let started_at = Instant::now();
        let auth_url = build_auth_url(
            &self.config.host_url,
            api_key,
            api_secret,
            &rfc1123_date(Utc::now()),
        )?;
        let (mut socket, _) = connect_async(auth_url.as_str())
            .await
            .map_err(|err| RelayError::Connection(format!("websocket error: {err}")))?;

        let request = RequestFrame {
            header: RequestHeader {
                app_id,
                uid: format!("user_{}", Utc::now().timestamp_millis()),
            },
            parameter: RequestParameter {
                chat: ChatParameter {
                    domain: SPARK_DOMAIN,
                    temperature: SPARK_TEMPERATURE,
                    max_tokens: SPARK_MAX_TOKENS,
                },
            },
            payload: RequestPayload {
                message: RequestText {
                    text: [TextEntry {
                        role: "user",
                        content: last.content.as_str(),
                    }],
                },
            },
        };
        let encoded = serde_json::to_string(&request)
            .map_err(|err| RelayError::Connection(format!("failed to encode request: {err}")))?;
        socket
            .send(Message::Text(encoded))
            .await
            .map_err(|err| RelayError::Connection(format!("websocket error: {err}")))?;

        let mut reply = String::new();
        while let Some(message) = socket.next().await {
            let message =
                message.map_err(|err| RelayError::Connection(format!("websocket error: {err}")))?;
            match message {
                Message::Text(text) => match apply_frame(&text, &mut reply) {
                    Ok(FrameOutcome::Continue) => {}
                    Ok(FrameOutcome::Final) => {
                        let _ = socket.close(None).await;
                        info!(
                            "event=relay_ws module=relay status=ok duration_ms={}",
                            started_at.elapsed().as_millis()
                        );
                        return Ok(non_empty_or(reply, EMPTY_REPLY_FALLBACK));
                    }
                    Err(err) => {
                        warn!("event=relay_ws module=relay status=error error={err}");
                        let _ = socket.close(None).await;
                        return Err(err);
                    }
                },
                Message::Close(frame) => {
                    let code = frame.as_ref().map(|frame| u16::from(frame.code));
                    if code == Some(1000) {
                        return Ok(non_empty_or(reply, CLOSED_EMPTY_FALLBACK));
                    }
                    let reason = frame
                        .map(|frame| frame.reason.to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "unknown reason".to_string());
                    warn!(
                        "event=relay_ws module=relay status=error close_code={}",
                        code.unwrap_or(1005)
                    );
                    return Err(RelayError::Connection(format!(
                        "closed abnormally: {} {reason}",
                        code.unwrap_or(1005)
                    )));
                }
                _ => {}
            }
        }

        warn!("event=relay_ws module=relay status=error close_code=1006");
        Err(RelayError::Connection(
            "closed abnormally: 1006 stream ended".to_string(),
        ))
    }
}

fn non_empty_or(reply: String, fallback: &str) -> String {
    if reply.is_empty() {
        fallback.to_string()
    } else {
        reply
    }
}
