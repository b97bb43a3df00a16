//! Chat relay endpoints.
//!
//! `POST /api/chat-gpt` and `POST /api/chat-spark` relay to completion
//! providers, whole or as SSE when the body sets `stream: true`.
//! `POST /api/chat` relays the last message over the Spark WebSocket.
//!
//! # Invariants
//! - A streamed reply ends with `data: [DONE]` only when the upstream
//!   finished cleanly. A mid-stream failure ends it with one `error` event
//!   carrying `{"error": ...}` instead.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream;
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use yeyu_core::{ChatReply, ChatRequest, CompletionProvider, RelayError};

const STREAM_DONE: &str = "[DONE]";

/// One relayed delta as sent to the caller.
#[derive(Serialize)]
struct StreamChunk<'a> {
    content: &'a str,
    done: bool,
}

#[derive(Serialize)]
struct StreamFailure {
    error: String,
}

pub async fn chat_gpt(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    relay_completion(&state, CompletionProvider::Gpt, &body).await
}

pub async fn chat_spark(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    relay_completion(&state, CompletionProvider::SparkHttp, &body).await
}

pub async fn chat_ws(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ChatReply>> {
    let client = state.spark_ws();
    client.ensure_configured()?;
    let request = parse_chat_request(&body)?;

    let content = client.chat(&request.messages).await?;
    Ok(Json(ChatReply::now(content, None, None)))
}

async fn relay_completion(
    state: &AppState,
    provider: CompletionProvider,
    body: &Bytes,
) -> ApiResult<Response> {
    let client = state.completion(provider);
    client.ensure_configured()?;
    let request = parse_chat_request(body)?;

    if !request.stream {
        let reply = client.complete(&request.messages).await?;
        return Ok(Json(reply).into_response());
    }

    let deltas = client.stream(&request.messages).await?;
    let events = stream::unfold(Some(deltas), |state| async move {
        let mut deltas = state?;
        let event = match deltas.next().await {
            Some(Ok(content)) => {
                return Some((Ok::<_, Infallible>(delta_event(&content)), Some(deltas)));
            }
            Some(Err(err)) => {
                warn!("event=chat_stream module=server status=error error={err}");
                failure_event(&err)
            }
            None => Event::default().data(STREAM_DONE),
        };
        Some((Ok::<_, Infallible>(event), None))
    });
    Ok(Sse::new(events).into_response())
}

fn delta_event(content: &str) -> Event {
    let chunk = StreamChunk {
        content,
        done: false,
    };
    Event::default().json_data(&chunk).unwrap_or_default()
}

fn failure_event(err: &RelayError) -> Event {
    let failure = StreamFailure {
        error: err.to_string(),
    };
    Event::default()
        .event("error")
        .json_data(&failure)
        .unwrap_or_else(|_| Event::default().event("error"))
}

fn parse_chat_request(body: &Bytes) -> ApiResult<ChatRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("invalid message format"))?;
    Ok(ChatRequest::from_json(&value)?)
}
