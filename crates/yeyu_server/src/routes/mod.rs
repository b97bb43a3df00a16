//! HTTP handlers grouped by surface.

pub mod admin;
pub mod ai_auth;
pub mod chat;
pub mod public;
pub mod search;

use crate::error::{ApiError, ApiResult};
use axum::body::Bytes;
use serde::de::DeserializeOwned;
use yeyu_core::ContentKind;

/// Resolves a `{kind}` path segment; unknown kinds are 404.
pub(crate) fn parse_kind(raw: &str) -> ApiResult<ContentKind> {
    ContentKind::parse(raw)
        .ok_or_else(|| ApiError::not_found(format!("unknown content type `{raw}`")))
}

/// Decodes a JSON request body into `T`, answering 400 on failure.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("invalid request body: {err}")))
}
