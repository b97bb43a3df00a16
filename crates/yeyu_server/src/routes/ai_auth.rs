//! AI access password check.

use crate::error::{ApiError, ApiResult};
use crate::routes::parse_json;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct AuthRequest {
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct AuthReply {
    success: bool,
}

/// `POST /api/ai-auth`
pub async fn ai_auth(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<AuthReply>> {
    let request: AuthRequest = parse_json(&body)
        .map_err(|_| ApiError::bad_request("malformed request"))?;

    let Some(expected) = state.config().ai_password.as_deref() else {
        return Err(ApiError::internal("AI password is not configured"));
    };
    if request.password != expected {
        info!("event=ai_auth module=server status=denied");
        return Err(ApiError::unauthorized("wrong password"));
    }

    info!("event=ai_auth module=server status=ok");
    Ok(Json(AuthReply { success: true }))
}
