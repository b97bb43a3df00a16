//! HTTP error mapping.
//!
//! # Invariants
//! - Every failure leaves as `{"error": "..."}` with one status code.
//! - Internal details (SQL, IO) are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use yeyu_core::{DbError, ErrorCategory, RelayError, RepoError, ServiceError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        let status = match value.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Internal => {
                error!("event=request_failed module=server status=error error={value}");
                return Self::internal("internal server error");
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        ServiceError::from(value).into()
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        error!("event=db_unavailable module=server status=error error={value}");
        Self::internal("internal server error")
    }
}

impl From<RelayError> for ApiError {
    fn from(value: RelayError) -> Self {
        let status = StatusCode::from_u16(value.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("event=relay_failed module=server status=error error={value}");
        }
        Self::new(status, value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use yeyu_core::{ContentKind, RelayError, ServiceError};

    #[test]
    fn service_categories_map_to_statuses() {
        let conflict: ApiError = ServiceError::SlugTaken {
            kind: ContentKind::Blog,
            slug: "a".to_string(),
        }
        .into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let missing: ApiError = ServiceError::NotFound {
            entity: "tag",
            id: 3,
        }
        .into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let internal: ApiError = ServiceError::InconsistentState("x").into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "internal server error");
    }

    #[test]
    fn relay_upstream_status_passes_through() {
        let err: ApiError = RelayError::UpstreamStatus {
            status: 429,
            message: "GPT API error: slow down".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.message, "GPT API error: slow down");
    }
}
