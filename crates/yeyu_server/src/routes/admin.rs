//! Administrator routes under `/api/admin`.
//!
//! # Invariants
//! - [`require_admin`] guards every route here.
//! - Validation and conflict checks happen in the core services, before
//!   any write.

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::routes::{parse_json, parse_kind};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::warn;
use serde::Deserialize;
use yeyu_core::{
    ArticleDraft, ContentId, ContentItem, ContentService, Echo, EchoDraft, EchoId, EchoService,
    SqliteContentRepository, SqliteEchoRepository, SqliteTagRepository, Tag, TagId, TagService,
    TagWithCount,
};

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_admin(request.headers()) {
        return next.run(request).await;
    }
    warn!(
        "event=admin_denied module=server status=denied path={}",
        request.uri().path()
    );
    ApiError::unauthorized("admin token required").into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct TextQuery {
    q: Option<String>,
}

impl TextQuery {
    fn text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest {
    is_published: bool,
}

#[derive(Debug, Deserialize)]
struct TagNameRequest {
    name: String,
}

// Content items.

pub async fn list_content(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<TextQuery>,
) -> ApiResult<Json<Vec<ContentItem>>> {
    let kind = parse_kind(&kind)?;
    let items = state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            let items = match query.text() {
                Some(text) => service.query_by_title(kind, text)?,
                None => service.list_all(kind)?,
            };
            Ok(items)
        })
        .await?;
    Ok(Json(items))
}

pub async fn create_content(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ContentItem>)> {
    let kind = parse_kind(&kind)?;
    let draft: ArticleDraft = parse_json(&body)?;
    let item = state
        .with_store(move |conn| {
            let mut service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            Ok(service.create(kind, &draft)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_content(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, ContentId)>,
    body: Bytes,
) -> ApiResult<Json<ContentItem>> {
    let kind = parse_kind(&kind)?;
    let draft: ArticleDraft = parse_json(&body)?;
    let item = state
        .with_store(move |conn| {
            let mut service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            Ok(service.update(kind, id, &draft)?)
        })
        .await?;
    Ok(Json(item))
}

pub async fn delete_content(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, ContentId)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            Ok(service.delete(kind, id)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_content(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, ContentId)>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    let request: PublishRequest = parse_json(&body)?;
    state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            Ok(service.set_published(kind, id, request.is_published)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Tags.

pub async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TextQuery>,
) -> ApiResult<Json<Vec<TagWithCount>>> {
    let tags = state
        .with_store(move |conn| {
            let service = TagService::new(SqliteTagRepository::try_new(conn)?);
            let tags = match query.text() {
                Some(text) => service.query_with_counts(text)?,
                None => service.list_all_with_counts()?,
            };
            Ok(tags)
        })
        .await?;
    Ok(Json(tags))
}

pub async fn create_tag(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let kind = parse_kind(&kind)?;
    let request: TagNameRequest = parse_json(&body)?;
    let tag = state
        .with_store(move |conn| {
            let service = TagService::new(SqliteTagRepository::try_new(conn)?);
            Ok(service.create(kind, &request.name)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn rename_tag(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, TagId)>,
    body: Bytes,
) -> ApiResult<Json<Tag>> {
    let kind = parse_kind(&kind)?;
    let request: TagNameRequest = parse_json(&body)?;
    let tag = state
        .with_store(move |conn| {
            let service = TagService::new(SqliteTagRepository::try_new(conn)?);
            Ok(service.rename(kind, id, &request.name)?)
        })
        .await?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, TagId)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    state
        .with_store(move |conn| {
            let service = TagService::new(SqliteTagRepository::try_new(conn)?);
            Ok(service.delete(kind, id)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Echoes.

pub async fn list_echoes(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TextQuery>,
) -> ApiResult<Json<Vec<Echo>>> {
    let echoes = state
        .with_store(move |conn| {
            let service = EchoService::new(SqliteEchoRepository::try_new(conn)?);
            let echoes = match query.text() {
                Some(text) => service.query_by_content(text)?,
                None => service.list_all()?,
            };
            Ok(echoes)
        })
        .await?;
    Ok(Json(echoes))
}

pub async fn create_echo(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Echo>)> {
    let draft: EchoDraft = parse_json(&body)?;
    let echo = state
        .with_store(move |conn| {
            let service = EchoService::new(SqliteEchoRepository::try_new(conn)?);
            Ok(service.create(&draft)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(echo)))
}

pub async fn update_echo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EchoId>,
    body: Bytes,
) -> ApiResult<Json<Echo>> {
    let draft: EchoDraft = parse_json(&body)?;
    let echo = state
        .with_store(move |conn| {
            let service = EchoService::new(SqliteEchoRepository::try_new(conn)?);
            Ok(service.update(id, &draft)?)
        })
        .await?;
    Ok(Json(echo))
}

pub async fn delete_echo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EchoId>,
) -> ApiResult<StatusCode> {
    state
        .with_store(move |conn| {
            let service = EchoService::new(SqliteEchoRepository::try_new(conn)?);
            Ok(service.delete(id)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_echo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EchoId>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let request: PublishRequest = parse_json(&body)?;
    state
        .with_store(move |conn| {
            let service = EchoService::new(SqliteEchoRepository::try_new(conn)?);
            Ok(service.set_published(id, request.is_published)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
