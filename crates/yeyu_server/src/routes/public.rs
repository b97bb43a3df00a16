//! Read-through GET routes.
//!
//! Every route serves published rows only, unless the caller presents the
//! admin bearer token.

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::routes::parse_kind;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use yeyu_core::{
    ContentItem, ContentKind, ContentPage, ContentService, Echo, EchoService,
    SqliteContentRepository, SqliteEchoRepository, SqliteTagRepository, Tag, TagId, TagService,
    TagWithCount,
};

pub async fn blog_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ContentItem>>> {
    list_items(&state, &headers, ContentKind::Blog).await
}

pub async fn note_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ContentItem>>> {
    list_items(&state, &headers, ContentKind::Note).await
}

pub async fn blog_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    list_tags(&state, ContentKind::Blog).await
}

pub async fn note_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    list_tags(&state, ContentKind::Note).await
}

pub async fn all_echoes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Echo>>> {
    let admin = state.is_admin(&headers);
    let echoes = state
        .with_store(move |conn| {
            let service = EchoService::new(SqliteEchoRepository::try_new(conn)?);
            let echoes = if admin {
                service.list_all()?
            } else {
                service.list_published()?
            };
            Ok(echoes)
        })
        .await?;
    Ok(Json(echoes))
}

pub async fn all_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<TagWithCount>>> {
    let tags = state
        .with_store(|conn| {
            let service = TagService::new(SqliteTagRepository::try_new(conn)?);
            Ok(service.list_all_with_counts()?)
        })
        .await?;
    Ok(Json(tags))
}

/// `GET /api/content/{kind}/{slug}`
pub async fn item_by_slug(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((kind, slug)): ApiPath<(String, String)>,
) -> ApiResult<Json<ContentItem>> {
    let kind = parse_kind(&kind)?;
    let admin = state.is_admin(&headers);
    let found = state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            let item = if admin {
                service.get_by_slug(kind, &slug)?
            } else {
                service.get_published_by_slug(kind, &slug)?
            };
            item.ok_or_else(|| ApiError::not_found(format!("{kind} `{slug}` not found")))
        })
        .await?;
    Ok(Json(found))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
    tag_id: Option<TagId>,
}

/// `GET /api/pages/{kind}?page=&limit=&tagId=`
pub async fn published_page(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<ContentPage>> {
    let kind = parse_kind(&kind)?;
    let page = state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            Ok(service.list_published_page(
                kind,
                params.page.unwrap_or(1),
                params.limit,
                params.tag_id,
            )?)
        })
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Default, Deserialize)]
pub struct TaggedParams {
    #[serde(default)]
    names: String,
}

/// `GET /api/tagged/{kind}?names=a,b`
pub async fn tagged_items(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(params): ApiQuery<TaggedParams>,
) -> ApiResult<Json<Vec<ContentItem>>> {
    let kind = parse_kind(&kind)?;
    let names: Vec<String> = params.names.split(',').map(str::to_string).collect();
    let items = state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            Ok(service.list_by_tag_names(kind, &names)?)
        })
        .await?;
    Ok(Json(items))
}

async fn list_items(
    state: &AppState,
    headers: &HeaderMap,
    kind: ContentKind,
) -> ApiResult<Json<Vec<ContentItem>>> {
    let admin = state.is_admin(headers);
    let items = state
        .with_store(move |conn| {
            let service = ContentService::new(SqliteContentRepository::try_new(conn)?);
            let items = if admin {
                service.list_all(kind)?
            } else {
                service.list_published(kind)?
            };
            Ok(items)
        })
        .await?;
    Ok(Json(items))
}

async fn list_tags(state: &AppState, kind: ContentKind) -> ApiResult<Json<Vec<Tag>>> {
    let tags = state
        .with_store(move |conn| {
            let service = TagService::new(SqliteTagRepository::try_new(conn)?);
            Ok(service.list(kind)?)
        })
        .await?;
    Ok(Json(tags))
}
