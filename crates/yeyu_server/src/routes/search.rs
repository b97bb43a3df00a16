//! `GET /api/search?q=&type=all|blog|note`

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use yeyu_core::{search_content, SearchHit, SearchQuery, SearchScope, SqliteSearchSource};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default, rename = "type")]
    scope: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let scope = match params.scope.as_deref() {
        None => SearchScope::All,
        Some(raw) => SearchScope::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("unknown search type `{raw}`")))?,
    };
    if params.q.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }

    let query = SearchQuery::new(params.q, scope);
    let hits = state
        .with_store(move |conn| Ok(search_content(&SqliteSearchSource::new(conn), &query)))
        .await?;
    Ok(Json(hits))
}
