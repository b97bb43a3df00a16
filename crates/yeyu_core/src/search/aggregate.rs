//! Multi-kind search aggregator.
//!
//! # Invariants
//! - Blank queries return no hits and never touch the store.
//! - Only published items are returned.
//! - Hits are ordered by `created_at` descending and capped at the query limit.
//! - A failing lookup for one kind is logged and contributes no hits; the
//!   other kinds are still returned.

use crate::db::DbError;
use crate::model::content::{ContentId, ContentKind};
use crate::repo::content_repo::load_tags_for_item;
use crate::repo::{like_contains_pattern, RepoError};
use log::{info, warn};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub const SEARCH_PER_KIND_LIMIT: u32 = 20;
pub const SEARCH_RESULT_LIMIT: usize = 20;

pub type SearchResult<T> = Result<T, SearchError>;

/// Failure of one per-kind lookup.
#[derive(Debug)]
pub enum SearchError {
    Db(DbError),
    Repo(RepoError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for SearchError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Which content kinds a search covers. Reading notes are never searched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    #[default]
    All,
    Blog,
    Note,
}

impl SearchScope {
    /// Parses `all|blog|note`; anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "blog" => Some(Self::Blog),
            "note" => Some(Self::Note),
            _ => None,
        }
    }

    pub fn kinds(self) -> &'static [ContentKind] {
        match self {
            Self::All => &[ContentKind::Blog, ContentKind::Note],
            Self::Blog => &[ContentKind::Blog],
            Self::Note => &[ContentKind::Note],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub scope: SearchScope,
    /// Cap applied to each kind's lookup.
    pub per_kind_limit: u32,
    /// Cap applied to the merged result.
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, scope: SearchScope) -> Self {
        Self {
            text: text.into(),
            scope,
            per_kind_limit: SEARCH_PER_KIND_LIMIT,
            limit: SEARCH_RESULT_LIMIT,
        }
    }
}

/// One search hit. `content` is the full body so callers can build excerpts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: ContentId,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub created_at: i64,
    pub tags: Vec<String>,
}

/// Per-kind lookup seam used by [`search_content`].
pub trait SearchSource {
    /// Published items of `kind` whose title or body contains `text`,
    /// newest first, at most `limit`.
    fn find_published(
        &self,
        kind: ContentKind,
        text: &str,
        limit: u32,
    ) -> SearchResult<Vec<SearchHit>>;
}

/// SQLite lookup over the content tables.
pub struct SqliteSearchSource<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSearchSource<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SearchSource for SqliteSearchSource<'_> {
    fn find_published(
        &self,
        kind: ContentKind,
        text: &str,
        limit: u32,
    ) -> SearchResult<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, title, slug, content, created_at
             FROM {}
             WHERE is_published = 1
               AND (fold_case(title) LIKE ?1 ESCAPE '\\'
                    OR fold_case(content) LIKE ?1 ESCAPE '\\')
             ORDER BY created_at DESC, id DESC
             LIMIT ?2;",
            kind.item_table()
        ))?;
        let mut rows = stmt.query(params![like_contains_pattern(text), i64::from(limit)])?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next()? {
            let id: ContentId = row.get("id")?;
            let tags = load_tags_for_item(self.conn, kind, id)?
                .into_iter()
                .map(|tag| tag.name)
                .collect();
            hits.push(SearchHit {
                id,
                kind,
                title: row.get("title")?,
                slug: row.get("slug")?,
                content: row.get("content")?,
                created_at: row.get("created_at")?,
                tags,
            });
        }
        Ok(hits)
    }
}

/// Searches published content across the kinds selected by `query.scope`.
pub fn search_content(source: &impl SearchSource, query: &SearchQuery) -> Vec<SearchHit> {
    let text = query.text.trim();
    if text.is_empty() || query.limit == 0 {
        return Vec::new();
    }

    let started_at = Instant::now();
    let mut hits = Vec::new();
    for &kind in query.scope.kinds() {
        match source.find_published(kind, text, query.per_kind_limit) {
            Ok(found) => hits.extend(found),
            Err(err) => {
                warn!(
                    "event=search_kind_failed module=search status=error kind={kind} error={err}"
                );
            }
        }
    }

    merge_by_recency(&mut hits, query.limit);
    info!(
        "event=search module=search status=ok hits={} duration_ms={}",
        hits.len(),
        started_at.elapsed().as_millis()
    );
    hits
}

fn merge_by_recency(hits: &mut Vec<SearchHit>, limit: usize) {
    hits.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| b.id.cmp(&a.id))
    });
    hits.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::{search_content, SearchHit, SearchQuery, SearchResult, SearchScope, SearchSource};
    use crate::model::content::ContentKind;
    use crate::repo::RepoError;
    use std::cell::Cell;

    struct FakeSource {
        calls: Cell<u32>,
        failing: Option<ContentKind>,
        per_kind: u32,
    }

    impl FakeSource {
        fn new(per_kind: u32) -> Self {
            Self {
                calls: Cell::new(0),
                failing: None,
                per_kind,
            }
        }
    }

    impl SearchSource for FakeSource {
        fn find_published(
            &self,
            kind: ContentKind,
            _text: &str,
            limit: u32,
        ) -> SearchResult<Vec<SearchHit>> {
            self.calls.set(self.calls.get() + 1);
            if self.failing == Some(kind) {
                return Err(RepoError::InvalidData("boom".to_string()).into());
            }
            let offset = if kind == ContentKind::Blog { 0 } else { 1 };
            Ok((0..self.per_kind.min(limit))
                .map(|idx| SearchHit {
                    id: i64::from(idx),
                    kind,
                    title: format!("{kind} {idx}"),
                    slug: format!("{kind}-{idx}"),
                    content: String::new(),
                    created_at: i64::from(idx * 2 + offset),
                    tags: Vec::new(),
                })
                .collect())
        }
    }

    #[test]
    fn blank_query_skips_lookup() {
        let source = FakeSource::new(3);
        assert!(search_content(&source, &SearchQuery::new("  \t", SearchScope::All)).is_empty());
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn merged_hits_are_sorted_and_capped() {
        let source = FakeSource::new(20);
        let hits = search_content(&source, &SearchQuery::new("x", SearchScope::All));
        assert_eq!(source.calls.get(), 2);
        assert_eq!(hits.len(), 20);
        assert!(hits
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
        assert_eq!(hits[0].created_at, 39);
    }

    #[test]
    fn scope_limits_kinds() {
        let source = FakeSource::new(2);
        let hits = search_content(&source, &SearchQuery::new("x", SearchScope::Note));
        assert_eq!(source.calls.get(), 1);
        assert!(hits.iter().all(|hit| hit.kind == ContentKind::Note));
    }

    #[test]
    fn failing_kind_contributes_nothing() {
        let mut source = FakeSource::new(2);
        source.failing = Some(ContentKind::Blog);
        let hits = search_content(&source, &SearchQuery::new("x", SearchScope::All));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.kind == ContentKind::Note));
    }

    #[test]
    fn scope_parse_rejects_reading_notes() {
        assert_eq!(SearchScope::parse("ALL"), Some(SearchScope::All));
        assert_eq!(SearchScope::parse(""), Some(SearchScope::All));
        assert_eq!(SearchScope::parse("readingnote"), None);
    }
}
