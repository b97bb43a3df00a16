//! Content use-case service for blogs, notes and reading notes.
//!
//! # Responsibility
//! - Validate drafts and enforce slug uniqueness before writes.
//! - Resolve requested tag names and reconcile them against current links.
//! - Provide public (published-only) and admin (all states) read paths.
//!
//! # Invariants
//! - Validation, not-found and conflict checks all run before any write.
//! - Field changes and tag-link changes of one update commit together.
//! - Requested tag names that do not exist for the kind are ignored.

use crate::model::content::{ArticleDraft, ContentId, ContentItem, ContentKind};
use crate::model::tag::TagId;
use crate::repo::content_repo::{ContentListQuery, ContentOrder, ContentRepository};
use crate::service::tag_reconciler::reconcile_tags;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use serde::Serialize;

const PAGE_DEFAULT_LIMIT: u32 = 10;
const PAGE_LIMIT_MAX: u32 = 50;

/// One page of published items plus the total matching count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub total: u64,
    /// 1-based page number actually applied.
    pub page: u32,
    pub limit: u32,
}

/// Content service facade over repository implementations.
pub struct ContentService<R: ContentRepository> {
    repo: R,
}

impl<R: ContentRepository> ContentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one item and links it to the resolvable requested tags.
    ///
    /// # Errors
    /// - `InvalidArticle` for a malformed draft or more than three tags.
    /// - `SlugTaken` when another item of `kind` already uses the slug.
    pub fn create(
        &mut self,
        kind: ContentKind,
        draft: &ArticleDraft,
    ) -> ServiceResult<ContentItem> {
        let draft = draft.normalized()?;

        if self.repo.slug_owner(kind, &draft.slug)?.is_some() {
            return Err(ServiceError::SlugTaken {
                kind,
                slug: draft.slug,
            });
        }

        let tag_ids = self.repo.resolve_tag_ids(kind, &draft.tag_names)?;
        let id = self.repo.create_item(kind, &draft, &tag_ids)?;
        info!(
            "event=content_create module=service status=ok kind={kind} id={id} tags={}",
            tag_ids.len()
        );

        self.repo
            .get_item(kind, id)?
            .ok_or(ServiceError::InconsistentState(
                "created item not found in read-back",
            ))
    }

    /// Replaces item fields and reconciles its tags to the requested set.
    ///
    /// # Errors
    /// - `InvalidArticle` for a malformed draft or more than three tags.
    /// - `NotFound` when `id` does not exist for `kind`.
    /// - `SlugTaken` when a different item of `kind` owns the new slug.
    pub fn update(
        &mut self,
        kind: ContentKind,
        id: ContentId,
        draft: &ArticleDraft,
    ) -> ServiceResult<ContentItem> {
        let draft = draft.normalized()?;

        let current = self
            .repo
            .get_item(kind, id)?
            .ok_or(ServiceError::NotFound {
                entity: kind.as_str(),
                id,
            })?;

        if let Some(owner) = self.repo.slug_owner(kind, &draft.slug)? {
            if owner != id {
                return Err(ServiceError::SlugTaken {
                    kind,
                    slug: draft.slug,
                });
            }
        }

        let desired = self.repo.resolve_tag_ids(kind, &draft.tag_names)?;
        let current_ids: Vec<TagId> = current.tags.iter().map(|tag| tag.id).collect();
        let diff = reconcile_tags(&current_ids, &desired);

        self.repo.update_item(kind, id, &draft, &diff)?;
        info!(
            "event=content_update module=service status=ok kind={kind} id={id} tags_disconnected={} tags_connected={}",
            diff.to_disconnect.len(),
            diff.to_connect.len()
        );

        self.repo
            .get_item(kind, id)?
            .ok_or(ServiceError::InconsistentState(
                "updated item not found in read-back",
            ))
    }

    /// Deletes one item. Its tag links go with it; the tags stay.
    pub fn delete(&self, kind: ContentKind, id: ContentId) -> ServiceResult<()> {
        self.repo.delete_item(kind, id)?;
        info!("event=content_delete module=service status=ok kind={kind} id={id}");
        Ok(())
    }

    pub fn set_published(
        &self,
        kind: ContentKind,
        id: ContentId,
        published: bool,
    ) -> ServiceResult<()> {
        self.repo.set_published(kind, id, published)?;
        info!(
            "event=content_publish module=service status=ok kind={kind} id={id} published={published}"
        );
        Ok(())
    }

    /// Admin read: returns the item regardless of publication state.
    pub fn get_by_slug(&self, kind: ContentKind, slug: &str) -> ServiceResult<Option<ContentItem>> {
        Ok(self.repo.find_by_slug(kind, slug.trim(), false)?)
    }

    /// Public read: unpublished items are invisible.
    pub fn get_published_by_slug(
        &self,
        kind: ContentKind,
        slug: &str,
    ) -> ServiceResult<Option<ContentItem>> {
        Ok(self.repo.find_by_slug(kind, slug.trim(), true)?)
    }

    /// Admin table: every item, most recently edited first.
    pub fn list_all(&self, kind: ContentKind) -> ServiceResult<Vec<ContentItem>> {
        let query = ContentListQuery {
            order: ContentOrder::UpdatedDesc,
            ..ContentListQuery::default()
        };
        Ok(self.repo.list_items(kind, &query)?)
    }

    /// Public listing: published items, newest first.
    pub fn list_published(&self, kind: ContentKind) -> ServiceResult<Vec<ContentItem>> {
        let query = ContentListQuery {
            published_only: true,
            ..ContentListQuery::default()
        };
        Ok(self.repo.list_items(kind, &query)?)
    }

    /// Admin search box: title substring match over all items.
    pub fn query_by_title(&self, kind: ContentKind, text: &str) -> ServiceResult<Vec<ContentItem>> {
        let query = ContentListQuery {
            title_contains: Some(text.trim().to_string()),
            order: ContentOrder::UpdatedDesc,
            ..ContentListQuery::default()
        };
        Ok(self.repo.list_items(kind, &query)?)
    }

    /// Published items carrying every one of `tag_names`.
    ///
    /// Returns an empty list when no names are given.
    pub fn list_by_tag_names(
        &self,
        kind: ContentKind,
        tag_names: &[String],
    ) -> ServiceResult<Vec<ContentItem>> {
        let mut names: Vec<String> = tag_names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let query = ContentListQuery {
            published_only: true,
            all_tag_names: names,
            ..ContentListQuery::default()
        };
        Ok(self.repo.list_items(kind, &query)?)
    }

    /// Published items, newest first, one page at a time.
    ///
    /// `page` is 1-based (0 is treated as 1); `limit` defaults to 10 and is
    /// capped at 50.
    pub fn list_published_page(
        &self,
        kind: ContentKind,
        page: u32,
        limit: Option<u32>,
        tag_id: Option<TagId>,
    ) -> ServiceResult<ContentPage> {
        let page = page.max(1);
        let limit = normalize_page_limit(limit);
        let offset = (page - 1).saturating_mul(limit);

        let query = ContentListQuery {
            published_only: true,
            tag_id,
            limit: Some(limit),
            offset,
            ..ContentListQuery::default()
        };
        let items = self.repo.list_items(kind, &query)?;
        let total = self.repo.count_items(kind, &query)?;

        Ok(ContentPage {
            items,
            total,
            page,
            limit,
        })
    }
}

/// Normalizes a page size according to the listing contract.
pub fn normalize_page_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => PAGE_DEFAULT_LIMIT,
        Some(value) if value > PAGE_LIMIT_MAX => PAGE_LIMIT_MAX,
        Some(value) => value,
    }
}
