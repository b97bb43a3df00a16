//! Tag vocabulary use-case service.
//!
//! # Invariants
//! - Names are trimmed and validated before lookup or write.
//! - A name is unique within one kind; the same name may exist in other kinds.

use crate::model::content::ContentKind;
use crate::model::tag::{normalize_tag_name, Tag, TagId, TagWithCount};
use crate::repo::tag_repo::TagRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;

pub struct TagService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create(&self, kind: ContentKind, name: &str) -> ServiceResult<Tag> {
        let name = normalize_tag_name(name)?;
        if self.repo.find_tag_by_name(kind, &name)?.is_some() {
            return Err(ServiceError::TagNameTaken { kind, name });
        }

        let tag = self.repo.create_tag(kind, &name)?;
        info!(
            "event=tag_create module=service status=ok kind={kind} id={}",
            tag.id
        );
        Ok(tag)
    }

    /// Renames one tag. Renaming to its own current name is a no-op.
    pub fn rename(&self, kind: ContentKind, id: TagId, name: &str) -> ServiceResult<Tag> {
        let name = normalize_tag_name(name)?;
        if self.repo.get_tag(kind, id)?.is_none() {
            return Err(ServiceError::NotFound { entity: "tag", id });
        }
        if let Some(existing) = self.repo.find_tag_by_name(kind, &name)? {
            if existing.id != id {
                return Err(ServiceError::TagNameTaken { kind, name });
            }
        }

        let tag = self.repo.rename_tag(kind, id, &name)?;
        info!("event=tag_rename module=service status=ok kind={kind} id={id}");
        Ok(tag)
    }

    /// Deletes one tag and detaches it from every item of its kind.
    pub fn delete(&self, kind: ContentKind, id: TagId) -> ServiceResult<()> {
        self.repo.delete_tag(kind, id)?;
        info!("event=tag_delete module=service status=ok kind={kind} id={id}");
        Ok(())
    }

    pub fn list(&self, kind: ContentKind) -> ServiceResult<Vec<Tag>> {
        Ok(self.repo.list_tags(kind)?)
    }

    /// Tags of every kind with link counts: blog, note, then reading-note tags.
    pub fn list_all_with_counts(&self) -> ServiceResult<Vec<TagWithCount>> {
        self.collect_with_counts(None)
    }

    /// Like [`Self::list_all_with_counts`], restricted to names containing
    /// `text` (case-insensitive).
    pub fn query_with_counts(&self, text: &str) -> ServiceResult<Vec<TagWithCount>> {
        self.collect_with_counts(Some(text.trim()))
    }

    fn collect_with_counts(&self, name_contains: Option<&str>) -> ServiceResult<Vec<TagWithCount>> {
        let mut tags = Vec::new();
        for kind in ContentKind::ALL {
            tags.extend(self.repo.list_tags_with_counts(kind, name_contains)?);
        }
        Ok(tags)
    }
}
