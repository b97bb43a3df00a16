//! Content item model (blog posts, notes, reading notes).
//!
//! # Invariants
//! - `slug` is unique within one `ContentKind`.
//! - Timestamps are Unix epoch milliseconds.
//! - A validated draft never requests more than three tags.

use crate::model::tag::Tag;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable row identifier for content items.
pub type ContentId = i64;

pub const MAX_TAGS_PER_ITEM: usize = 3;
pub const TITLE_MAX_CHARS: usize = 50;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));

/// Discriminates the three article-like content types.
///
/// Each kind owns separate item, tag and link tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Blog,
    Note,
    ReadingNote,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [Self::Blog, Self::Note, Self::ReadingNote];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Note => "note",
            Self::ReadingNote => "reading_note",
        }
    }

    /// Parses the wire name; `readingnote` is accepted as an alias used by
    /// public URLs.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blog" => Some(Self::Blog),
            "note" => Some(Self::Note),
            "reading_note" | "readingnote" => Some(Self::ReadingNote),
            _ => None,
        }
    }

    pub(crate) fn item_table(self) -> &'static str {
        match self {
            Self::Blog => "blogs",
            Self::Note => "notes",
            Self::ReadingNote => "reading_notes",
        }
    }

    pub(crate) fn tag_table(self) -> &'static str {
        match self {
            Self::Blog => "blog_tags",
            Self::Note => "note_tags",
            Self::ReadingNote => "reading_note_tags",
        }
    }

    pub(crate) fn link_table(self) -> &'static str {
        match self {
            Self::Blog => "blog_tag_links",
            Self::Note => "note_tag_links",
            Self::ReadingNote => "reading_note_tag_links",
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted content item with its associated tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ContentId,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    /// Markdown source.
    pub content: String,
    pub is_published: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Sorted by tag name.
    pub tags: Vec<Tag>,
}

impl ContentItem {
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.name.clone()).collect()
    }
}

/// Administrator input for create/update of a content item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub title: String,
    pub slug: String,
    pub is_published: bool,
    #[serde(default)]
    pub content: String,
    /// Names of existing tags of the same kind. Unknown names are ignored.
    #[serde(default, alias = "relatedTagNames")]
    pub tag_names: Vec<String>,
}

impl ArticleDraft {
    /// Returns a trimmed copy that satisfies every draft invariant.
    ///
    /// Tag names are trimmed, blank names dropped and duplicates collapsed
    /// (first occurrence wins) before the tag cap is checked.
    pub fn normalized(&self) -> Result<ArticleDraft, ContentValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ContentValidationError::EmptyTitle);
        }
        let title_chars = title.chars().count();
        if title_chars > TITLE_MAX_CHARS {
            return Err(ContentValidationError::TitleTooLong {
                max: TITLE_MAX_CHARS,
                actual: title_chars,
            });
        }

        let slug = self.slug.trim();
        if slug.is_empty() {
            return Err(ContentValidationError::EmptySlug);
        }
        if !SLUG_RE.is_match(slug) {
            return Err(ContentValidationError::InvalidSlug(slug.to_string()));
        }

        let mut tag_names: Vec<String> = Vec::new();
        for raw in &self.tag_names {
            let name = raw.trim();
            if name.is_empty() || tag_names.iter().any(|existing| existing == name) {
                continue;
            }
            tag_names.push(name.to_string());
        }
        if tag_names.len() > MAX_TAGS_PER_ITEM {
            return Err(ContentValidationError::TooManyTags {
                max: MAX_TAGS_PER_ITEM,
                actual: tag_names.len(),
            });
        }

        Ok(ArticleDraft {
            title: title.to_string(),
            slug: slug.to_string(),
            is_published: self.is_published,
            content: self.content.clone(),
            tag_names,
        })
    }
}

/// Draft validation failures. Raised before any store access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentValidationError {
    EmptyTitle,
    TitleTooLong { max: usize, actual: usize },
    EmptySlug,
    /// Slug may only contain lowercase ASCII letters, digits and `-`.
    InvalidSlug(String),
    TooManyTags { max: usize, actual: usize },
}

impl Display for ContentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::TitleTooLong { max, actual } => {
                write!(f, "title is {actual} characters; max {max}")
            }
            Self::EmptySlug => write!(f, "slug must not be blank"),
            Self::InvalidSlug(slug) => write!(
                f,
                "slug `{slug}` may only contain digits, lowercase letters and '-'"
            ),
            Self::TooManyTags { max, actual } => {
                write!(f, "at most {max} tags per item; got {actual}")
            }
        }
    }
}

impl Error for ContentValidationError {}
