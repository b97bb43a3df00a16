//! Per-kind tag model.

use crate::model::content::ContentKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TagId = i64;

pub const TAG_NAME_MAX_CHARS: usize = 20;

/// A label attachable to items of exactly one content kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Tag row for the admin tag table: tag, owning kind and link count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    pub id: TagId,
    pub name: String,
    pub kind: ContentKind,
    pub count: u32,
}

/// Link changes that move an item's tag set to a desired state.
///
/// Both lists are sorted ascending and disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub to_disconnect: Vec<TagId>,
    pub to_connect: Vec<TagId>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.to_disconnect.is_empty() && self.to_connect.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValidationError {
    EmptyName,
    NameTooLong { max: usize, actual: usize },
}

impl Display for TagValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "tag name must not be blank"),
            Self::NameTooLong { max, actual } => {
                write!(f, "tag name is {actual} characters; max {max}")
            }
        }
    }
}

impl Error for TagValidationError {}

/// Trims and validates one tag name.
pub fn normalize_tag_name(name: &str) -> Result<String, TagValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TagValidationError::EmptyName);
    }
    let chars = trimmed.chars().count();
    if chars > TAG_NAME_MAX_CHARS {
        return Err(TagValidationError::NameTooLong {
            max: TAG_NAME_MAX_CHARS,
            actual: chars,
        });
    }
    Ok(trimmed.to_string())
}
