//! Domain model for blog content, tags and echoes.
//!
//! # Responsibility
//! - Define the records shared by repositories, services and the HTTP layer.
//! - Own input validation for administrator-supplied drafts.
//!
//! # Invariants
//! - A content item carries at most [`content::MAX_TAGS_PER_ITEM`] tags.
//! - Tags are scoped to one [`content::ContentKind`]; they are never shared.

pub mod content;
pub mod echo;
pub mod tag;
