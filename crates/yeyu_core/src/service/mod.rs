//! Core use-case services.
//!
//! # Responsibility
//! - Validate administrator input before any store access.
//! - Orchestrate repository calls into use-case level APIs.
//! - Translate repository errors into the service error taxonomy
//!   (validation, conflict, not found, internal).

use crate::model::content::{ContentKind, ContentValidationError};
use crate::model::echo::EchoValidationError;
use crate::model::tag::TagValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod content_service;
pub mod echo_service;
pub mod tag_reconciler;
pub mod tag_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error class used by outer layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug)]
pub enum ServiceError {
    InvalidArticle(ContentValidationError),
    InvalidTag(TagValidationError),
    InvalidEcho(EchoValidationError),
    NotFound { entity: &'static str, id: i64 },
    SlugTaken { kind: ContentKind, slug: String },
    TagNameTaken { kind: ContentKind, name: String },
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArticle(_) | Self::InvalidTag(_) | Self::InvalidEcho(_) => {
                ErrorCategory::Validation
            }
            Self::SlugTaken { .. } | Self::TagNameTaken { .. } => ErrorCategory::Conflict,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Repo(_) | Self::InconsistentState(_) => ErrorCategory::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArticle(err) => write!(f, "{err}"),
            Self::InvalidTag(err) => write!(f, "{err}"),
            Self::InvalidEcho(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::SlugTaken { kind, slug } => write!(f, "{kind} slug `{slug}` already exists"),
            Self::TagNameTaken { kind, name } => {
                write!(f, "{kind} tag `{name}` already exists")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArticle(err) => Some(err),
            Self::InvalidTag(err) => Some(err),
            Self::InvalidEcho(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::SlugTaken { kind, slug } => Self::SlugTaken { kind, slug },
            RepoError::TagNameTaken { kind, name } => Self::TagNameTaken { kind, name },
            other => Self::Repo(other),
        }
    }
}

impl From<ContentValidationError> for ServiceError {
    fn from(value: ContentValidationError) -> Self {
        Self::InvalidArticle(value)
    }
}

impl From<TagValidationError> for ServiceError {
    fn from(value: TagValidationError) -> Self {
        Self::InvalidTag(value)
    }
}

impl From<EchoValidationError> for ServiceError {
    fn from(value: EchoValidationError) -> Self {
        Self::InvalidEcho(value)
    }
}
