//! Echo (short quote) model.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EchoId = i64;

pub const ECHO_CONTENT_MAX_CHARS: usize = 100;
pub const ECHO_REFERENCE_MAX_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Echo {
    pub id: EchoId,
    /// The quoted text.
    pub content: String,
    /// Where the quote comes from.
    pub reference: String,
    pub is_published: bool,
    pub created_at: i64,
}

/// Administrator input for create/update of an echo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoDraft {
    pub content: String,
    pub reference: String,
    pub is_published: bool,
}

impl EchoDraft {
    pub fn normalized(&self) -> Result<EchoDraft, EchoValidationError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(EchoValidationError::EmptyContent);
        }
        let content_chars = content.chars().count();
        if content_chars > ECHO_CONTENT_MAX_CHARS {
            return Err(EchoValidationError::ContentTooLong {
                max: ECHO_CONTENT_MAX_CHARS,
                actual: content_chars,
            });
        }

        let reference = self.reference.trim();
        if reference.is_empty() {
            return Err(EchoValidationError::EmptyReference);
        }
        let reference_chars = reference.chars().count();
        if reference_chars > ECHO_REFERENCE_MAX_CHARS {
            return Err(EchoValidationError::ReferenceTooLong {
                max: ECHO_REFERENCE_MAX_CHARS,
                actual: reference_chars,
            });
        }

        Ok(EchoDraft {
            content: content.to_string(),
            reference: reference.to_string(),
            is_published: self.is_published,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoValidationError {
    EmptyContent,
    ContentTooLong { max: usize, actual: usize },
    EmptyReference,
    ReferenceTooLong { max: usize, actual: usize },
}

impl Display for EchoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "echo content must not be blank"),
            Self::ContentTooLong { max, actual } => {
                write!(f, "echo content is {actual} characters; max {max}")
            }
            Self::EmptyReference => write!(f, "echo reference must not be blank"),
            Self::ReferenceTooLong { max, actual } => {
                write!(f, "echo reference is {actual} characters; max {max}")
            }
        }
    }
}

impl Error for EchoValidationError {}
