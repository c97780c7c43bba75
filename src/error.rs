use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::Membership;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Note not found: {0}")]
    NotFound(Uuid),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(Uuid),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error("Cannot {op} a {from:?} note")]
    InvalidTransition { op: &'static str, from: Membership },

    #[error("Note is locked: {0}")]
    Locked(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this failure came out of the persistence layer.
    ///
    /// Persistence-class failures are the only ones that can occur after an
    /// optimistic cache mutation; everything else rejects before the cache
    /// is touched.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            EngineError::Io(_) | EngineError::Serialization(_) | EngineError::Persistence(_)
        )
    }
}

/// Input validation failures. These always reject before any state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tag cannot be empty")]
    EmptyTag,

    #[error("a note cannot carry more than {0} tags")]
    TooManyTags(usize),

    #[error("passcode must be exactly {expected} digits")]
    PasscodeLength { expected: usize },

    #[error("passcode must contain only digits")]
    PasscodeNotNumeric,

    #[error("passcode confirmation does not match")]
    PasscodeMismatch,
}

pub type Result<T> = std::result::Result<T, EngineError>;
