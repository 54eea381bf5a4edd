//! Error handling.

use thiserror::Error;

use crate::sdk::tags::Tag;
use crate::sdk::ErrorCode;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NkflError {
    /// The engine returned an error status.
    #[error("Engine error: {0:?}")]
    Backend(ErrorCode),

    /// An operation was issued out of order, detected before reaching the engine.
    #[error("Wrong sequence: {0}")]
    WrongSequence(String),

    /// A parameter block failed local validation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation is not allowed for this session.
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// A tag payload could not be decoded.
    #[error("Invalid data for tag {tag:?}: {reason}")]
    TagRead {
        /// The tag being decoded.
        tag: Tag,
        /// What was wrong with it.
        reason: String,
    },

    /// Image information returned by the engine is not structurally valid.
    #[error("Wrong image info: {0}")]
    WrongImageInfo(String),
}

impl NkflError {
    /// The status code this error corresponds to.
    pub fn code(&self) -> ErrorCode {
        match self {
            NkflError::Backend(code) => *code,
            NkflError::WrongSequence(_) => ErrorCode::WrongSequence,
            NkflError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            NkflError::NotAllowed(_) => ErrorCode::NotAllowed,
            NkflError::TagRead { .. } => ErrorCode::TagRead,
            NkflError::WrongImageInfo(_) => ErrorCode::WrongImageInfo,
        }
    }

    pub(crate) fn tag_read(tag: Tag, reason: impl Into<String>) -> Self {
        NkflError::TagRead {
            tag,
            reason: reason.into(),
        }
    }
}

impl From<ErrorCode> for NkflError {
    fn from(value: ErrorCode) -> Self {
        NkflError::Backend(value)
    }
}

/// Crate-specific result type.
pub type NkflResult<T> = std::result::Result<T, NkflError>;
