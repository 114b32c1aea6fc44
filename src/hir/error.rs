//! Error types of the model layer.
//!
//! Unresolved names are not errors: lookups return `None` or a placeholder.
//! Only malformed input, persistence failures and bad configuration surface
//! as `Err`.

use thiserror::Error;

use crate::base::{FileId, TextRange};

use super::ids::Uid;

/// A construct the renderer could not turn into a declaration.
///
/// Rendering aborts for that construct only; siblings are still rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{file}: {construct} at {range:?} has no name")]
    MissingName {
        file: FileId,
        construct: &'static str,
        range: TextRange,
    },
    #[error("{file}: {construct} at {range:?} has no declarator")]
    MissingDeclarator {
        file: FileId,
        construct: &'static str,
        range: TextRange,
    },
    #[error("{file}: {construct} at {range:?} has no type")]
    MissingType {
        file: FileId,
        construct: &'static str,
        range: TextRange,
    },
    #[error("{file}: unsupported {construct} at {range:?}")]
    Unsupported {
        file: FileId,
        construct: &'static str,
        range: TextRange,
    },
}

impl RenderError {
    pub fn range(&self) -> TextRange {
        match self {
            Self::MissingName { range, .. }
            | Self::MissingDeclarator { range, .. }
            | Self::MissingType { range, .. }
            | Self::Unsupported { range, .. } => *range,
        }
    }
}

/// Failure in the persistence layer beneath the identity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("record for {uid} could not be encoded: {source}")]
    Encode {
        uid: Uid,
        #[source]
        source: postcard::Error,
    },
    #[error("record under key {key} could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: postcard::Error,
    },
    #[error("{uid} is not live in this store")]
    NotLive { uid: Uid },
    #[error("project has no persistent storage")]
    NoStorage,
    #[error("every store id in this process has been used")]
    StoreIdsExhausted,
}

/// Invalid [`ModelConfig`](super::ModelConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("recursion_limit must be at least 1")]
    ZeroRecursionLimit,
}
