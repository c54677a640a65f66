use std::path::PathBuf;

use thiserror::Error;

/// Rejections of a single registry operation. All are reported back to the requester
/// and leave the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid link: {reason}")]
    Validation { reason: String },
    #[error("link already saved: {content}")]
    Duplicate { content: String },
    #[error("position {position} is outside 1..={len}")]
    Range { position: usize, len: usize },
    #[error("{requester} is not allowed to {action}")]
    Authorization {
        requester: String,
        action: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}
