//! Error types for splmine.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Archive corrupt: {entry}: {reason}")]
    ArchiveCorrupt { entry: String, reason: String },

    #[error("Malformed document {source_name}: {reason}")]
    MalformedDocument { source_name: String, reason: String },

    #[error("Missing identity in {source_name}: no <{field}> element")]
    MissingIdentity {
        source_name: String,
        field: &'static str,
    },

    #[error("Missing version in {source_name}: {reason}")]
    MissingVersion { source_name: String, reason: String },

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The skip counter a per-document failure belongs to.
    /// `None` for run-level failures, which are fatal.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::ArchiveCorrupt { .. } => Some(SkipReason::ArchiveCorrupt),
            Self::MalformedDocument { .. } => Some(SkipReason::MalformedDocument),
            Self::MissingIdentity { .. } => Some(SkipReason::MissingIdentity),
            Self::MissingVersion { .. } => Some(SkipReason::MissingVersion),
            _ => None,
        }
    }
}

/// Why a payload was skipped without producing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ArchiveCorrupt,
    MalformedDocument,
    MissingIdentity,
    MissingVersion,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArchiveCorrupt => write!(f, "archive corrupt"),
            Self::MalformedDocument => write!(f, "malformed document"),
            Self::MissingIdentity => write!(f, "missing identity"),
            Self::MissingVersion => write!(f, "missing version"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
