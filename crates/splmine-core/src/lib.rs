//! Core types for splmine: errors, label records, run summary and configuration.

pub mod config;
pub mod error;
pub mod record;
pub mod summary;

pub use config::{
    ClusterPolicy, DataPaths, SplMineConfig, DEFAULT_BATCH_SIZE, DEFAULT_INDICATION_CODE,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use error::{Error, Result, SkipReason};
pub use record::{content_hash, LabelIdentity, LabelRecord, RawDocument};
pub use summary::{RunSummary, SkipCounts};
