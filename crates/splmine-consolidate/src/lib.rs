//! Deduplication of indication records: exact hashes, then TF-IDF cosine similarity.
//!
//! Drops later records whose text repeats or closely resembles an earlier
//! one, keeping the survivors in their original order.

pub mod dedup;
pub mod pipeline;
pub mod stemmer;
pub mod tfidf;
pub mod types;

pub use dedup::{remove_exact, remove_near, retained_indices, SimilarityIndex};
pub use pipeline::Deduplicator;
pub use types::*;
