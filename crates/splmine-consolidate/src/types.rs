//! Deduplication types.

use serde::Serialize;

use splmine_core::{ClusterPolicy, Error, Result, SplMineConfig, DEFAULT_SIMILARITY_THRESHOLD};

/// Stages the deduplicator runs, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStage {
    ExactHash,
    NearDuplicate,
}

impl DedupStage {
    pub fn all() -> &'static [DedupStage] {
        &[Self::ExactHash, Self::NearDuplicate]
    }
}

/// Result of running the dedup pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    #[serde(rename = "inputRecords")]
    pub input_records: usize,
    #[serde(rename = "exactRemoved")]
    pub exact_removed: usize,
    #[serde(rename = "nearRemoved")]
    pub near_removed: usize,
    pub retained: usize,
    pub threshold: f64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

/// Parameters of one dedup pass. The threshold is fixed for the whole run.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Cosine similarity at or above which the later record is dropped (0.0 - 1.0).
    pub threshold: f64,
    pub policy: ClusterPolicy,
    pub stem_tokens: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            policy: ClusterPolicy::default(),
            stem_tokens: true,
        }
    }
}

impl DedupConfig {
    pub fn new(threshold: f64, policy: ClusterPolicy) -> Result<Self> {
        let config = Self {
            threshold,
            policy,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_config(config: &SplMineConfig) -> Result<Self> {
        let dedup = Self {
            threshold: config.similarity_threshold,
            policy: config.cluster_policy,
            stem_tokens: config.stem_tokens,
        };
        dedup.validate()?;
        Ok(dedup)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::Config(format!(
                "similarity threshold must be within 0.0..=1.0, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}
