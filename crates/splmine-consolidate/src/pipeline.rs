//! Dedup pipeline execution.

use tracing::info;

use crate::dedup::{remove_exact, remove_near};
use crate::types::*;
use splmine_core::LabelRecord;

/// Removes exact and near-duplicate indication records, earliest wins.
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Run every stage. The retained records keep their input order.
    pub fn run(&self, records: Vec<LabelRecord>) -> (Vec<LabelRecord>, DedupReport) {
        let start = std::time::Instant::now();
        let mut report = DedupReport {
            input_records: records.len(),
            threshold: self.config.threshold,
            ..Default::default()
        };

        info!(
            "Starting dedup of {} records (threshold: {}, policy: {})",
            records.len(),
            self.config.threshold,
            self.config.policy
        );

        let mut records = records;
        if records.len() > 1 {
            for stage in DedupStage::all() {
                records = self.run_stage(*stage, records, &mut report);
            }
        }

        report.retained = records.len();
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Dedup complete: exact={}, near={}, retained={}, duration={}ms",
            report.exact_removed, report.near_removed, report.retained, report.duration_ms
        );

        (records, report)
    }

    fn run_stage(
        &self,
        stage: DedupStage,
        records: Vec<LabelRecord>,
        report: &mut DedupReport,
    ) -> Vec<LabelRecord> {
        match stage {
            DedupStage::ExactHash => {
                let (kept, removed) = remove_exact(records);
                if removed > 0 {
                    info!("Removed {} exact duplicates", removed);
                }
                report.exact_removed = removed;
                kept
            }
            DedupStage::NearDuplicate => {
                let (kept, removed) = remove_near(
                    records,
                    self.config.threshold,
                    self.config.policy,
                    self.config.stem_tokens,
                );
                if removed > 0 {
                    info!("Removed {} near duplicates", removed);
                }
                report.near_removed = removed;
                kept
            }
        }
    }
}
