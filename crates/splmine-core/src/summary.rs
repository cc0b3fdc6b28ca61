//! Counters accumulated through one extraction run.

use serde::Serialize;

use crate::error::SkipReason;

/// Documents skipped per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounts {
    pub archive_corrupt: usize,
    pub malformed_document: usize,
    pub missing_identity: usize,
    pub missing_version: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.archive_corrupt + self.malformed_document + self.missing_identity + self.missing_version
    }

    pub fn get(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::ArchiveCorrupt => self.archive_corrupt,
            SkipReason::MalformedDocument => self.malformed_document,
            SkipReason::MissingIdentity => self.missing_identity,
            SkipReason::MissingVersion => self.missing_version,
        }
    }
}

/// Result of a run. Returned by value from each stage and merged,
/// never held in global state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub documents_scanned: usize,
    pub inner_archives: usize,
    pub ambiguous_payloads: usize,
    /// Archives nested below the inner level, left unread.
    pub nested_archives_ignored: usize,
    pub skipped: SkipCounts,
    /// Documents parsed successfully that had no indication section.
    pub no_indication: usize,
    /// Payloads dropped because their document id was already seen.
    pub duplicate_documents: usize,
    /// setId + versionNumber pairs seen on different documents with different text.
    pub version_collisions: usize,
    pub records_extracted: usize,
    pub exact_duplicates: usize,
    pub near_duplicates: usize,
    pub records_retained: usize,
    pub records_written: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl RunSummary {
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::ArchiveCorrupt => self.skipped.archive_corrupt += 1,
            SkipReason::MalformedDocument => self.skipped.malformed_document += 1,
            SkipReason::MissingIdentity => self.skipped.missing_identity += 1,
            SkipReason::MissingVersion => self.skipped.missing_version += 1,
        }
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.total()
    }

    /// Stamp the completion time.
    pub fn finish(&mut self, elapsed: std::time::Duration) {
        self.duration_ms = elapsed.as_millis() as u64;
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }
}
