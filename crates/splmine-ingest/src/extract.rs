//! Extraction pipeline: payload → parsed label → normalized indication records.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::archive::{UnpackStats, Unpacker};
use crate::normalize::normalize_indication;
use crate::parse::{DocumentParser, ParsedLabel};
use splmine_core::{content_hash, Error, LabelRecord, RawDocument, Result, RunSummary, SplMineConfig};

/// Records pulled out of a corpus plus the counters describing the pass.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<LabelRecord>,
    pub summary: RunSummary,
}

/// Turns payloads into indication records, parsing in parallel batches.
pub struct Extractor {
    parser: DocumentParser,
    strip_heading: bool,
    batch_size: usize,
}

/// Per-run bookkeeping for repeated documents and versions.
#[derive(Default)]
struct SeenLabels {
    documents: HashSet<String>,
    /// (set id, version) → (document id, hash of its indication texts).
    versions: HashMap<(String, u32), (String, String)>,
}

impl Extractor {
    pub fn new(parser: DocumentParser, strip_heading: bool, batch_size: usize) -> Self {
        Self {
            parser,
            strip_heading,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &SplMineConfig) -> Self {
        Self::new(
            DocumentParser::new(&config.section_codes),
            config.strip_heading,
            config.batch_size,
        )
    }

    /// Run every payload of `unpacker` through the pipeline.
    pub fn extract(&self, unpacker: &mut Unpacker) -> Extraction {
        let mut extraction = self.extract_documents(unpacker.by_ref());
        apply_unpack_stats(&mut extraction.summary, unpacker.stats());
        extraction
    }

    /// Run a sequence of payloads (or per-entry failures) through the pipeline.
    /// Output order follows input order regardless of thread scheduling.
    pub fn extract_documents<I>(&self, documents: I) -> Extraction
    where
        I: IntoIterator<Item = Result<RawDocument>>,
    {
        let start = Instant::now();
        let mut extraction = Extraction::default();
        let mut seen = SeenLabels::default();
        let mut documents = documents.into_iter();

        loop {
            let batch: Vec<Result<RawDocument>> = documents.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let parsed: Vec<Result<(String, ParsedLabel)>> = batch
                .into_par_iter()
                .map(|item| {
                    let doc = item?;
                    let label = self.parser.parse(&doc)?;
                    Ok((doc.source_name(), label))
                })
                .collect();

            for outcome in parsed {
                self.accept(outcome, &mut seen, &mut extraction);
            }
            debug!(
                "Batch done: {} documents scanned, {} records so far",
                extraction.summary.documents_scanned,
                extraction.records.len()
            );
        }

        extraction.summary.records_extracted = extraction.records.len();
        extraction.summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} records from {} documents ({} skipped)",
            extraction.summary.records_extracted,
            extraction.summary.documents_scanned,
            extraction.summary.total_skipped()
        );
        extraction
    }

    /// Fold one parse outcome into the running extraction, in input order.
    fn accept(
        &self,
        outcome: Result<(String, ParsedLabel)>,
        seen: &mut SeenLabels,
        extraction: &mut Extraction,
    ) {
        let summary = &mut extraction.summary;
        let (source, label) = match outcome {
            Ok(parsed) => {
                summary.documents_scanned += 1;
                parsed
            }
            Err(e) => {
                if !matches!(e, Error::ArchiveCorrupt { .. }) {
                    summary.documents_scanned += 1;
                }
                match e.skip_reason() {
                    Some(reason) => {
                        warn!("Skipping ({}): {}", reason, e);
                        summary.record_skip(reason);
                    }
                    None => warn!("Skipping: {}", e),
                }
                return;
            }
        };

        let identity = label.identity;
        if !seen.documents.insert(identity.document_id.clone()) {
            debug!("Duplicate document {} in {}, dropping", identity.document_id, source);
            summary.duplicate_documents += 1;
            return;
        }

        if label.sections.is_empty() {
            debug!("No indication section in {}", source);
            summary.no_indication += 1;
        }

        let texts: Vec<(String, String)> = label
            .sections
            .into_iter()
            .map(|s| (s.code, normalize_indication(&s.text, self.strip_heading)))
            .collect();

        let text_hash = content_hash(
            &texts
                .iter()
                .map(|(_, t)| t.as_str())
                .collect::<Vec<_>>()
                .join("\u{1f}"),
        );
        let key = (identity.set_id.clone(), identity.version_number);
        match seen.versions.get(&key) {
            Some((other_id, other_hash)) if other_hash != &text_hash => {
                warn!(
                    "Version collision: set {} version {} on documents {} and {} with different text",
                    identity.set_id, identity.version_number, other_id, identity.document_id
                );
                summary.version_collisions += 1;
            }
            Some(_) => {}
            None => {
                seen.versions
                    .insert(key, (identity.document_id.clone(), text_hash));
            }
        }

        for (section_code, indication_text) in texts {
            extraction.records.push(LabelRecord {
                identity: identity.clone(),
                section_code,
                indication_text,
                source: source.clone(),
            });
        }
    }
}

/// Copy archive-level counters into the run summary.
pub fn apply_unpack_stats(summary: &mut RunSummary, stats: &UnpackStats) {
    summary.inner_archives = stats.inner_archives;
    summary.ambiguous_payloads = stats.ambiguous_payloads;
    summary.nested_archives_ignored = stats.nested_archives_ignored;
}
