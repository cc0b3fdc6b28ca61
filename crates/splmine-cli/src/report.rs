//! Human-readable run reports.

use splmine_consolidate::DedupReport;
use splmine_core::{RunSummary, SkipReason};

use crate::commands::{DedupOutcome, ExploreOutcome};

pub fn print_summary(summary: &RunSummary, dedup: Option<&DedupReport>) {
    println!("=== splmine Extraction Report ===");
    println!();
    println!("Documents scanned:  {}", summary.documents_scanned);
    println!("Inner archives:     {}", summary.inner_archives);
    println!("Skipped:            {}", summary.total_skipped());
    for reason in [
        SkipReason::ArchiveCorrupt,
        SkipReason::MalformedDocument,
        SkipReason::MissingIdentity,
        SkipReason::MissingVersion,
    ] {
        let count = summary.skipped.get(reason);
        if count > 0 {
            println!("  - {}: {}", reason, count);
        }
    }
    println!("No indication:      {}", summary.no_indication);
    println!("Records extracted:  {}", summary.records_extracted);
    match dedup {
        Some(report) => {
            println!("Exact duplicates:   {}", report.exact_removed);
            println!("Near duplicates:    {} (threshold {})", report.near_removed, report.threshold);
        }
        None => println!("Dedup:              disabled"),
    }
    println!("Records retained:   {}", summary.records_retained);
    println!("Records written:    {}", summary.records_written);

    let mut warnings = Vec::new();
    if summary.ambiguous_payloads > 0 {
        warnings.push(format!(
            "{} inner archives held more than one document",
            summary.ambiguous_payloads
        ));
    }
    if summary.nested_archives_ignored > 0 {
        warnings.push(format!(
            "{} archives nested too deep were not read",
            summary.nested_archives_ignored
        ));
    }
    if summary.duplicate_documents > 0 {
        warnings.push(format!(
            "{} repeated documents dropped",
            summary.duplicate_documents
        ));
    }
    if summary.version_collisions > 0 {
        warnings.push(format!(
            "{} set/version pairs seen with different text",
            summary.version_collisions
        ));
    }
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    println!();
    println!("Duration: {}ms", summary.duration_ms);
}

pub fn print_dedup(outcome: &DedupOutcome) {
    let report = &outcome.report;
    println!("=== splmine Dedup Report ===");
    println!();
    println!("Input records:      {}", report.input_records);
    println!("Exact duplicates:   {}", report.exact_removed);
    println!("Near duplicates:    {} (threshold {})", report.near_removed, report.threshold);
    println!("Records written:    {}", outcome.written);
}

pub fn print_explore(outcome: &ExploreOutcome) {
    println!("=== splmine Section Explorer ===");
    println!();
    println!("Documents:          {}", outcome.documents);
    println!("Skipped:            {}", outcome.skipped);
    println!("Section codes:      {} -> {}", outcome.codes, outcome.code_table.display());
    println!("Term distribution:  {}", outcome.code_dist_table.display());
    println!("Matched terms:      {} -> {}", outcome.terms, outcome.term_table.display());
}
