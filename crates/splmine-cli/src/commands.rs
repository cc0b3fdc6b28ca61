//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use splmine_consolidate::{DedupConfig, DedupReport, Deduplicator};
use splmine_core::{Result, RunSummary, SplMineConfig};
use splmine_ingest::{parse_terms, Extraction, Extractor, SectionExplorer, Unpacker};
use splmine_store::{
    read_indications_csv, subset_by_length, write_summary, write_table, CsvSink, JsonlSink,
    RecordSink,
};

/// Output destinations of an `extract` run.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Defaults to `<working_dir>/download`.
    pub inputs: Vec<PathBuf>,
    /// Defaults to `<working_dir>/results/indications.csv`.
    pub output: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
    /// Records within the configured length range.
    pub subset: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ExtractOutcome {
    pub summary: RunSummary,
    pub dedup: Option<DedupReport>,
    pub output: PathBuf,
}

/// Unpack, parse, normalize, deduplicate and write one corpus.
pub fn run_extract(config: &SplMineConfig, options: &ExtractOptions) -> Result<ExtractOutcome> {
    let start = Instant::now();
    config.validate()?;
    let dedup_config = DedupConfig::from_config(config)?;
    let output = match &options.output {
        Some(path) => path.clone(),
        None => config.data_paths()?.indications_csv(),
    };
    let inputs = if options.inputs.is_empty() {
        let download = config.data_paths()?.download;
        info!("No inputs given, reading {}", download.display());
        vec![download]
    } else {
        options.inputs.clone()
    };

    let mut unpacker = Unpacker::open(&inputs)?;
    let Extraction {
        records,
        mut summary,
    } = Extractor::from_config(config).extract(&mut unpacker);

    let (records, dedup) = if config.dedup {
        let (kept, report) = Deduplicator::new(dedup_config).run(records);
        summary.exact_duplicates = report.exact_removed;
        summary.near_duplicates = report.near_removed;
        (kept, Some(report))
    } else {
        info!("Dedup disabled, keeping all {} records", records.len());
        (records, None)
    };
    summary.records_retained = records.len();

    summary.records_written = CsvSink::new(&output).write_all(&records)?;
    if let Some(path) = &options.jsonl {
        JsonlSink::new(path).write_all(&records)?;
    }
    if let Some(path) = &options.subset {
        let subset = subset_by_length(&records, config.min_length, config.max_length);
        CsvSink::new(path).write_all(&subset)?;
    }

    summary.finish(start.elapsed());
    if let Some(path) = &options.summary {
        write_summary(path, &summary)?;
    }

    Ok(ExtractOutcome {
        summary,
        dedup,
        output,
    })
}

#[derive(Debug)]
pub struct DedupOutcome {
    pub report: DedupReport,
    pub written: usize,
}

/// Re-deduplicate an existing indications CSV.
pub fn run_dedup(input: &Path, output: &Path, config: &DedupConfig) -> Result<DedupOutcome> {
    config.validate()?;
    let records = read_indications_csv(input)?;
    let (kept, report) = Deduplicator::new(config.clone()).run(records);
    let written = CsvSink::new(output).write_all(&kept)?;
    Ok(DedupOutcome { report, written })
}

#[derive(Debug)]
pub struct ExploreOutcome {
    pub documents: usize,
    pub skipped: usize,
    pub codes: usize,
    pub terms: usize,
    pub code_table: PathBuf,
    pub code_dist_table: PathBuf,
    pub term_table: PathBuf,
}

/// Count section codes and term mentions; writes `code_occr.csv`,
/// `code_occr_dist.csv` and `term_occr.csv` under `out_dir`.
pub fn run_explore(inputs: &[PathBuf], terms_file: &Path, out_dir: &Path) -> Result<ExploreOutcome> {
    let terms = parse_terms(&std::fs::read_to_string(terms_file)?);
    info!("Exploring with {} terms", terms.len());

    let mut explorer = SectionExplorer::new(&terms)?;
    explorer.explore(Unpacker::open(inputs)?);

    let code_rows = explorer.code_rows();
    let term_rows = explorer.term_rows();
    let code_table = out_dir.join("code_occr.csv");
    let code_dist_table = out_dir.join("code_occr_dist.csv");
    let term_table = out_dir.join("term_occr.csv");
    write_table(&code_table, &code_rows)?;
    write_table(&code_dist_table, &explorer.code_dist_rows())?;
    write_table(&term_table, &term_rows)?;

    Ok(ExploreOutcome {
        documents: explorer.documents(),
        skipped: explorer.skipped(),
        codes: code_rows.len(),
        terms: term_rows.len(),
        code_table,
        code_dist_table,
        term_table,
    })
}
