//! Tabular sinks. Each sink receives the whole retained batch at once.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::types::IndicationRow;
use splmine_core::{Error, LabelRecord, Result};

/// Destination for the final record batch. Failures are fatal for the run.
pub trait RecordSink {
    /// Write every record, returning the number of rows written.
    fn write_all(&mut self, records: &[LabelRecord]) -> Result<usize>;
}

fn output_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Output(format!("{}: {}", path.display(), err))
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| output_error(path, e))?;
    }
    File::create(path).map_err(|e| output_error(path, e))
}

/// CSV with header `set_id,xml_id,version_number,length,indication`.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for CsvSink {
    fn write_all(&mut self, records: &[LabelRecord]) -> Result<usize> {
        let mut writer = csv::Writer::from_writer(create(&self.path)?);
        if records.is_empty() {
            // serialize() emits the header with the first row only.
            writer
                .write_record(["set_id", "xml_id", "version_number", "length", "indication"])
                .map_err(|e| output_error(&self.path, e))?;
        }
        for record in records {
            writer
                .serialize(IndicationRow::from(record))
                .map_err(|e| output_error(&self.path, e))?;
        }
        writer.flush().map_err(|e| output_error(&self.path, e))?;
        info!("Wrote {} rows to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

/// One JSON object per line with the same fields as the CSV.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for JsonlSink {
    fn write_all(&mut self, records: &[LabelRecord]) -> Result<usize> {
        let mut writer = BufWriter::new(create(&self.path)?);
        for record in records {
            serde_json::to_writer(&mut writer, &IndicationRow::from(record))
                .map_err(|e| output_error(&self.path, e))?;
            writer
                .write_all(b"\n")
                .map_err(|e| output_error(&self.path, e))?;
        }
        writer.flush().map_err(|e| output_error(&self.path, e))?;
        info!("Wrote {} lines to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

/// Records whose text length lies within `min..=max` (either bound optional).
pub fn subset_by_length(
    records: &[LabelRecord],
    min: Option<usize>,
    max: Option<usize>,
) -> Vec<LabelRecord> {
    records
        .iter()
        .filter(|r| {
            let len = r.text_length();
            min.map_or(true, |m| len >= m) && max.map_or(true, |m| len <= m)
        })
        .cloned()
        .collect()
}

/// Write any serializable rows as CSV, header taken from the field names.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for row in rows {
        writer.serialize(row).map_err(|e| output_error(path, e))?;
    }
    writer.flush().map_err(|e| output_error(path, e))?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Persist a run summary (or any report) as pretty JSON.
pub fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(|e| output_error(path, e))?;
    let mut file = create(path)?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .map_err(|e| output_error(path, e))?;
    info!("Wrote summary to {}", path.display());
    Ok(())
}
