//! Loading previously written indication tables.

use std::path::Path;

use tracing::info;

use crate::types::IndicationRow;
use splmine_core::{Error, LabelRecord, Result};

/// Read an indications CSV back into records, in file order.
pub fn read_indications_csv(path: &Path) -> Result<Vec<LabelRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| Error::Io(e.into()))?;
    let rows: Vec<IndicationRow> = reader
        .deserialize()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Io(e.into()))?;
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows.into_iter().map(LabelRecord::from).collect())
}
