//! splmine store: tabular output of indication records.

pub mod reader;
pub mod sink;
pub mod types;

pub use reader::read_indications_csv;
pub use sink::{subset_by_length, write_summary, write_table, CsvSink, JsonlSink, RecordSink};
pub use types::IndicationRow;
