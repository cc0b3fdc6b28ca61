//! splmine ingest: release unpacking, SPL parsing, normalization, extraction.

pub mod archive;
pub mod explore;
pub mod extract;
pub mod normalize;
pub mod parse;

pub use archive::{InputKind, UnpackStats, Unpacker};
pub use explore::{parse_terms, CodeDistRow, CodeRow, SectionExplorer, TermRow};
pub use extract::{apply_unpack_stats, Extraction, Extractor};
pub use normalize::{normalize, normalize_indication, strip_heading};
pub use parse::{detect_namespace, DocumentParser, DocumentScan, ParsedLabel, SectionText};
