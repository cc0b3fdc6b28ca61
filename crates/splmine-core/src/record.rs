//! Label data model.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One document payload pulled out of a release archive or directory.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Entry name of the payload (e.g. `3f1a…_spl.xml`).
    pub name: String,
    /// Inner archive or file the payload came from.
    pub origin: String,
    pub content: Vec<u8>,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, origin: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            content,
        }
    }

    /// Name used in logs and records: `origin!name`, or just the name when
    /// the payload was read directly from disk.
    pub fn source_name(&self) -> String {
        if self.origin.is_empty() || self.origin == self.name {
            self.name.clone()
        } else {
            format!("{}!{}", self.origin, self.name)
        }
    }
}

/// Required identity fields of a label document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelIdentity {
    /// Globally unique id of this XML instance (`<id root>`).
    pub document_id: String,
    /// Groups all versions of the same label (`<setId root>`).
    pub set_id: String,
    /// Positive, monotonic per `set_id`.
    pub version_number: u32,
}

/// One extracted indication section, the unit of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub identity: LabelIdentity,
    /// Section code that matched (e.g. `34067-9`).
    pub section_code: String,
    pub indication_text: String,
    /// Where the payload was read from; empty for records loaded back from CSV.
    #[serde(default)]
    pub source: String,
}

impl LabelRecord {
    /// Character count of the (normalized) indication text.
    pub fn text_length(&self) -> usize {
        self.indication_text.chars().count()
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.indication_text)
    }
}

/// SHA-256 hex digest of a text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
