//! Row types of the output tables.

use serde::{Deserialize, Serialize};

use splmine_core::{LabelIdentity, LabelRecord, DEFAULT_INDICATION_CODE};

/// One output row: `set_id,xml_id,version_number,length,indication`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicationRow {
    pub set_id: String,
    #[serde(rename = "xml_id")]
    pub document_id: String,
    pub version_number: u32,
    /// Character count of `indication`.
    pub length: usize,
    pub indication: String,
}

impl From<&LabelRecord> for IndicationRow {
    fn from(record: &LabelRecord) -> Self {
        Self {
            set_id: record.identity.set_id.clone(),
            document_id: record.identity.document_id.clone(),
            version_number: record.identity.version_number,
            length: record.text_length(),
            indication: record.indication_text.clone(),
        }
    }
}

impl From<IndicationRow> for LabelRecord {
    /// Tables carry no section code; rows read back are taken to be
    /// indication sections.
    fn from(row: IndicationRow) -> Self {
        Self {
            identity: LabelIdentity {
                document_id: row.document_id,
                set_id: row.set_id,
                version_number: row.version_number,
            },
            section_code: DEFAULT_INDICATION_CODE.to_string(),
            indication_text: row.indication,
            source: String::new(),
        }
    }
}
