use serde::{Deserialize, Serialize};

use crate::block::Envelope;
use crate::dataset::RecordError;

/// A record-level failure as carried in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub code:    u32,
    pub message: String,
}

impl From<&RecordError> for ReportedError {
    fn from(e: &RecordError) -> Self {
        Self { code: e.code(), message: e.to_string() }
    }
}

/// Outcome of one block (read) or one record (write).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReport {
    /// Block index on read, record index on write.
    pub index:     usize,
    pub type_code: u32,
    pub binary:    bool,
    #[serde(default)]
    pub error:     Option<ReportedError>,
    /// Present in info mode only.
    #[serde(default)]
    pub envelope:  Option<Envelope>,
}

impl RecordReport {
    pub fn ok(index: usize, type_code: u32, binary: bool) -> Self {
        Self { index, type_code, binary, error: None, envelope: None }
    }

    pub fn failed(index: usize, type_code: u32, binary: bool, error: &RecordError) -> Self {
        Self { error: Some(error.into()), ..Self::ok(index, type_code, binary) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A self-correction made while decoding a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub block:   usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub entries:  Vec<RecordReport>,
    pub warnings: Vec<Warning>,
    /// Blocks found by the scanner (read) or records offered (write).
    pub blocks:   usize,
}

impl Report {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn errors(&self) -> impl Iterator<Item = &RecordReport> {
        self.entries.iter().filter(|e| !e.is_ok())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} blocks, {} records: {} ok, {} failed, {} warnings",
            self.blocks,
            self.entries.len(),
            self.succeeded(),
            self.failed(),
            self.warnings.len()
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_summary() {
        let report = Report {
            entries: vec![
                RecordReport::ok(0, 151, false),
                RecordReport::failed(1, 9999, false, &RecordError::UnsupportedType { type_code: 9999 }),
                RecordReport::ok(2, 58, true),
            ],
            warnings: vec![Warning { block: 2, message: "skipped 8 trailing bytes".into() }],
            blocks:   3,
        };
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.errors().next().unwrap().error.as_ref().unwrap().code, 3);
        assert_eq!(report.summary(), "3 blocks, 3 records: 2 ok, 1 failed, 1 warnings");

        let back = Report::from_bytes(&report.to_bytes().unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
