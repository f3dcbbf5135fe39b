//! High-level read/write API, the primary embedding surface.
//!
//! ```no_run
//! use uffkit::file::{read_file, write_file, ReadOptions, WriteMode};
//! use uffkit::record::{Record, Series, Measurement};
//!
//! // Write
//! let frf = Measurement::even(0.0, 0.5, Series::Real(vec![1.0, 2.0, 3.0]));
//! write_file("out.uff", &[Record::Measurement(frf)], WriteMode::Replace)?;
//!
//! // Read
//! let uff = read_file("out.uff", &ReadOptions::default())?;
//! assert_eq!(uff.records.len(), 1);
//! println!("{}", uff.report.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::io_stream::{collect_warnings, UffReader, UffWriter};
use crate::record::Record;
use crate::report::{RecordReport, Report, Warning};
use crate::scanner::ScanError;

// ── Errors ───────────────────────────────────────────────────────────────────

/// File-level failure.  Aborts the call with no partial result.
#[derive(Error, Debug)]
pub enum UffError {
    #[error("{}: {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("record index {index} is out of range for a file with {blocks} blocks")]
    IndexOutOfRange { index: usize, blocks: usize },
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

// ── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadMode {
    /// Envelopes only; no record is decoded.
    Info,
    #[default]
    Full,
    /// 0-based block indices and type codes; an empty list does not filter.
    Filtered { indices: Vec<usize>, types: Vec<u32> },
}

/// Configuration for [`read_file`] / [`read_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    pub mode:     ReadMode,
    /// Log self-corrections and keep them in the report.
    pub warnings: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { mode: ReadMode::Full, warnings: true }
    }
}

impl ReadOptions {
    pub fn info() -> Self {
        Self { mode: ReadMode::Info, ..Self::default() }
    }

    pub fn filtered(indices: Vec<usize>, types: Vec<u32>) -> Self {
        Self { mode: ReadMode::Filtered { indices, types }, ..Self::default() }
    }

    pub fn quiet(mut self) -> Self {
        self.warnings = false;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    #[default]
    Replace,
    Append,
}

// ── UffFile ──────────────────────────────────────────────────────────────────

/// Decoded records plus the per-block report.  `records[i]` corresponds to
/// `report.entries[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UffFile {
    pub records: Vec<Record>,
    pub report:  Report,
}

// ── Read ─────────────────────────────────────────────────────────────────────

pub fn read_file<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<UffFile, UffError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| UffError::Io { path: path.to_owned(), source })?;
    debug!(path = %path.display(), bytes = data.len(), "read file");
    read_bytes(&data, opts)
}

pub fn read_bytes(data: &[u8], opts: &ReadOptions) -> Result<UffFile, UffError> {
    let reader = UffReader::new(data)?;
    let blocks = reader.block_count();
    let mut uff = UffFile { records: Vec::new(), report: Report { blocks, ..Report::default() } };

    let (indices, types): (Vec<usize>, Vec<u32>) = match &opts.mode {
        ReadMode::Info => {
            for index in 0..blocks {
                uff.report.entries.push(info_entry(&reader, index, opts.warnings, &mut uff.report.warnings));
            }
            return Ok(uff);
        }
        ReadMode::Full => ((0..blocks).collect(), Vec::new()),
        ReadMode::Filtered { indices, types } => {
            if let Some(&index) = indices.iter().find(|&&i| i >= blocks) {
                return Err(UffError::IndexOutOfRange { index, blocks });
            }
            let indices = if indices.is_empty() { (0..blocks).collect() } else { indices.clone() };
            (indices, types.clone())
        }
    };

    for mut outcome in reader.decode_many(&indices, &types) {
        collect_warnings(&mut outcome, opts.warnings, &mut uff.report);
        uff.report.entries.push(outcome.report());
        uff.records.push(outcome.record);
    }
    debug!(summary = %uff.report.summary(), "read complete");
    Ok(uff)
}

fn info_entry(reader: &UffReader<'_>, index: usize, warn: bool, warnings: &mut Vec<Warning>) -> RecordReport {
    match reader.envelope(index) {
        Ok((envelope, warning)) => {
            if let (true, Some(message)) = (warn, warning) {
                tracing::warn!(block = index, "{message}");
                warnings.push(Warning { block: index, message });
            }
            RecordReport {
                envelope: Some(envelope.clone()),
                ..RecordReport::ok(index, envelope.type_code, envelope.binary)
            }
        }
        Err(e) => RecordReport::failed(index, 0, false, &e),
    }
}

// ── Write ────────────────────────────────────────────────────────────────────

pub fn write_file<P: AsRef<Path>>(path: P, records: &[Record], mode: WriteMode) -> Result<Report, UffError> {
    let path = path.as_ref();
    let file = open_for_write(path, mode).map_err(|source| UffError::Io { path: path.to_owned(), source })?;
    let report = write_to(&mut BufWriter::new(file), records)?;
    debug!(path = %path.display(), summary = %report.summary(), "write complete");
    Ok(report)
}

/// Encode `records` into `out`.  Per-record encode failures are reported;
/// I/O failures abort.
pub fn write_to<W: Write>(out: &mut W, records: &[Record]) -> Result<Report, UffError> {
    let mut writer = UffWriter::new(out);
    writer.write_all(records).map_err(UffError::Write)?;
    let (_, report) = writer.finish().map_err(UffError::Write)?;
    Ok(report)
}

fn open_for_write(path: &Path, mode: WriteMode) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    match mode {
        WriteMode::Replace => opts.write(true).create(true).truncate(true),
        WriteMode::Append  => opts.append(true).create(true),
    };
    opts.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FileHeader, Node};

    fn sample() -> Vec<Record> {
        vec![
            Record::FileHeader(FileHeader {
                model_name:   "m".into(),
                date_written: "01-Jan-24".into(),
                time_written: "00:00:00".into(),
                ..Default::default()
            }),
            Record::Nodes(vec![Node::new(1, [1.0, 2.0, 3.0])]),
        ]
    }

    fn bytes(records: &[Record]) -> Vec<u8> {
        let mut out = Vec::new();
        write_to(&mut out, records).unwrap();
        out
    }

    #[test]
    fn full_read_roundtrip() {
        let records = sample();
        let uff = read_bytes(&bytes(&records), &ReadOptions::default()).unwrap();
        assert_eq!(uff.records, records);
        assert_eq!(uff.report.failed(), 0);
    }

    #[test]
    fn info_mode_fills_envelopes_only() {
        let uff = read_bytes(&bytes(&sample()), &ReadOptions::info()).unwrap();
        assert!(uff.records.is_empty());
        assert_eq!(uff.report.entries.len(), 2);
        assert_eq!(uff.report.entries[1].envelope.as_ref().unwrap().type_code, 15);
    }

    #[test]
    fn index_out_of_range_is_fatal() {
        let err = read_bytes(&bytes(&sample()), &ReadOptions::filtered(vec![0, 2], vec![])).unwrap_err();
        assert!(matches!(err, UffError::IndexOutOfRange { index: 2, blocks: 2 }));
    }

    #[test]
    fn scan_errors_are_fatal() {
        assert!(matches!(
            read_bytes(b"nothing here\n", &ReadOptions::default()),
            Err(UffError::Scan(ScanError::NoBlocks))
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_file("/nonexistent/dir/file.uff", &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("/nonexistent/dir/file.uff"));
    }
}
