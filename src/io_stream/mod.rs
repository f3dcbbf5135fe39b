//! Block reader and record writer.
//!
//! # Reader
//! [`UffReader`] borrows the whole file image, scans it once for block
//! ranges, and decodes blocks on demand.  Every block is decoded in
//! isolation: a failure becomes a [`BlockOutcome`] carrying the error and an
//! empty record slot, so block indices and record positions stay aligned.
//! With the `parallel` feature the selected blocks are decoded on the rayon
//! pool; the output order is always the visitation order.
//!
//! # Writer
//! [`UffWriter`] encodes one record at a time into a scratch buffer and only
//! emits it, wrapped in sentinel lines, once the encode succeeded.  Encode
//! failures are recorded in the report; I/O failures abort.

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::block::{parse_block, read_envelope, Envelope};
use crate::dataset::{encode_record, get_decoder, RecordError};
use crate::record::Record;
use crate::report::{RecordReport, Report, Warning};
use crate::scanner::{scan, BlockRange, ScanError, SENTINEL};

// ── Reader ───────────────────────────────────────────────────────────────────

/// Result of decoding one block.
#[derive(Debug, Clone)]
pub struct BlockOutcome {
    pub index:     usize,
    pub type_code: u32,
    pub binary:    bool,
    pub record:    Record,
    pub error:     Option<RecordError>,
    pub warnings:  Vec<String>,
}

impl BlockOutcome {
    fn failed(index: usize, type_code: u32, binary: bool, error: RecordError) -> Self {
        let record = match error {
            RecordError::UnsupportedType { .. } => Record::Unsupported { type_code, binary },
            _ => Record::Undecoded { type_code, binary },
        };
        Self { index, type_code, binary, record, error: Some(error), warnings: Vec::new() }
    }

    pub fn report(&self) -> RecordReport {
        match &self.error {
            Some(e) => RecordReport::failed(self.index, self.type_code, self.binary, e),
            None    => RecordReport::ok(self.index, self.type_code, self.binary),
        }
    }
}

pub struct UffReader<'a> {
    data:   &'a [u8],
    blocks: Vec<BlockRange>,
}

impl<'a> UffReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, ScanError> {
        let blocks = scan(data)?;
        Ok(Self { data, blocks })
    }

    pub fn blocks(&self) -> &[BlockRange] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Envelope of block `index` without decoding its content.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn envelope(&self, index: usize) -> Result<(Envelope, Option<String>), RecordError> {
        read_envelope(self.data, &self.blocks[index])
    }

    /// Decode block `index`.  Returns `None` when `types` is non-empty and the
    /// block's type is not in it (or cannot be determined).
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn decode_block(&self, index: usize, types: &[u32]) -> Option<BlockOutcome> {
        let range = &self.blocks[index];
        let block = match parse_block(self.data, range) {
            Ok(block) => block,
            Err(e) => {
                let (type_code, binary) = read_envelope(self.data, range)
                    .map(|(env, _)| (env.type_code, env.binary))
                    .unwrap_or((0, false));
                if !types.is_empty() && !types.contains(&type_code) {
                    return None;
                }
                debug!(block = index, error = %e, "block header rejected");
                return Some(BlockOutcome::failed(index, type_code, binary, e));
            }
        };

        let type_code = block.envelope.type_code;
        let binary    = block.envelope.binary;
        if !types.is_empty() && !types.contains(&type_code) {
            return None;
        }

        let mut warnings = block.warnings.clone();
        let result = get_decoder(type_code)
            .and_then(|codec| codec.decode(&block.view(self.data), &mut warnings));

        let mut outcome = match result {
            Ok(record) => {
                debug!(block = index, type_code, binary, "decoded");
                BlockOutcome { index, type_code, binary, record, error: None, warnings: Vec::new() }
            }
            Err(e) => {
                debug!(block = index, type_code, error = %e, "decode failed");
                BlockOutcome::failed(index, type_code, binary, e)
            }
        };
        outcome.warnings = warnings;
        Some(outcome)
    }

    /// Decode `indices` in order, keeping only blocks whose type is in
    /// `types` (all blocks when empty).
    pub fn decode_many(&self, indices: &[usize], types: &[u32]) -> Vec<BlockOutcome> {
        #[cfg(feature = "parallel")]
        let outcomes: Vec<Option<BlockOutcome>> = {
            use rayon::prelude::*;
            indices.par_iter().map(|&i| self.decode_block(i, types)).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Option<BlockOutcome>> =
            indices.iter().map(|&i| self.decode_block(i, types)).collect();

        outcomes.into_iter().flatten().collect()
    }
}

/// Move outcome warnings into the report, logging them when enabled.
pub(crate) fn collect_warnings(outcome: &mut BlockOutcome, enabled: bool, report: &mut Report) {
    for message in outcome.warnings.drain(..) {
        if enabled {
            warn!(block = outcome.index, type_code = outcome.type_code, "{message}");
            report.warnings.push(Warning { block: outcome.index, message });
        }
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct UffWriter<W: Write> {
    writer: W,
    report: Report,
}

impl<W: Write> UffWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, report: Report::default() }
    }

    fn sentinel(&mut self) -> io::Result<()> {
        self.writer.write_all(SENTINEL)?;
        self.writer.write_all(b"\n")
    }

    /// Encode and emit one record.  Encode errors go to the report and leave
    /// the output untouched; only I/O errors are returned.
    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        let index = self.report.blocks;
        self.report.blocks += 1;
        let type_code = record.type_code();
        let binary    = record.is_binary();

        match encode_record(record) {
            Ok(body) => {
                self.sentinel()?;
                self.writer.write_all(&body)?;
                self.sentinel()?;
                debug!(record = index, type_code, bytes = body.len(), "encoded");
                self.report.entries.push(RecordReport::ok(index, type_code, binary));
            }
            Err(e) => {
                warn!(record = index, type_code, error = %e, "record not written");
                self.report.entries.push(RecordReport::failed(index, type_code, binary, &e));
            }
        }
        Ok(())
    }

    pub fn write_all(&mut self, records: &[Record]) -> io::Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Flush and hand back the writer with the accumulated report.
    pub fn finish(mut self) -> io::Result<(W, Report)> {
        self.writer.flush()?;
        Ok((self.writer, self.report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FileHeader, Node};

    fn header(name: &str) -> Record {
        Record::FileHeader(FileHeader {
            model_name:   name.into(),
            date_written: "01-Jan-24".into(),
            time_written: "00:00:00".into(),
            ..Default::default()
        })
    }

    fn written(records: &[Record]) -> (Vec<u8>, Report) {
        let mut w = UffWriter::new(Vec::new());
        w.write_all(records).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn failed_encode_leaves_no_block() {
        let (bytes, report) = written(&[
            header("a"),
            Record::Unsupported { type_code: 9999, binary: false },
            Record::Nodes(vec![Node::new(1, [0.0; 3])]),
        ]);
        assert_eq!(report.blocks, 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.entries[1].error.as_ref().unwrap().code, 3);

        let reader = UffReader::new(&bytes).unwrap();
        assert_eq!(reader.block_count(), 2);
    }

    #[test]
    fn type_filter_skips_blocks() {
        let (bytes, _) = written(&[header("a"), Record::Nodes(vec![Node::new(1, [0.0; 3])]), header("b")]);
        let reader = UffReader::new(&bytes).unwrap();
        let outcomes = reader.decode_many(&[0, 1, 2], &[151]);
        assert_eq!(outcomes.iter().map(|o| o.index).collect::<Vec<_>>(), vec![0, 2]);
        assert!(outcomes.iter().all(|o| o.error.is_none()));
    }

    #[test]
    fn unsupported_block_keeps_its_slot() {
        let data = b"    -1\n  9999\n  1 2 3\n    -1\n    -1\n    15\n         1         0         0         0  0.00000E+00  0.00000E+00  0.00000E+00\n    -1\n";
        let reader = UffReader::new(data).unwrap();
        let outcomes = reader.decode_many(&[0, 1], &[]);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].record, Record::Unsupported { type_code: 9999, binary: false });
        assert_eq!(outcomes[0].report().error.unwrap().code, 3);
        assert!(matches!(outcomes[1].record, Record::Nodes(_)));
    }

    #[test]
    fn empty_block_reports_its_type() {
        let data = b"    -1\n    82\n    -1\n";
        let reader = UffReader::new(data).unwrap();
        let outcome = reader.decode_block(0, &[]).unwrap();
        assert_eq!(outcome.type_code, 82);
        assert_eq!(outcome.error, Some(RecordError::EmptyBlock));
        assert_eq!(outcome.record, Record::Undecoded { type_code: 82, binary: false });
    }

    #[test]
    fn header_recovery_warning_follows_switch() {
        let data = b"    -1\n15\n         1         0         0         0  1.0  2.0  3.0\n    -1\n";
        let reader = UffReader::new(data).unwrap();
        let outcome = reader.decode_block(0, &[]).unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.warnings.len(), 1);

        let mut quiet = Report::default();
        let mut loud  = Report::default();
        collect_warnings(&mut outcome.clone(), false, &mut quiet);
        collect_warnings(&mut outcome.clone(), true, &mut loud);
        assert!(quiet.warnings.is_empty());
        assert_eq!(loud.warnings, vec![Warning { block: 0, message: outcome.warnings[0].clone() }]);
    }
}
