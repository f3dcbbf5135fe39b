//! Dataset registry: type codes, the per-dataset codec trait, and errors.
//!
//! # Identity rules
//! Every dataset layout is identified by the integer type code written in
//! columns 1-6 of its block header.  [`DatasetType`] is the closed set this
//! crate knows; a code outside it decodes to [`Record::Unsupported`] and is
//! never guessed at.
//!
//! Some layouts are write-only (1858, 1860, 2420): they can be produced for
//! downstream tools, but a block carrying one of those codes reads back as
//! unsupported.
//!
//! # Codec contract
//! A [`DatasetCodec`] is a pure function pair.  `decode` sees the file
//! buffer, the block's absolute line table, and its envelope; `encode` writes
//! the header line and body of one record into a [`LineWriter`].  Neither
//! touches shared state, so blocks can be decoded in parallel.

use std::ops::Range;

use thiserror::Error;

use crate::block::Envelope;
use crate::field::{FieldError, Line, LineSpan, LineWriter};
use crate::record::Record;

mod coordinates;
mod elements;
mod header;
mod measurement;
mod nodes;
mod qualifiers;
mod response;
mod trace;
mod units;

pub use coordinates::{CoordinateMatricesCodec, CoordinateSystemsCodec};
pub use elements::{ElementsCodec, BEAM_DESCRIPTORS};
pub use header::FileHeaderCodec;
pub use measurement::{MeasurementCase, MeasurementCodec};
pub use nodes::NodesCodec;
pub use qualifiers::{QualifiersCodec, TransducerCodec};
pub use response::NodalResponseCodec;
pub use trace::TraceLineCodec;
pub use units::UnitsCodec;

// ── Type codes ───────────────────────────────────────────────────────────────

pub const TYPE_NODES:                  u32 = 15;
pub const TYPE_COORDINATE_SYSTEMS:     u32 = 18;
pub const TYPE_NODAL_RESPONSE:         u32 = 55;
pub const TYPE_MEASUREMENT:            u32 = 58;
pub const TYPE_TRACE_LINE:             u32 = 82;
pub const TYPE_FILE_HEADER:            u32 = 151;
pub const TYPE_UNITS:                  u32 = 164;
pub const TYPE_MEASUREMENT_QUALIFIERS: u32 = 1858;
pub const TYPE_TRANSDUCER:             u32 = 1860;
pub const TYPE_DOUBLE_NODES:           u32 = 2411;
pub const TYPE_ELEMENTS:               u32 = 2412;
pub const TYPE_COORDINATE_MATRICES:    u32 = 2420;

/// Runtime dataset discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetType {
    Nodes,
    CoordinateSystems,
    NodalResponse,
    Measurement,
    TraceLine,
    FileHeader,
    Units,
    MeasurementQualifiers,
    Transducer,
    DoubleNodes,
    Elements,
    CoordinateMatrices,
}

impl DatasetType {
    pub const ALL: [DatasetType; 12] = [
        DatasetType::Nodes,
        DatasetType::CoordinateSystems,
        DatasetType::NodalResponse,
        DatasetType::Measurement,
        DatasetType::TraceLine,
        DatasetType::FileHeader,
        DatasetType::Units,
        DatasetType::MeasurementQualifiers,
        DatasetType::Transducer,
        DatasetType::DoubleNodes,
        DatasetType::Elements,
        DatasetType::CoordinateMatrices,
    ];

    #[inline]
    pub fn code(self) -> u32 {
        match self {
            DatasetType::Nodes                 => TYPE_NODES,
            DatasetType::CoordinateSystems     => TYPE_COORDINATE_SYSTEMS,
            DatasetType::NodalResponse         => TYPE_NODAL_RESPONSE,
            DatasetType::Measurement           => TYPE_MEASUREMENT,
            DatasetType::TraceLine             => TYPE_TRACE_LINE,
            DatasetType::FileHeader            => TYPE_FILE_HEADER,
            DatasetType::Units                 => TYPE_UNITS,
            DatasetType::MeasurementQualifiers => TYPE_MEASUREMENT_QUALIFIERS,
            DatasetType::Transducer            => TYPE_TRANSDUCER,
            DatasetType::DoubleNodes           => TYPE_DOUBLE_NODES,
            DatasetType::Elements              => TYPE_ELEMENTS,
            DatasetType::CoordinateMatrices    => TYPE_COORDINATE_MATRICES,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Human-readable name for diagnostics; never parsed.
    pub fn name(self) -> &'static str {
        match self {
            DatasetType::Nodes                 => "nodes",
            DatasetType::CoordinateSystems     => "coordinate systems",
            DatasetType::NodalResponse         => "data at nodes",
            DatasetType::Measurement           => "function at dof",
            DatasetType::TraceLine             => "trace line",
            DatasetType::FileHeader            => "file header",
            DatasetType::Units                 => "units",
            DatasetType::MeasurementQualifiers => "function qualifiers",
            DatasetType::Transducer            => "transducer",
            DatasetType::DoubleNodes           => "nodes (double precision)",
            DatasetType::Elements              => "elements",
            DatasetType::CoordinateMatrices    => "coordinate system matrices",
        }
    }

    /// Whether blocks of this type can be decoded.
    pub fn is_readable(self) -> bool {
        !matches!(
            self,
            DatasetType::MeasurementQualifiers
                | DatasetType::Transducer
                | DatasetType::CoordinateMatrices
        )
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Recoverable, per-record failure.  Never aborts a file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("empty data block")]
    EmptyBlock,
    #[error("unsupported dataset type {type_code}")]
    UnsupportedType { type_code: u32 },
    #[error("dataset {type_code}: {what} is not implemented")]
    Unimplemented { type_code: u32, what: String },
    #[error("not enough data: {needed} bytes declared, {available} available")]
    NotEnoughData { needed: usize, available: usize },
    #[error("line {line}: {source}")]
    InvalidField {
        line:   usize,
        #[source]
        source: FieldError,
    },
    #[error("dataset {type_code}: missing line {line}")]
    MissingLine { type_code: u32, line: usize },
    /// Fields parse but disagree with each other or with declared counts.
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("unsupported floating-point format {0}")]
    UnsupportedFloatFormat(i64),
}

impl RecordError {
    /// Stable numeric code carried in the report.
    pub fn code(&self) -> u32 {
        match self {
            RecordError::MalformedHeader(_)          => 1,
            RecordError::EmptyBlock                  => 2,
            RecordError::UnsupportedType { .. }      => 3,
            RecordError::Unimplemented { .. }        => 4,
            RecordError::NotEnoughData { .. }        => 5,
            RecordError::InvalidField { .. }
            | RecordError::MissingLine { .. }
            | RecordError::InvalidData(_)            => 6,
            RecordError::InvalidRecord(_)            => 7,
            RecordError::UnsupportedFloatFormat(_)   => 8,
        }
    }
}

// ── Block view ───────────────────────────────────────────────────────────────

/// Everything a decoder may look at for one block.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    pub data:     &'a [u8],
    /// Content lines after the header line, absolute offsets.
    pub lines:    &'a [LineSpan],
    pub envelope: &'a Envelope,
    /// Binary payload range; empty for ASCII blocks.
    pub payload:  &'a Range<usize>,
}

impl<'a> BlockView<'a> {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Content line `index` (0-based).
    pub fn line(&self, index: usize) -> Result<Line<'a>, RecordError> {
        let data: &'a [u8] = self.data;
        self.lines
            .get(index)
            .map(|span| span.view(data))
            .ok_or(RecordError::MissingLine {
                type_code: self.envelope.type_code,
                line:      index + 1,
            })
    }

    /// Content line `index`, or a blank line when the block is shorter.
    pub fn line_or_blank(&self, index: usize) -> Line<'a> {
        self.line(index).unwrap_or_else(|_| Line::blank())
    }

    /// Content lines from `index` to the end of the block.
    pub fn lines_from(&self, index: usize) -> impl Iterator<Item = Line<'a>> + 'a {
        let data: &'a [u8] = self.data;
        let lines: &'a [LineSpan] = self.lines;
        lines.get(index..).unwrap_or(&[]).iter().map(move |s| s.view(data))
    }

    pub fn payload_bytes(&self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        &data[self.payload.clone()]
    }
}

/// Attach a 1-based line number to a field error.
pub(crate) fn at_line(line: usize) -> impl Fn(FieldError) -> RecordError {
    move |source| RecordError::InvalidField { line, source }
}

pub(crate) fn wrong_record(expected: DatasetType, record: &Record) -> RecordError {
    RecordError::InvalidRecord(format!(
        "{} codec cannot encode a record of type {}",
        expected.name(),
        record.type_code()
    ))
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait DatasetCodec: Send + Sync {
    fn dataset_type(&self) -> DatasetType;

    /// Decode one block.  Self-corrections go to `warnings`.
    fn decode(&self, block: &BlockView<'_>, warnings: &mut Vec<String>)
        -> Result<Record, RecordError>;

    /// Write the header line and body of `record` (sentinels excluded).
    fn encode(&self, record: &Record, out: &mut LineWriter) -> Result<(), RecordError>;
}

/// Resolve a codec for a dataset type.
pub fn get_codec(dataset_type: DatasetType) -> Box<dyn DatasetCodec> {
    match dataset_type {
        DatasetType::Nodes                 => Box::new(NodesCodec::single()),
        DatasetType::DoubleNodes           => Box::new(NodesCodec::double()),
        DatasetType::CoordinateSystems     => Box::new(CoordinateSystemsCodec),
        DatasetType::NodalResponse         => Box::new(NodalResponseCodec),
        DatasetType::Measurement           => Box::new(MeasurementCodec),
        DatasetType::TraceLine             => Box::new(TraceLineCodec),
        DatasetType::FileHeader            => Box::new(FileHeaderCodec),
        DatasetType::Units                 => Box::new(UnitsCodec),
        DatasetType::MeasurementQualifiers => Box::new(QualifiersCodec),
        DatasetType::Transducer            => Box::new(TransducerCodec),
        DatasetType::Elements              => Box::new(ElementsCodec),
        DatasetType::CoordinateMatrices    => Box::new(CoordinateMatricesCodec),
    }
}

/// Resolve a codec able to decode blocks with `type_code`.
pub fn get_decoder(type_code: u32) -> Result<Box<dyn DatasetCodec>, RecordError> {
    match DatasetType::from_code(type_code) {
        Some(t) if t.is_readable() => Ok(get_codec(t)),
        _ => Err(RecordError::UnsupportedType { type_code }),
    }
}

/// Encode a record (header line + body) into a fresh buffer.
pub fn encode_record(record: &Record) -> Result<Vec<u8>, RecordError> {
    let dataset_type = record.dataset_type().ok_or(RecordError::UnsupportedType {
        type_code: record.type_code(),
    })?;
    let mut out = LineWriter::new();
    get_codec(dataset_type).encode(record, &mut out)?;
    Ok(out.into_bytes())
}

/// Write the plain ASCII header line for `dataset_type`.
pub(crate) fn ascii_header(dataset_type: DatasetType, out: &mut LineWriter) {
    Envelope::ascii(dataset_type.code()).write(out);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Decode helpers shared by the per-dataset tests.

    use super::*;
    use crate::block::parse_block;
    use crate::scanner::scan;

    /// Wrap an encoded body in sentinels and decode it back.
    pub fn decode_bytes(body: &[u8]) -> (Result<Record, RecordError>, Vec<String>) {
        let mut file = b"    -1\n".to_vec();
        file.extend_from_slice(body);
        file.extend_from_slice(b"    -1\n");
        decode_file(&file)
    }

    /// Decode the first block of a complete file image.
    pub fn decode_file(file: &[u8]) -> (Result<Record, RecordError>, Vec<String>) {
        let ranges = scan(file).expect("scan");
        let mut warnings = Vec::new();
        let block = match parse_block(file, &ranges[0]) {
            Ok(b) => b,
            Err(e) => return (Err(e), warnings),
        };
        warnings.extend(block.warnings.iter().cloned());
        let result = get_decoder(block.envelope.type_code)
            .and_then(|codec| codec.decode(&block.view(file), &mut warnings));
        (result, warnings)
    }

    pub fn roundtrip(record: &Record) -> Record {
        let body = encode_record(record).expect("encode");
        let (decoded, _) = decode_bytes(&body);
        decoded.expect("decode")
    }
}
