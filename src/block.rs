//! Block header parsing: the dataset envelope and the per-block line table.
//!
//! The first content line of every block is its envelope.  Plain ASCII
//! datasets only carry the type code in columns 1-6.  The binary-hybrid
//! variant (`58b`) puts a `b` in column 7 and declares its payload layout:
//!
//! | Columns | Field |
//! |---------|-------|
//! | 1-6   | type code |
//! | 7     | `b` / `B` |
//! | 8-13  | byte order (1 little, 2 big) |
//! | 14-19 | float format (2 = IEEE 754) |
//! | 20-31 | ASCII lines following the envelope |
//! | 32-43 | payload byte count |
//! | 44-79 | four auxiliary integers (I6, I6, I12, I12) |
//!
//! The byte count is a hint: the measurement decoder cross-checks it against
//! the bytes actually present before the closing sentinel.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::dataset::{BlockView, RecordError};
use crate::field::{tokens, Line, LineSpan, LineWriter};
use crate::record::Endian;
use crate::scanner::BlockRange;

/// Float format code for IEEE 754.
pub const FLOAT_FORMAT_IEEE: i64 = 2;
/// ASCII header lines between a measurement envelope and its payload.
pub const MEASUREMENT_ASCII_LINES: i64 = 11;

// ── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub type_code:    u32,
    pub binary:       bool,
    pub byte_order:   i64,
    pub float_format: i64,
    pub ascii_lines:  i64,
    pub byte_count:   i64,
    pub aux:          [i64; 4],
}

impl Envelope {
    pub fn ascii(type_code: u32) -> Self {
        Self {
            type_code,
            binary:       false,
            byte_order:   0,
            float_format: 0,
            ascii_lines:  0,
            byte_count:   0,
            aux:          [0; 4],
        }
    }

    pub fn binary(type_code: u32, endian: Endian, byte_count: i64) -> Self {
        Self {
            type_code,
            binary:       true,
            byte_order:   endian.code(),
            float_format: FLOAT_FORMAT_IEEE,
            ascii_lines:  MEASUREMENT_ASCII_LINES,
            byte_count,
            aux:          [0; 4],
        }
    }

    pub fn endian(&self) -> Option<Endian> {
        Endian::from_code(self.byte_order)
    }

    pub fn write(&self, out: &mut LineWriter) {
        out.int(6, self.type_code as i64);
        if self.binary {
            out.text(1, "b")
                .int(6, self.byte_order)
                .int(6, self.float_format)
                .int(12, self.ascii_lines)
                .int(12, self.byte_count)
                .int(6, self.aux[0])
                .int(6, self.aux[1])
                .int(12, self.aux[2])
                .int(12, self.aux[3]);
        }
        out.end();
    }

    /// Parse an envelope line.  A short or irregular type field is recovered
    /// by a free-form integer scan and reported as a warning.
    pub fn parse(line: Line<'_>) -> Result<(Self, Option<String>), RecordError> {
        let mut warning = None;
        let type_code = match line.int(1, 6) {
            Ok(code) if line.len() >= 6 && code > 0 => code,
            _ => {
                let code = tokens(line.bytes())
                    .first()
                    .and_then(|t| std::str::from_utf8(t).ok())
                    .map(|t| t.trim_end_matches(['b', 'B']))
                    .and_then(|t| t.parse::<i64>().ok())
                    .filter(|c| *c > 0)
                    .ok_or_else(|| RecordError::MalformedHeader(line.full_text()))?;
                warning = Some(format!(
                    "header line {:?} is not a 6 column type field; recovered type {code}",
                    line.full_text()
                ));
                code
            }
        };
        let type_code = u32::try_from(type_code)
            .map_err(|_| RecordError::MalformedHeader(line.full_text()))?;

        let flag = line.columns(7, 1);
        if warning.is_some() || !(flag == b"b" || flag == b"B") {
            return Ok((Self::ascii(type_code), warning));
        }

        let field = |start, width| {
            line.int(start, width)
                .map_err(|e| RecordError::MalformedHeader(e.to_string()))
        };
        let envelope = Self {
            type_code,
            binary:       true,
            byte_order:   field(8, 6)?,
            float_format: field(14, 6)?,
            ascii_lines:  field(20, 12)?,
            byte_count:   field(32, 12)?,
            aux:          [field(44, 6)?, field(50, 6)?, field(56, 12)?, field(68, 12)?],
        };
        Ok((envelope, None))
    }
}

// ── Data block ───────────────────────────────────────────────────────────────

/// A block with its envelope parsed and its content lines located.
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub index:    usize,
    pub envelope: Envelope,
    /// Content lines after the envelope, absolute offsets.
    pub lines:    Vec<LineSpan>,
    /// Binary payload: from the end of the last ASCII line to the closing
    /// sentinel.  Empty for ASCII blocks.
    pub payload:  Range<usize>,
    pub warnings: Vec<String>,
}

impl DataBlock {
    pub fn view<'a>(&'a self, data: &'a [u8]) -> BlockView<'a> {
        BlockView {
            data,
            lines:    &self.lines,
            envelope: &self.envelope,
            payload:  &self.payload,
        }
    }
}

/// Majority vote between CRLF and bare LF terminators.
fn uses_crlf(bytes: &[u8]) -> bool {
    let mut crlf = 0usize;
    let mut lf   = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            if i > 0 && bytes[i - 1] == b'\r' {
                crlf += 1;
            } else {
                lf += 1;
            }
        }
    }
    crlf > lf
}

/// Iterator over the non-empty lines of a byte range, yielding each line and
/// the offset just past its terminator.
struct Lines<'a> {
    bytes: &'a [u8],
    pos:   usize,
    crlf:  bool,
}

impl Iterator for Lines<'_> {
    type Item = (LineSpan, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let (mut end, next) = match self.bytes[start..].iter().position(|&b| b == b'\n') {
                Some(nl) => (start + nl, start + nl + 1),
                None     => (self.bytes.len(), self.bytes.len()),
            };
            if self.crlf && end > start && self.bytes[end - 1] == b'\r' {
                end -= 1;
            }
            self.pos = next;
            if end > start {
                return Some((LineSpan::new(start, end), next));
            }
        }
        None
    }
}

/// Skip the opening sentinel and parse the envelope line.  Returns the line
/// iterator positioned on the first content line.
fn open_block(bytes: &[u8]) -> Result<(Lines<'_>, Envelope, Option<String>), RecordError> {
    let mut lines = Lines { bytes, pos: 0, crlf: uses_crlf(bytes) };
    let _sentinel = lines.next().ok_or(RecordError::EmptyBlock)?;
    let (header, _) = lines.next().ok_or(RecordError::EmptyBlock)?;
    let (envelope, warning) = Envelope::parse(header.view(bytes))?;
    Ok((lines, envelope, warning))
}

/// Parse only the envelope of a block.
pub fn read_envelope(data: &[u8], range: &BlockRange) -> Result<(Envelope, Option<String>), RecordError> {
    open_block(&data[range.start..range.end]).map(|(_, envelope, warning)| (envelope, warning))
}

/// Locate the envelope and content lines of one block.
///
/// The first non-empty line is the opening sentinel, the second the
/// envelope.  For binary blocks only the declared number of ASCII lines is
/// taken; everything after them up to the closing sentinel is payload.
pub fn parse_block(data: &[u8], range: &BlockRange) -> Result<DataBlock, RecordError> {
    let bytes = &data[range.start..range.end];
    let (mut lines, envelope, warning) = open_block(bytes)?;

    let mut content = Vec::new();
    let mut payload = range.end..range.end;

    if envelope.binary {
        let wanted = if envelope.ascii_lines > 0 {
            envelope.ascii_lines as usize
        } else {
            MEASUREMENT_ASCII_LINES as usize
        };
        let mut payload_start = lines.pos;
        for (span, next) in lines.by_ref().take(wanted) {
            content.push(span);
            payload_start = next;
        }
        payload = range.start + payload_start..range.end;
    } else {
        content.extend(lines.map(|(span, _)| span));
    }

    if content.is_empty() {
        return Err(RecordError::EmptyBlock);
    }

    let lines = content
        .into_iter()
        .map(|s| LineSpan::new(s.start + range.start, s.end + range.start))
        .collect();

    Ok(DataBlock {
        index: range.index,
        envelope,
        lines,
        payload,
        warnings: warning.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn first_block(data: &[u8]) -> Result<DataBlock, RecordError> {
        let ranges = scan(data).unwrap();
        parse_block(data, &ranges[0])
    }

    #[test]
    fn ascii_envelope() {
        let data = b"    -1\n    15\n         1\n    -1\n";
        let block = first_block(data).unwrap();
        assert_eq!(block.envelope, Envelope::ascii(15));
        assert_eq!(block.lines.len(), 1);
        assert_eq!(&data[block.lines[0].start..block.lines[0].end], b"         1");
        assert!(block.payload.is_empty());
    }

    #[test]
    fn binary_envelope_fields() {
        let mut w = LineWriter::new();
        Envelope::binary(58, Endian::Big, 800).write(&mut w);
        let text = String::from_utf8(w.into_bytes()).unwrap();
        assert_eq!(text.len(), 80);
        let (env, warning) = Envelope::parse(Line::new(text.trim_end().as_bytes())).unwrap();
        assert!(warning.is_none());
        assert!(env.binary);
        assert_eq!(env.endian(), Some(Endian::Big));
        assert_eq!(env.float_format, FLOAT_FORMAT_IEEE);
        assert_eq!(env.ascii_lines, 11);
        assert_eq!(env.byte_count, 800);
    }

    #[test]
    fn short_header_recovers_with_warning() {
        let (env, warning) = Envelope::parse(Line::new(b"58")).unwrap();
        assert_eq!(env.type_code, 58);
        assert!(!env.binary);
        assert!(warning.is_some());
    }

    #[test]
    fn garbage_header_is_malformed() {
        let err = Envelope::parse(Line::new(b"   abc")).unwrap_err();
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn envelope_of_empty_block() {
        let data = b"    -1\n  2412\n    -1\n";
        let ranges = scan(data).unwrap();
        let (envelope, _) = read_envelope(data, &ranges[0]).unwrap();
        assert_eq!(envelope.type_code, 2412);
    }

    #[test]
    fn empty_block() {
        let data = b"    -1\n   151\n    -1\n";
        assert_eq!(first_block(data).unwrap_err(), RecordError::EmptyBlock);
        let data = b"    -1\n    -1\n";
        assert_eq!(first_block(data).unwrap_err(), RecordError::EmptyBlock);
    }

    #[test]
    fn crlf_lines_are_stripped() {
        let data = b"    -1\r\n   151\r\nmodel\r\n\r\ndesc\r\n    -1\r\n";
        let block = first_block(data).unwrap();
        let lines: Vec<&[u8]> = block.lines.iter().map(|s| &data[s.start..s.end]).collect();
        assert_eq!(lines, vec![&b"model"[..], &b"desc"[..]]);
    }

    #[test]
    fn binary_payload_follows_ascii_lines() {
        let mut data = b"    -1\n    58b     1     2           2           4     0     0           0           0\nA\nB\n".to_vec();
        let payload_at = data.len();
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.extend_from_slice(b"\n    -1\n");
        let block = first_block(&data).unwrap();
        assert_eq!(block.lines.len(), 2);
        assert_eq!(block.payload.start, payload_at);
        assert_eq!(&data[block.payload.clone()], &[1, 2, 3, 4, b'\n']);
    }
}
