//! Fixed-column field codec shared by every dataset.
//!
//! # Reading
//! A UFF line is logically 80 columns wide.  [`Line`] views one physical
//! line as if it were right-padded with blanks, so column slices past the
//! physical end simply come back empty.  Columns are 1-based, matching the
//! FORTRAN `FORMAT` descriptors the datasets are documented with.
//!
//! Numbers are accepted in every exponent style seen in the wild: `E`, `e`,
//! FORTRAN double `D`/`d`, and plain decimals.  Flat numeric runs
//! ([`float_run`], [`int_run`]) ignore column positions entirely and split on
//! whitespace, plus on a sign that directly follows a digit or `.` (fused
//! columns such as `1.0E+00-2.0E+00`).
//!
//! # Writing
//! [`LineWriter`] builds lines field by field with one exponent convention:
//! `[-]d.ddddE+xx` (or `D+xx`), at least two exponent digits, right aligned.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical width of every UFF line.
pub const LINE_WIDTH: usize = 80;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("invalid integer {text:?} in columns {start}-{end}")]
    Integer { text: String, start: usize, end: usize },
    #[error("invalid number {text:?} in columns {start}-{end}")]
    Float { text: String, start: usize, end: usize },
    #[error("invalid numeric token {0:?}")]
    Token(String),
}

// ── Line spans ───────────────────────────────────────────────────────────────

/// Absolute byte range of one line, terminator excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end:   usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn view<'a>(&self, data: &'a [u8]) -> Line<'a> {
        Line::new(&data[self.start..self.end])
    }
}

// ── Line view ────────────────────────────────────────────────────────────────

/// One physical line seen as a blank-padded 80 column record.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    bytes: &'a [u8],
}

impl<'a> Line<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// A line with no content; every column reads as blank.
    pub fn blank() -> Line<'static> {
        Line { bytes: &[] }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Physical length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw bytes of columns `start..start + width` (1-based), clipped to the
    /// physical line.
    pub fn columns(&self, start: usize, width: usize) -> &'a [u8] {
        let from = start.saturating_sub(1).min(self.bytes.len());
        let to   = (start.saturating_sub(1) + width).min(self.bytes.len());
        &self.bytes[from..to]
    }

    /// Trimmed text of a column range.
    pub fn text(&self, start: usize, width: usize) -> String {
        String::from_utf8_lossy(self.columns(start, width)).trim().to_string()
    }

    /// Trimmed text of the whole logical line.
    pub fn full_text(&self) -> String {
        self.text(1, LINE_WIDTH)
    }

    /// Integer field.  A blank field reads as 0.
    pub fn int(&self, start: usize, width: usize) -> Result<i64, FieldError> {
        let text = self.text(start, width);
        if text.is_empty() {
            return Ok(0);
        }
        text.parse::<i64>().map_err(|_| FieldError::Integer {
            text,
            start,
            end: start + width - 1,
        })
    }

    /// Floating-point field in any exponent convention.  A blank field reads
    /// as 0.0.
    pub fn float(&self, start: usize, width: usize) -> Result<f64, FieldError> {
        let text = self.text(start, width);
        if text.is_empty() {
            return Ok(0.0);
        }
        parse_float(&text).ok_or(FieldError::Float {
            text,
            start,
            end: start + width - 1,
        })
    }
}

// ── Numeric tokens ───────────────────────────────────────────────────────────

/// Parse one number, normalizing a FORTRAN `D` exponent to `E` first.
pub fn parse_float(token: &str) -> Option<f64> {
    if token.bytes().any(|b| b == b'D' || b == b'd') {
        token.replace(['D', 'd'], "E").parse::<f64>().ok()
    } else {
        token.parse::<f64>().ok()
    }
}

/// Split a byte run into numeric tokens.
///
/// Tokens are separated by whitespace, and a `+`/`-` that directly follows a
/// digit or `.` starts a new token (fused fixed-width columns).
pub fn tokens(bytes: &[u8]) -> Vec<&[u8]> {
    let mut out   = Vec::new();
    let mut start = None::<usize>;

    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_whitespace() {
            if let Some(s) = start.take() {
                out.push(&bytes[s..i]);
            }
            continue;
        }
        match start {
            None => start = Some(i),
            Some(s) => {
                let prev = bytes[i - 1];
                if (b == b'-' || b == b'+') && (prev.is_ascii_digit() || prev == b'.') {
                    out.push(&bytes[s..i]);
                    start = Some(i);
                }
            }
        }
    }
    if let Some(s) = start {
        out.push(&bytes[s..]);
    }
    out
}

fn token_str(token: &[u8]) -> Result<&str, FieldError> {
    std::str::from_utf8(token)
        .map_err(|_| FieldError::Token(String::from_utf8_lossy(token).into_owned()))
}

/// Every number of `lines`, in order, as floats.
pub fn float_run<'a, I>(lines: I) -> Result<Vec<f64>, FieldError>
where
    I: IntoIterator<Item = Line<'a>>,
{
    let mut out = Vec::new();
    for line in lines {
        for token in tokens(line.bytes()) {
            let text = token_str(token)?;
            out.push(parse_float(text).ok_or_else(|| FieldError::Token(text.to_string()))?);
        }
    }
    Ok(out)
}

/// Every number of `lines`, in order, as integers.
pub fn int_run<'a, I>(lines: I) -> Result<Vec<i64>, FieldError>
where
    I: IntoIterator<Item = Line<'a>>,
{
    let mut out = Vec::new();
    for line in lines {
        for token in tokens(line.bytes()) {
            let text = token_str(token)?;
            out.push(text.parse::<i64>().map_err(|_| FieldError::Token(text.to_string()))?);
        }
    }
    Ok(out)
}

// ── Formatting ───────────────────────────────────────────────────────────────

/// Format `value` as `[-]d.<digits>` mantissa plus `<marker>±xx` exponent.
pub fn format_exp(value: f64, digits: usize, marker: char) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{:.*e}", digits, value);
    let Some(pos) = raw.find('e') else {
        return raw;
    };
    let exponent: i32 = raw[pos + 1..].parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{marker}{sign}{:02}", &raw[..pos], exponent.abs())
}

/// Cut `text` to at most `width` bytes on a char boundary.
fn fit(text: &str, width: usize) -> &str {
    if text.len() <= width {
        return text;
    }
    let mut end = width;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Line-oriented output buffer producing fixed-column records.
#[derive(Debug, Default)]
pub struct LineWriter {
    buf: Vec<u8>,
}

impl LineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Right-aligned integer field (`I<width>`).
    pub fn int(&mut self, width: usize, value: i64) -> &mut Self {
        self.push_str(&format!("{value:>width$}"));
        self
    }

    /// Right-aligned exponential field (`E<width>.<digits>`).
    pub fn exp(&mut self, width: usize, digits: usize, value: f64) -> &mut Self {
        let text = format_exp(value, digits, 'E');
        self.push_str(&format!("{text:>width$}"));
        self
    }

    /// Right-aligned FORTRAN double field (`D<width>.<digits>`).
    pub fn dexp(&mut self, width: usize, digits: usize, value: f64) -> &mut Self {
        let text = format_exp(value, digits, 'D');
        self.push_str(&format!("{text:>width$}"));
        self
    }

    /// Left-aligned text field (`A<width>`), padded and truncated.
    pub fn text(&mut self, width: usize, value: &str) -> &mut Self {
        let value = fit(value, width);
        self.push_str(&format!("{value:<width$}"));
        self
    }

    pub fn blank(&mut self, width: usize) -> &mut Self {
        self.buf.extend(std::iter::repeat(b' ').take(width));
        self
    }

    /// Terminate the current line.
    pub fn end(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// A complete 80 column text line.
    pub fn line(&mut self, value: &str) -> &mut Self {
        self.text(LINE_WIDTH, value).end()
    }

    /// Raw payload bytes, written verbatim.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Start a stream of fields that wraps after `per_line` fields.
    pub fn wrapped(&mut self, per_line: usize) -> Wrapped<'_> {
        Wrapped { out: self, per_line: per_line.max(1), count: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }
}

/// Field stream that breaks the line every `per_line` fields.
pub struct Wrapped<'w> {
    out:      &'w mut LineWriter,
    per_line: usize,
    count:    usize,
}

impl Wrapped<'_> {
    fn advance(&mut self) {
        self.count += 1;
        if self.count == self.per_line {
            self.out.end();
            self.count = 0;
        }
    }

    pub fn int(&mut self, width: usize, value: i64) -> &mut Self {
        self.out.int(width, value);
        self.advance();
        self
    }

    pub fn exp(&mut self, width: usize, digits: usize, value: f64) -> &mut Self {
        self.out.exp(width, digits, value);
        self.advance();
        self
    }

    /// Close a partially filled last line.
    pub fn finish(self) {
        if self.count > 0 {
            self.out.end();
        }
    }
}
