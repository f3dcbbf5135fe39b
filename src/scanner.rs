//! Block scanner: split a UFF file into sentinel-delimited block ranges.
//!
//! # How it works
//!
//! Every dataset in a universal file is wrapped between two sentinel lines:
//! the value `-1` right-justified in a 6 column field (`    -1`), anchored at
//! the start of a line and followed by whitespace, a line break, or the end
//! of the file.  The scanner walks the buffer line by line, records every
//! sentinel, then pairs them up: occurrence `2k` opens block `k` and
//! occurrence `2k + 1` closes it.
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Ok(blocks)` | At least one balanced pair found |
//! | `NoBlocks` | Not a single sentinel line in the buffer |
//! | `Unbalanced` | Odd sentinel count; pairing is ambiguous, nothing is returned |
//!
//! A [`BlockRange`] starts at the opening sentinel line (the header parser
//! re-reads it) and ends at the first byte of the closing sentinel line, so
//! a binary payload keeps the line break that precedes the closing sentinel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sentinel field: `-1` right-justified in six columns.
pub const SENTINEL: &[u8; 6] = b"    -1";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("no valid blocks found")]
    NoBlocks,
    #[error("unbalanced tags: {sentinels} sentinel lines, expected an even count")]
    Unbalanced { sentinels: usize },
}

/// Byte range of one delimited block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    /// 0-based position of the block in the file.
    pub index: usize,
    /// Offset of the opening sentinel line.
    pub start: usize,
    /// Offset of the closing sentinel line.
    pub end:   usize,
}

impl BlockRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

fn is_sentinel_at(data: &[u8], pos: usize) -> bool {
    if !data[pos..].starts_with(SENTINEL) {
        return false;
    }
    match data.get(pos + SENTINEL.len()) {
        None    => true,
        Some(b) => b.is_ascii_whitespace(),
    }
}

/// Offsets of every sentinel line start in `data`.
pub fn find_sentinels(data: &[u8]) -> Vec<usize> {
    let mut found = Vec::new();
    let mut pos   = 0usize;

    while pos < data.len() {
        if is_sentinel_at(data, pos) {
            found.push(pos);
        }
        match data[pos..].iter().position(|&b| b == b'\n') {
            Some(nl) => pos += nl + 1,
            None     => break,
        }
    }
    found
}

/// Split `data` into block ranges.
///
/// Fails without partial output when there is no sentinel at all or when the
/// sentinel count is odd.
pub fn scan(data: &[u8]) -> Result<Vec<BlockRange>, ScanError> {
    let sentinels = find_sentinels(data);
    if sentinels.is_empty() {
        return Err(ScanError::NoBlocks);
    }
    if sentinels.len() % 2 != 0 {
        return Err(ScanError::Unbalanced { sentinels: sentinels.len() });
    }

    let blocks: Vec<BlockRange> = sentinels
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| BlockRange { index, start: pair[0], end: pair[1] })
        .collect();

    tracing::debug!(blocks = blocks.len(), bytes = data.len(), "scanned file");
    Ok(blocks)
}
