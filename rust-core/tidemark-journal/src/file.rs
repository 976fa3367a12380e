// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Segment naming
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every journal segment is a single file named `0x{start}-0x{end}` where
// `start` is the first sequence number it holds and `end` is one past the
// last. The segment being written has no known end yet and carries the
// reserved `UNKNOWN_SEQUENCE_NUMBER` sentinel; a rename to its real end is the
// only marker that a segment is complete.
//
// Log segments live under `<root>/logs/`, checkpoints under
// `<root>/checkpoints/`. Both directions of the encoding are pure.

use std::cmp::Ordering;

use tidemark_ufs::{file_name, join_path};

use crate::journal::UfsJournal;

/// End sentinel of a segment that is still being written (`2^63 - 1`).
pub const UNKNOWN_SEQUENCE_NUMBER: u64 = i64::MAX as u64;

/// Directory under the journal root holding log segments.
pub const LOG_DIRNAME: &str = "logs";

/// Directory under the journal root holding checkpoints.
pub const CHECKPOINT_DIRNAME: &str = "checkpoints";

/// Prefix of both sequence numbers in a segment name.
const HEX_PREFIX: &str = "0x";

/// Whether a segment holds journal entries or a checkpoint image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// An append-only run of journal entries.
    Log,
    /// A checkpoint of the state machine covering `[start, end)`.
    Checkpoint,
}

/// A segment of the journal, as named on the medium.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentFile {
    /// First sequence number in the segment (inclusive).
    pub start: u64,

    /// One past the last sequence number, or [`UNKNOWN_SEQUENCE_NUMBER`] for
    /// the segment still being written.
    pub end: u64,

    /// Full path of the segment on the medium.
    pub location: String,

    /// Log or checkpoint.
    pub kind: SegmentKind,
}

impl SegmentFile {
    /// Describe a log segment of `journal`.
    pub fn log(journal: &UfsJournal, start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            location: encode_log_location(journal, start, end),
            kind: SegmentKind::Log,
        }
    }

    /// Describe a checkpoint of `journal`.
    pub fn checkpoint(journal: &UfsJournal, start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            location: encode_checkpoint_location(journal, start, end),
            kind: SegmentKind::Checkpoint,
        }
    }

    /// Returns `true` for the segment still being written.
    pub fn is_incomplete(&self) -> bool {
        self.end == UNKNOWN_SEQUENCE_NUMBER
    }

    /// Returns `true` if `sequence_number` falls inside `[start, end)`.
    pub fn contains(&self, sequence_number: u64) -> bool {
        self.start <= sequence_number && sequence_number < self.end
    }

    /// The file name of this segment.
    pub fn name(&self) -> &str {
        file_name(&self.location)
    }

    /// Decode a segment from its location, or `None` if the final path
    /// component is not a segment name.
    pub fn from_location(location: &str, kind: SegmentKind) -> Option<Self> {
        let (start, end) = decode_file_name(file_name(location))?;
        Some(Self {
            start,
            end,
            location: location.to_string(),
            kind,
        })
    }
}

impl PartialOrd for SegmentFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SegmentFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.end.cmp(&other.end))
            .then_with(|| self.location.cmp(&other.location))
    }
}

/// Build the name of a segment covering `[start, end)`.
///
/// Format: `0x0000000000000005-0x000000000000000a`. Both numbers are
/// zero-padded to 16 lowercase hex digits so names sort like their starts.
pub fn encode_file_name(start: u64, end: u64) -> String {
    format!("{HEX_PREFIX}{start:016x}-{HEX_PREFIX}{end:016x}")
}

/// Parse `(start, end)` from a segment name.
///
/// Accepts padded or unpadded hex. Returns `None` for any other shape, for
/// `start > end`, and for an end beyond [`UNKNOWN_SEQUENCE_NUMBER`].
pub fn decode_file_name(name: &str) -> Option<(u64, u64)> {
    let (start, end) = name.split_once('-')?;
    let start = parse_hex(start)?;
    let end = parse_hex(end)?;
    if start > end || end > UNKNOWN_SEQUENCE_NUMBER {
        return None;
    }
    Some((start, end))
}

fn parse_hex(field: &str) -> Option<u64> {
    let digits = field.strip_prefix(HEX_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Location of the log segment `[start, end)` of `journal`.
pub fn encode_log_location(journal: &UfsJournal, start: u64, end: u64) -> String {
    join_path(&journal.log_dir(), &encode_file_name(start, end))
}

/// Location of the checkpoint `[start, end)` of `journal`.
pub fn encode_checkpoint_location(journal: &UfsJournal, start: u64, end: u64) -> String {
    join_path(&journal.checkpoint_dir(), &encode_file_name(start, end))
}
