// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Readers
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `SegmentReader` decodes entries from one segment in order. It is what the
// log writer uses to find the durable frontier of an incomplete log after a
// failure: a truncated or corrupt trailing frame (expected after a crash
// mid-write) surfaces as a decode error, distinguishable from an I/O error.
//
// `JournalReader` walks every log segment from a starting sequence number,
// for replaying the journal into a state machine.

use std::io::Read;

use tidemark_ufs::UnderFileSystem;
use tracing::debug;

use crate::entry::{decode_frame, FrameError, JournalEntry};
use crate::error::{JournalError, JournalResult};
use crate::file::SegmentFile;
use crate::journal::UfsJournal;
use crate::snapshot::JournalSnapshot;

// ---------------------------------------------------------------------------
// SegmentReader
// ---------------------------------------------------------------------------

/// Sequential reader over the entries of a single segment.
#[derive(Debug)]
pub struct SegmentReader {
    /// The segment being read.
    segment: SegmentFile,
    /// The segment's published contents.
    data: Vec<u8>,
    /// Byte offset of the next frame.
    offset: usize,
    /// Sequence number of the last entry returned.
    last_sequence_number: Option<u64>,
}

impl SegmentReader {
    /// Load `segment` from the medium.
    pub fn open(ufs: &dyn UnderFileSystem, segment: &SegmentFile) -> JournalResult<Self> {
        let mut stream = ufs
            .open(&segment.location)
            .map_err(|source| JournalError::ufs(&segment.location, source))?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        debug!(
            segment = %segment.location,
            len = data.len(),
            "Opened journal segment for reading"
        );
        Ok(Self {
            segment: segment.clone(),
            data,
            offset: 0,
            last_sequence_number: None,
        })
    }

    /// Decode the next entry.
    ///
    /// Returns `Ok(None)` at a clean end of the segment and
    /// [`JournalError::InvalidEntry`] for a truncated or corrupt frame. The
    /// reader does not advance past an invalid frame.
    pub fn read(&mut self) -> JournalResult<Option<JournalEntry>> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        match decode_frame(&self.data[self.offset..]) {
            Ok((entry, used)) => {
                self.offset += used;
                self.last_sequence_number = Some(entry.sequence_number);
                Ok(Some(entry))
            }
            Err(error) => Err(self.invalid(&error)),
        }
    }

    /// The segment being read.
    pub fn segment(&self) -> &SegmentFile {
        &self.segment
    }

    /// Byte offset just past the last entry returned.
    pub fn position(&self) -> u64 {
        self.offset as u64
    }

    /// Sequence number of the last entry returned, if any.
    pub fn last_sequence_number(&self) -> Option<u64> {
        self.last_sequence_number
    }

    fn invalid(&self, error: &FrameError) -> JournalError {
        JournalError::InvalidEntry {
            segment: self.segment.location.clone(),
            offset: self.offset as u64,
            reason: error.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// JournalReader
// ---------------------------------------------------------------------------

/// Reader over the whole journal, starting at a given sequence number.
///
/// Entries before the starting sequence number are skipped. The reader
/// checks that sequence numbers are contiguous across segments. An invalid
/// frame in a complete log is an error; in the incomplete log it marks the
/// end of durable data and ends the read quietly.
#[derive(Debug)]
pub struct JournalReader {
    journal: UfsJournal,
    /// Segments still to be opened, in order.
    pending: std::collections::VecDeque<SegmentFile>,
    current: Option<SegmentReader>,
    next_sequence_number: u64,
}

impl JournalReader {
    /// Open a reader at `start_sequence_number`.
    ///
    /// Fails with [`JournalError::JournalEntryMissing`] when the oldest
    /// retained log starts after `start_sequence_number`.
    pub fn open(
        journal: &UfsJournal,
        start_sequence_number: u64,
        include_incomplete: bool,
    ) -> JournalResult<Self> {
        let snapshot = JournalSnapshot::take(journal)?;
        let mut segments: Vec<SegmentFile> = snapshot.logs;
        if include_incomplete {
            segments.extend(snapshot.current_log);
        }
        let pending: std::collections::VecDeque<_> = segments
            .into_iter()
            .filter(|segment| segment.end > start_sequence_number)
            .collect();

        if let Some(first) = pending.front() {
            if first.start > start_sequence_number {
                return Err(JournalError::JournalEntryMissing {
                    expected: start_sequence_number,
                    found: first.start,
                });
            }
        }

        debug!(
            journal = %journal.location(),
            start_sequence_number,
            segments = pending.len(),
            "Opened journal reader"
        );
        Ok(Self {
            journal: journal.clone(),
            pending,
            current: None,
            next_sequence_number: start_sequence_number,
        })
    }

    /// Read the next entry, or `None` once every segment is exhausted.
    pub fn read(&mut self) -> JournalResult<Option<JournalEntry>> {
        loop {
            if self.current.is_none() {
                let Some(segment) = self.pending.pop_front() else {
                    return Ok(None);
                };
                if segment.start > self.next_sequence_number {
                    return Err(JournalError::JournalEntryMissing {
                        expected: self.next_sequence_number,
                        found: segment.start,
                    });
                }
                self.current = Some(SegmentReader::open(self.journal.ufs().as_ref(), &segment)?);
            }
            let Some(reader) = self.current.as_mut() else {
                return Ok(None);
            };
            // A complete log's name says where it ends; bytes past that are
            // the torn tail of a sealed segment.
            if reader.segment().end <= self.next_sequence_number {
                self.current = None;
                continue;
            }

            let entry = match reader.read() {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    self.current = None;
                    continue;
                }
                Err(error) if error.is_decode_error() && reader.segment().is_incomplete() => {
                    debug!(
                        segment = %reader.segment().location,
                        offset = reader.position(),
                        "Truncated tail of incomplete log (expected after crash)"
                    );
                    self.current = None;
                    self.pending.clear();
                    return Ok(None);
                }
                Err(error) => return Err(error),
            };

            if entry.sequence_number < self.next_sequence_number {
                continue;
            }
            if entry.sequence_number > self.next_sequence_number {
                return Err(JournalError::JournalEntryMissing {
                    expected: self.next_sequence_number,
                    found: entry.sequence_number,
                });
            }
            self.next_sequence_number += 1;
            return Ok(Some(entry));
        }
    }

    /// Read every remaining entry.
    pub fn read_all(&mut self) -> JournalResult<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.read()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Sequence number of the next entry the reader expects.
    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{encode_log_location, UNKNOWN_SEQUENCE_NUMBER};
    use tidemark_ufs::MemoryUfs;

    fn setup() -> (MemoryUfs, UfsJournal) {
        let ufs = MemoryUfs::new();
        let journal = UfsJournal::new(ufs.clone(), "/j");
        (ufs, journal)
    }

    fn frames(range: std::ops::Range<u64>) -> Vec<u8> {
        range
            .flat_map(|seq| {
                JournalEntry::new(format!("op-{seq}"))
                    .with_sequence_number(seq)
                    .encode()
            })
            .collect()
    }

    fn put_log(ufs: &MemoryUfs, journal: &UfsJournal, start: u64, end: u64, data: &[u8]) {
        ufs.put_file(&encode_log_location(journal, start, end), data);
    }

    #[test]
    fn test_segment_reader_reads_in_order() {
        let (ufs, journal) = setup();
        put_log(&ufs, &journal, 0, 3, &frames(0..3));
        let segment = SegmentFile::log(&journal, 0, 3);

        let mut reader = SegmentReader::open(&ufs, &segment).unwrap();
        for seq in 0..3 {
            let entry = reader.read().unwrap().unwrap();
            assert_eq!(entry.sequence_number, seq);
            assert_eq!(entry.payload, format!("op-{seq}").into_bytes());
        }
        assert!(reader.read().unwrap().is_none());
        assert_eq!(reader.last_sequence_number(), Some(2));
        assert_eq!(reader.position(), frames(0..3).len() as u64);
    }

    #[test]
    fn test_segment_reader_truncated_tail_is_decode_error() {
        let (ufs, journal) = setup();
        let mut data = frames(0..2);
        let partial = frames(2..3);
        data.extend_from_slice(&partial[..partial.len() / 2]);
        put_log(&ufs, &journal, 0, UNKNOWN_SEQUENCE_NUMBER, &data);

        let segment = SegmentFile::log(&journal, 0, UNKNOWN_SEQUENCE_NUMBER);
        let mut reader = SegmentReader::open(&ufs, &segment).unwrap();
        reader.read().unwrap().unwrap();
        reader.read().unwrap().unwrap();
        let err = reader.read().unwrap_err();
        assert!(err.is_decode_error());
        assert_eq!(reader.last_sequence_number(), Some(1));
    }

    #[test]
    fn test_segment_reader_missing_segment_is_io_error() {
        let (ufs, journal) = setup();
        let segment = SegmentFile::log(&journal, 0, 3);
        let err = SegmentReader::open(&ufs, &segment).unwrap_err();
        assert!(!err.is_decode_error());
        assert!(matches!(err, JournalError::Ufs { .. }));
    }

    #[test]
    fn test_journal_reader_spans_segments() {
        let (ufs, journal) = setup();
        put_log(&ufs, &journal, 0, 3, &frames(0..3));
        put_log(&ufs, &journal, 3, 5, &frames(3..5));
        put_log(&ufs, &journal, 5, UNKNOWN_SEQUENCE_NUMBER, &frames(5..7));

        let mut reader = JournalReader::open(&journal, 2, true).unwrap();
        let seqs: Vec<_> = reader
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.sequence_number)
            .collect();
        assert_eq!(seqs, vec![2, 3, 4, 5, 6]);
        assert_eq!(reader.next_sequence_number(), 7);

        let mut complete_only = JournalReader::open(&journal, 0, false).unwrap();
        assert_eq!(complete_only.read_all().unwrap().len(), 5);
    }

    #[test]
    fn test_journal_reader_stops_at_torn_incomplete_tail() {
        let (ufs, journal) = setup();
        put_log(&ufs, &journal, 0, 2, &frames(0..2));
        let mut data = frames(2..4);
        data.extend_from_slice(&[0xde, 0xad]);
        put_log(&ufs, &journal, 2, UNKNOWN_SEQUENCE_NUMBER, &data);

        let mut reader = JournalReader::open(&journal, 0, true).unwrap();
        assert_eq!(reader.read_all().unwrap().len(), 4);
    }

    #[test]
    fn test_journal_reader_ignores_bytes_past_segment_end() {
        let (ufs, journal) = setup();
        let mut data = frames(0..3);
        data.extend_from_slice(&frames(3..4)[..6]);
        put_log(&ufs, &journal, 0, 3, &data);
        put_log(&ufs, &journal, 3, 4, &frames(3..4));

        let mut reader = JournalReader::open(&journal, 0, false).unwrap();
        assert_eq!(reader.read_all().unwrap().len(), 4);
    }

    #[test]
    fn test_journal_reader_rejects_corrupt_complete_log() {
        let (ufs, journal) = setup();
        let mut data = frames(0..2);
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        put_log(&ufs, &journal, 0, 2, &data);

        let mut reader = JournalReader::open(&journal, 0, true).unwrap();
        reader.read().unwrap().unwrap();
        assert!(reader.read().unwrap_err().is_decode_error());
    }

    #[test]
    fn test_journal_reader_detects_gaps() {
        let (ufs, journal) = setup();
        put_log(&ufs, &journal, 3, 5, &frames(3..5));
        let err = JournalReader::open(&journal, 0, true).unwrap_err();
        assert!(matches!(
            err,
            JournalError::JournalEntryMissing {
                expected: 0,
                found: 3
            }
        ));

        let (ufs, journal) = setup();
        put_log(&ufs, &journal, 0, 2, &frames(0..2));
        put_log(&ufs, &journal, 4, 6, &frames(4..6));
        let mut reader = JournalReader::open(&journal, 0, true).unwrap();
        assert_eq!(reader.read().unwrap().unwrap().sequence_number, 0);
        assert_eq!(reader.read().unwrap().unwrap().sequence_number, 1);
        assert!(matches!(
            reader.read().unwrap_err(),
            JournalError::JournalEntryMissing {
                expected: 2,
                found: 4
            }
        ));
    }
}
