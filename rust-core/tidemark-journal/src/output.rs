// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Output handle
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `OutputHandle` owns the log segment currently being written: its
// incomplete location, the medium stream (absent for a segment adopted from a
// previous writer) and a running byte counter.
//
// Committing a segment closes the stream and renames `start-UNKNOWN` to
// `start-next`. The commit is idempotent so a failed commit can be retried:
// every step checks the namespace before acting and a repeated commit after a
// successful rename is a no-op.

use std::io::Write;

use tidemark_ufs::{UfsOutputStream, UnderFileSystem};
use tracing::{debug, info, warn};

use crate::entry::JournalEntry;
use crate::error::{JournalError, JournalResult};
use crate::file::{SegmentFile, UNKNOWN_SEQUENCE_NUMBER};
use crate::journal::UfsJournal;

/// The log segment currently open for writing.
#[derive(Debug)]
pub struct OutputHandle {
    /// The incomplete segment (`end == UNKNOWN_SEQUENCE_NUMBER`).
    segment: SegmentFile,
    /// `None` for an adopted segment, or once the stream was released.
    stream: Option<Box<dyn UfsOutputStream>>,
    /// Bytes successfully handed to the stream.
    bytes_written: u64,
}

impl OutputHandle {
    /// Create a new incomplete log segment starting at `start`.
    pub fn create(journal: &UfsJournal, start: u64) -> JournalResult<Self> {
        let segment = SegmentFile::log(journal, start, UNKNOWN_SEQUENCE_NUMBER);
        let stream = journal
            .ufs()
            .create(&segment.location)
            .map_err(|source| JournalError::ufs(&segment.location, source))?;
        info!(segment = %segment.location, start, "Created current log file");
        Ok(Self {
            segment,
            stream: Some(stream),
            bytes_written: 0,
        })
    }

    /// Take ownership of an incomplete segment left by a previous writer
    /// without opening a stream to it.
    pub fn adopt(segment: SegmentFile) -> Self {
        debug!(segment = %segment.location, "Adopted incomplete log file");
        Self {
            segment,
            stream: None,
            bytes_written: 0,
        }
    }

    /// The segment being written.
    pub fn segment(&self) -> &SegmentFile {
        &self.segment
    }

    /// First sequence number of the segment.
    pub fn start(&self) -> u64 {
        self.segment.start
    }

    /// Location of the segment on the medium.
    pub fn location(&self) -> &str {
        &self.segment.location
    }

    /// Bytes written through this handle so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Whether a live stream is attached.
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Frame and append `entry`.
    pub fn write(&mut self, entry: &JournalEntry) -> JournalResult<()> {
        let location = &self.segment.location;
        let stream = self.stream.as_mut().ok_or_else(|| JournalError::WriteFailure {
            segment: location.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "no open stream"),
        })?;
        let bytes = entry.encode();
        stream
            .write_all(&bytes)
            .map_err(|source| JournalError::WriteFailure {
                segment: location.clone(),
                source,
            })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Flush the stream. A handle without a stream has nothing to flush.
    pub fn flush(&mut self) -> JournalResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        stream.flush().map_err(|source| JournalError::FlushFailure {
            segment: self.segment.location.clone(),
            source,
        })
    }

    /// Release a broken stream without committing the segment. A failure to
    /// close is logged, not raised.
    pub fn abandon(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(error) = stream.close() {
                warn!(
                    segment = %self.segment.location,
                    error = %error,
                    "Failed to close broken journal stream"
                );
            }
        }
    }

    /// Close the stream and mark the segment complete with entries in
    /// `[start, next_sequence_number)`.
    ///
    /// Returns the completed segment, or `None` when the segment held no
    /// entries and was removed (or never existed).
    pub fn commit(
        &mut self,
        journal: &UfsJournal,
        next_sequence_number: u64,
    ) -> JournalResult<Option<SegmentFile>> {
        let start = self.segment.start;
        let src = self.segment.location.clone();

        if let Some(mut stream) = self.stream.take() {
            stream
                .close()
                .map_err(|source| JournalError::WriteFailure {
                    segment: src.clone(),
                    source,
                })?;
        }

        if next_sequence_number < start {
            return Err(JournalError::SequenceRegression {
                segment: src,
                start,
                next: next_sequence_number,
            });
        }

        let ufs = journal.ufs().as_ref();
        info!(
            segment = %src,
            start,
            end = next_sequence_number,
            "Marking log file as complete"
        );

        if next_sequence_number == start {
            if !exists(ufs, &src)? {
                warn!(segment = %src, "No current log to mark as complete");
                return Ok(None);
            }
            info!(segment = %src, "Deleting empty log file");
            ufs.delete_file(&src)
                .map_err(|source| JournalError::ufs(&src, source))?;
            return Ok(None);
        }

        let completed = SegmentFile::log(journal, start, next_sequence_number);
        let dst = completed.location.clone();
        let src_exists = exists(ufs, &src)?;
        let dst_exists = exists(ufs, &dst)?;

        if !src_exists && dst_exists {
            debug!(segment = %dst, "Log file already marked as complete");
            return Ok(Some(completed));
        }
        if !src_exists {
            warn!(segment = %src, "No current log to mark as complete");
            return Ok(None);
        }
        if dst_exists {
            warn!(segment = %dst, "Deleting duplicate completed log");
            ufs.delete_file(&dst)
                .map_err(|source| JournalError::ufs(&dst, source))?;
        }
        ufs.rename_file(&src, &dst)
            .map_err(|source| JournalError::ufs(&src, source))?;
        info!(segment = %dst, "Completed log file");
        Ok(Some(completed))
    }
}

pub(crate) fn exists(ufs: &dyn UnderFileSystem, path: &str) -> JournalResult<bool> {
    ufs.exists(path).map_err(|source| JournalError::ufs(path, source))
}
