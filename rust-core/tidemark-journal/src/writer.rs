// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Log writer
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `UfsJournalLogWriter` stamps entries with gap-free sequence numbers,
// appends them to the current log segment and rotates segments once they
// grow past the configured size (or after every flush on media that only
// persist data when a stream closes).
//
// Every entry written since the last successful flush is retained. When the
// medium fails a write or flush, the writer marks itself for reset and, before
// its next operation, reconciles with the medium: it finds the last durable
// entry, seals the broken segment there and replays the retained entries
// after it into a fresh segment. If entries between the durable frontier and
// the oldest retained entry are gone, the reset fails with the fatal
// `JournalEntryMissing` error and nothing on the medium is changed. The same
// holds, with `JournalAhead`, when the medium already holds entries at or past
// the writer's next sequence number.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::entry::JournalEntry;
use crate::error::{JournalError, JournalResult};
use crate::file::SegmentFile;
use crate::gc::JournalGarbageCollector;
use crate::journal::UfsJournal;
use crate::output::OutputHandle;
use crate::recovery;
use crate::snapshot::JournalSnapshot;

// ---------------------------------------------------------------------------
// WriterState
// ---------------------------------------------------------------------------

/// Mutable state of a log writer, guarded by a single mutex.
#[derive(Debug)]
struct WriterState {
    /// Sequence number the next written entry receives.
    next_sequence_number: u64,
    /// The segment currently being written.
    output: Option<OutputHandle>,
    /// Entries written since the last successful flush, in order.
    unflushed: VecDeque<JournalEntry>,
    /// Commit the current segment and open a new one before the next write.
    rotate_for_next_write: bool,
    /// A write or flush failed; reconcile before the next operation.
    needs_reset: bool,
    closed: bool,
    gc: Option<JournalGarbageCollector>,
}

impl WriterState {
    fn write(&mut self, journal: &UfsJournal, entry: JournalEntry) -> JournalResult<u64> {
        if self.closed {
            return Err(JournalError::WriteAfterClose);
        }
        if self.needs_reset {
            self.reset(journal)?;
        }
        let sequence = self.next_sequence_number;
        let entry = entry.with_sequence_number(sequence);
        let output = match self.output.as_mut() {
            Some(output) if !self.rotate_for_next_write => output,
            _ => self.rotate(journal)?,
        };
        if let Err(error) = output.write(&entry) {
            self.needs_reset = true;
            return Err(error);
        }
        debug!(sequence, segment = %output.location(), "Appended journal entry");
        self.unflushed.push_back(entry);
        self.next_sequence_number += 1;
        Ok(sequence)
    }

    fn flush(&mut self, journal: &UfsJournal) -> JournalResult<()> {
        if self.closed {
            return Err(JournalError::FlushAfterClose);
        }
        if self.needs_reset {
            self.reset(journal)?;
        }
        let Some(output) = self.output.as_mut() else {
            return Ok(());
        };
        if !output.has_stream() || output.bytes_written() == 0 {
            return Ok(());
        }
        if let Err(error) = output.flush() {
            self.needs_reset = true;
            return Err(error);
        }
        debug!(
            segment = %output.location(),
            entries = self.unflushed.len(),
            "Flushed journal entries"
        );
        self.unflushed.clear();

        let oversize = output.bytes_written() >= journal.conf().max_log_size_bytes;
        if oversize || !journal.ufs().supports_flush() {
            debug!(
                segment = %output.location(),
                bytes_written = output.bytes_written(),
                oversize,
                "Rotating log file before next write"
            );
            self.rotate_for_next_write = true;
        }
        Ok(())
    }

    /// Commit the current segment and open a new one at the next sequence
    /// number. Safe to retry after a failure.
    fn rotate(&mut self, journal: &UfsJournal) -> JournalResult<&mut OutputHandle> {
        if let Some(output) = self.output.as_mut() {
            match output.commit(journal, self.next_sequence_number) {
                Ok(_) => {}
                // The stream's bytes are unverified; reconcile instead of
                // trusting the commit.
                Err(error @ JournalError::WriteFailure { .. }) => {
                    self.needs_reset = true;
                    return Err(error);
                }
                Err(error) => return Err(error),
            }
        }
        self.output = None;
        let output = OutputHandle::create(journal, self.next_sequence_number)?;
        self.rotate_for_next_write = false;
        info!(start = self.next_sequence_number, "Rotated journal log");
        Ok(self.output.insert(output))
    }

    /// Reconcile with the medium after a write or flush failure.
    fn reset(&mut self, journal: &UfsJournal) -> JournalResult<()> {
        info!(
            journal = %journal.location(),
            next_sequence_number = self.next_sequence_number,
            unflushed = self.unflushed.len(),
            "Resetting journal stream after failure"
        );
        if let Some(output) = self.output.as_mut() {
            output.abandon();
        }

        let frontier = recovery::probe(journal)?;
        let expected = frontier.next_sequence_number();
        if let Some(first) = self.unflushed.front() {
            if first.sequence_number > expected {
                return Err(JournalError::JournalEntryMissing {
                    expected,
                    found: first.sequence_number,
                });
            }
        }
        if expected > self.next_sequence_number {
            return Err(JournalError::JournalAhead {
                expected,
                next: self.next_sequence_number,
            });
        }

        recovery::seal(journal, &frontier)?;
        self.output = None;

        while self
            .unflushed
            .front()
            .is_some_and(|entry| entry.sequence_number < expected)
        {
            self.unflushed.pop_front();
        }

        let start = self
            .unflushed
            .front()
            .map_or(self.next_sequence_number, |entry| entry.sequence_number);
        let output = self.output.insert(OutputHandle::create(journal, start)?);
        for entry in &self.unflushed {
            output.write(entry)?;
        }

        if let Some(last) = self.unflushed.back() {
            info!(
                from = expected,
                to = last.sequence_number,
                "Re-wrote unflushed journal entries"
            );
        }
        self.needs_reset = false;
        self.rotate_for_next_write = false;
        Ok(())
    }

    fn close(&mut self, journal: &UfsJournal) -> JournalResult<()> {
        if self.closed {
            return Ok(());
        }
        let mut errors = Vec::new();

        if self.needs_reset {
            if let Err(error) = self.reset(journal) {
                errors.push(error);
            }
        }
        if let Some(output) = self.output.as_mut() {
            if errors.is_empty() {
                if let Err(error) = output.commit(journal, self.next_sequence_number) {
                    errors.push(error);
                }
            } else {
                output.abandon();
            }
        }
        self.output = None;

        if let Some(mut gc) = self.gc.take() {
            if let Err(error) = gc.stop() {
                errors.push(error);
            }
        }
        self.closed = true;

        info!(
            journal = %journal.location(),
            next_sequence_number = self.next_sequence_number,
            failures = errors.len(),
            "Closed journal log writer"
        );
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(JournalError::Shutdown(errors)),
        }
    }
}

// ---------------------------------------------------------------------------
// UfsJournalLogWriter
// ---------------------------------------------------------------------------

/// Writer of journal entries to log segments on an under file system.
///
/// One writer per journal. All methods take `&self` and serialize on an
/// internal mutex, so the writer can be shared between threads.
#[derive(Debug)]
pub struct UfsJournalLogWriter {
    journal: UfsJournal,
    state: Mutex<WriterState>,
}

impl UfsJournalLogWriter {
    /// Create a writer whose first entry gets `next_sequence_number`.
    ///
    /// An incomplete log left by a previous writer is adopted and committed
    /// on the first write. Starts the garbage collector when enabled.
    pub fn new(journal: UfsJournal, next_sequence_number: u64) -> JournalResult<Self> {
        journal.conf().validate()?;
        let snapshot = JournalSnapshot::take(&journal)?;
        let output = snapshot.current_log.map(OutputHandle::adopt);
        let gc = if journal.conf().gc_enabled {
            Some(JournalGarbageCollector::start(journal.clone())?)
        } else {
            None
        };

        info!(
            journal = %journal.location(),
            ufs = journal.ufs().name(),
            next_sequence_number,
            adopted = output.as_ref().map(|o| o.location().to_string()),
            "Opened journal log writer"
        );
        Ok(Self {
            journal,
            state: Mutex::new(WriterState {
                next_sequence_number,
                output,
                unflushed: VecDeque::new(),
                rotate_for_next_write: true,
                needs_reset: false,
                closed: false,
                gc,
            }),
        })
    }

    /// Append `entry` and return the sequence number it was stamped with.
    ///
    /// The entry is not durable until a later [`flush`](Self::flush)
    /// succeeds.
    pub fn write(&self, entry: JournalEntry) -> JournalResult<u64> {
        self.lock()?.write(&self.journal, entry)
    }

    /// Push every written entry to the medium.
    pub fn flush(&self) -> JournalResult<()> {
        self.lock()?.flush(&self.journal)
    }

    /// Commit the current segment and stop the garbage collector.
    ///
    /// Idempotent. Every release step is attempted even if an earlier one
    /// fails; several failures are reported together as
    /// [`JournalError::Shutdown`].
    pub fn close(&self) -> JournalResult<()> {
        self.lock()?.close(&self.journal)
    }

    /// The journal this writer appends to.
    pub fn journal(&self) -> &UfsJournal {
        &self.journal
    }

    /// Sequence number the next written entry receives.
    pub fn next_sequence_number(&self) -> u64 {
        self.read_state(|state| state.next_sequence_number)
    }

    /// Number of entries retained since the last successful flush.
    pub fn unflushed_len(&self) -> usize {
        self.read_state(|state| state.unflushed.len())
    }

    /// The segment currently being written.
    pub fn current_segment(&self) -> Option<SegmentFile> {
        self.read_state(|state| state.output.as_ref().map(|o| o.segment().clone()))
    }

    /// Whether the writer will reconcile with the medium before its next
    /// operation.
    pub fn needs_reset(&self) -> bool {
        self.read_state(|state| state.needs_reset)
    }

    /// Whether the writer has been closed.
    pub fn is_closed(&self) -> bool {
        self.read_state(|state| state.closed)
    }

    fn lock(&self) -> JournalResult<MutexGuard<'_, WriterState>> {
        self.state.lock().map_err(|_| JournalError::Poisoned)
    }

    fn read_state<T>(&self, read: impl FnOnce(&WriterState) -> T) -> T {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        read(&state)
    }
}
