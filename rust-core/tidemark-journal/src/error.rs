// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Defines all error conditions that can arise while writing, committing and
// reconciling journal segments. Errors are split by severity: medium failures
// during write/flush are recoverable (the writer reconciles before its next
// operation), while a durability gap or a corrupt segment namespace is fatal
// and must be escalated by the owner of the writer.

use thiserror::Error;
use tidemark_ufs::UfsError;

/// Errors that can occur during journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// `write` was called after the writer was closed.
    #[error("Journal write called after journal log writer was closed")]
    WriteAfterClose,

    /// `flush` was called after the writer was closed.
    #[error("Cannot flush after closing journal log writer")]
    FlushAfterClose,

    /// Appending an entry to the open segment failed. The writer will
    /// reconcile with the medium before its next write or flush.
    #[error("Failed to write journal entry to {segment}: {source}")]
    WriteFailure {
        /// Location of the open segment.
        segment: String,
        /// The stream error reported by the medium.
        #[source]
        source: std::io::Error,
    },

    /// Flushing the open segment failed. Nothing buffered since the last
    /// successful flush is considered durable.
    #[error("Failed to flush journal entries to {segment}: {source}")]
    FlushFailure {
        /// Location of the open segment.
        segment: String,
        /// The stream error reported by the medium.
        #[source]
        source: std::io::Error,
    },

    /// Entries between the durable frontier and the oldest retained entry
    /// are gone. The journal cannot be repaired by this writer.
    #[error("Journal entries are missing: expected sequence {expected}, oldest retained entry has sequence {found}")]
    JournalEntryMissing {
        /// The first sequence number that is not durable.
        expected: u64,
        /// The sequence number of the oldest entry still retained for replay.
        found: u64,
    },

    /// The medium holds entries at or beyond the writer's next sequence
    /// number, so a new segment would overlap a durable one.
    #[error("Journal is ahead of its writer: durable entries end before sequence {expected}, writer's next sequence is {next}")]
    JournalAhead {
        /// The first sequence number that is not durable.
        expected: u64,
        /// The writer's next sequence number.
        next: u64,
    },

    /// More than one incomplete log exists, which means concurrent writers
    /// or an interrupted cleanup.
    #[error("Corrupt journal snapshot under {root}: multiple incomplete logs {incomplete:?}")]
    CorruptSnapshot {
        /// The journal root location.
        root: String,
        /// Locations of every incomplete log found.
        incomplete: Vec<String>,
    },

    /// A medium operation on a journal path failed.
    #[error("Medium operation on {path} failed: {source}")]
    Ufs {
        /// The path the operation was applied to.
        path: String,
        /// The medium error.
        #[source]
        source: UfsError,
    },

    /// A record could not be decoded from a segment. During recovery this
    /// marks the end of durable data rather than a failure.
    #[error("Invalid journal entry in {segment} at offset {offset}: {reason}")]
    InvalidEntry {
        /// Location of the segment being read.
        segment: String,
        /// Byte offset of the undecodable record.
        offset: u64,
        /// What was wrong with the record.
        reason: String,
    },

    /// A segment would be committed with an end before its start.
    #[error("Cannot complete {segment}: next sequence {next} is before segment start {start}")]
    SequenceRegression {
        /// Location of the open segment.
        segment: String,
        /// First sequence number of the segment.
        start: u64,
        /// The writer's next sequence number.
        next: u64,
    },

    /// A configuration value is out of range.
    #[error("Invalid journal configuration: {0}")]
    InvalidConfig(String),

    /// The configuration document could not be parsed.
    #[error("Journal configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// A local I/O error outside the medium (e.g. reading a config file).
    #[error("Journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The writer's state lock was poisoned by a panicking thread.
    #[error("Journal log writer state lock poisoned")]
    Poisoned,

    /// The garbage collector thread panicked.
    #[error("Journal garbage collector thread panicked")]
    GcPanicked,

    /// Several resources failed to shut down.
    #[error("Journal shutdown failed: {}", join_errors(.0))]
    Shutdown(Vec<JournalError>),
}

impl JournalError {
    /// Wrap a medium error with the path it concerned.
    pub fn ufs(path: impl Into<String>, source: UfsError) -> Self {
        JournalError::Ufs {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the error means the durability invariant is already
    /// broken. Fatal errors are never retried internally.
    pub fn is_fatal(&self) -> bool {
        match self {
            JournalError::JournalEntryMissing { .. }
            | JournalError::JournalAhead { .. }
            | JournalError::CorruptSnapshot { .. } => true,
            JournalError::Shutdown(errors) => errors.iter().any(JournalError::is_fatal),
            _ => false,
        }
    }

    /// Returns `true` if the error is a record decode failure rather than an
    /// I/O failure.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, JournalError::InvalidEntry { .. })
    }
}

fn join_errors(errors: &[JournalError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience type alias for journal results.
pub type JournalResult<T> = Result<T, JournalError>;
