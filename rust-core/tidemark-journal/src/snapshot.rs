// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Segment snapshot
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A point-in-time view of every segment on the medium, built by listing the
// `logs/` and `checkpoints/` directories and decoding the names. Snapshots
// are never cached: every recovery step takes a fresh one, because a previous
// writer or the garbage collector may have changed the namespace since.

use tidemark_ufs::join_path;
use tracing::{debug, warn};

use crate::error::{JournalError, JournalResult};
use crate::file::{SegmentFile, SegmentKind};
use crate::journal::UfsJournal;

/// The segments of a journal at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalSnapshot {
    /// Checkpoints, sorted by start.
    pub checkpoints: Vec<SegmentFile>,
    /// Complete log segments, sorted by start.
    pub logs: Vec<SegmentFile>,
    /// The single log segment still being written, if any.
    pub current_log: Option<SegmentFile>,
}

impl JournalSnapshot {
    /// List the medium and build a snapshot of `journal`.
    ///
    /// Names that are not segment names are ignored. More than one incomplete
    /// log means the namespace is corrupt and the call fails with
    /// [`JournalError::CorruptSnapshot`].
    pub fn take(journal: &UfsJournal) -> JournalResult<Self> {
        let checkpoints = list_segments(journal, &journal.checkpoint_dir(), SegmentKind::Checkpoint)?;
        let all_logs = list_segments(journal, &journal.log_dir(), SegmentKind::Log)?;

        let (mut incomplete, logs): (Vec<_>, Vec<_>) =
            all_logs.into_iter().partition(SegmentFile::is_incomplete);

        if incomplete.len() > 1 {
            return Err(JournalError::CorruptSnapshot {
                root: journal.location().to_string(),
                incomplete: incomplete.into_iter().map(|s| s.location).collect(),
            });
        }
        let current_log = incomplete.pop();

        let snapshot = Self {
            checkpoints,
            logs,
            current_log,
        };
        if !snapshot.is_contiguous() {
            warn!(
                journal = %journal.location(),
                logs = ?snapshot.logs.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
                "Complete journal logs are not contiguous"
            );
        }
        debug!(
            journal = %journal.location(),
            checkpoints = snapshot.checkpoints.len(),
            logs = snapshot.logs.len(),
            incomplete = snapshot.current_log.is_some(),
            "Took journal snapshot"
        );
        Ok(snapshot)
    }

    /// The incomplete log, if any.
    pub fn current_log(&self) -> Option<&SegmentFile> {
        self.current_log.as_ref()
    }

    /// The checkpoint with the highest end.
    pub fn latest_checkpoint(&self) -> Option<&SegmentFile> {
        self.checkpoints.iter().max_by_key(|c| (c.end, c.start))
    }

    /// The most recently completed log segment.
    pub fn last_complete_log(&self) -> Option<&SegmentFile> {
        self.logs.last()
    }

    /// Complete logs, sorted by start.
    pub fn logs(&self) -> &[SegmentFile] {
        &self.logs
    }

    /// Whether the complete logs form one gap-free, non-overlapping run and
    /// the incomplete log, if any, starts where they end.
    pub fn is_contiguous(&self) -> bool {
        let runs = self.logs.windows(2).all(|pair| pair[0].end == pair[1].start);
        let tail = match (self.logs.last(), &self.current_log) {
            (Some(last), Some(current)) => last.end == current.start,
            _ => true,
        };
        runs && tail
    }
}

/// The incomplete log of `journal`, if any.
pub fn current_log(journal: &UfsJournal) -> JournalResult<Option<SegmentFile>> {
    Ok(JournalSnapshot::take(journal)?.current_log)
}

fn list_segments(
    journal: &UfsJournal,
    dir: &str,
    kind: SegmentKind,
) -> JournalResult<Vec<SegmentFile>> {
    let names = journal
        .ufs()
        .list(dir)
        .map_err(|source| JournalError::ufs(dir, source))?;

    let mut segments = Vec::with_capacity(names.len());
    for name in names {
        let location = join_path(dir, &name);
        match SegmentFile::from_location(&location, kind) {
            Some(segment) => segments.push(segment),
            None => debug!(location = %location, "Ignoring non-segment file"),
        }
    }
    segments.sort();
    Ok(segments)
}
