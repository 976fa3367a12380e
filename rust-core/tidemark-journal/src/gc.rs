// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Garbage collector
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Once a checkpoint covering `[s, e)` exists, every complete log ending at or
// before `e` and every older checkpoint is redundant. The collector removes
// them on a fixed period from a dedicated thread that shares only the journal
// handle (medium, location, configuration) with the log writer, never the
// writer's state. The incomplete log is never a candidate.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use tidemark_ufs::UfsError;
use tracing::{debug, info, warn};

use crate::error::{JournalError, JournalResult};
use crate::file::SegmentFile;
use crate::journal::UfsJournal;
use crate::snapshot::JournalSnapshot;

/// What a garbage collection pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Locations of deleted log segments.
    pub deleted_logs: Vec<String>,
    /// Locations of deleted checkpoints.
    pub deleted_checkpoints: Vec<String>,
}

impl GcReport {
    /// Whether the pass removed nothing.
    pub fn is_empty(&self) -> bool {
        self.deleted_logs.is_empty() && self.deleted_checkpoints.is_empty()
    }
}

/// Run one garbage collection pass over `journal`.
pub fn collect_garbage(journal: &UfsJournal) -> JournalResult<GcReport> {
    let snapshot = JournalSnapshot::take(journal)?;
    let mut report = GcReport::default();

    let Some(latest) = snapshot.latest_checkpoint().cloned() else {
        debug!(journal = %journal.location(), "No checkpoint, nothing to collect");
        return Ok(report);
    };

    for log in snapshot.logs().iter().filter(|log| log.end <= latest.end) {
        if delete(journal, log)? {
            report.deleted_logs.push(log.location.clone());
        }
    }
    for checkpoint in snapshot
        .checkpoints
        .iter()
        .filter(|checkpoint| **checkpoint != latest)
    {
        if delete(journal, checkpoint)? {
            report.deleted_checkpoints.push(checkpoint.location.clone());
        }
    }

    if !report.is_empty() {
        info!(
            journal = %journal.location(),
            checkpoint = %latest.location,
            logs = report.deleted_logs.len(),
            checkpoints = report.deleted_checkpoints.len(),
            "Garbage collected journal segments"
        );
    }
    Ok(report)
}

/// Delete `segment`, treating an already-removed file as nothing to do.
fn delete(journal: &UfsJournal, segment: &SegmentFile) -> JournalResult<bool> {
    match journal.ufs().delete_file(&segment.location) {
        Ok(()) => {
            debug!(segment = %segment.location, "Deleted redundant journal segment");
            Ok(true)
        }
        Err(UfsError::NotFound(_)) => Ok(false),
        Err(source) => Err(JournalError::ufs(&segment.location, source)),
    }
}

/// Handle to the background garbage collector thread.
///
/// Dropping the handle stops the thread.
#[derive(Debug)]
pub struct JournalGarbageCollector {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl JournalGarbageCollector {
    /// Spawn a thread that collects garbage every `gc_period` of the
    /// journal's configuration.
    pub fn start(journal: UfsJournal) -> JournalResult<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let period = journal.conf().gc_period();
        let join = thread::Builder::new()
            .name("tidemark-journal-gc".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(error) = collect_garbage(&journal) {
                            warn!(
                                journal = %journal.location(),
                                error = %error,
                                "Journal garbage collection failed, retrying next period"
                            );
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        debug!(period_ms = period.as_millis() as u64, "Started journal garbage collector");
        Ok(Self {
            stop: Some(stop),
            join: Some(join),
        })
    }

    /// Signal the thread and wait for it to exit. Safe to call repeatedly.
    pub fn stop(&mut self) -> JournalResult<()> {
        if let Some(stop) = self.stop.take() {
            // A send error means the thread is already gone.
            let _ = stop.send(());
        }
        match self.join.take() {
            Some(handle) => {
                handle.join().map_err(|_| JournalError::GcPanicked)?;
                debug!("Stopped journal garbage collector");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Whether the thread has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.join.is_none()
    }
}

impl Drop for JournalGarbageCollector {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(error = %error, "Journal garbage collector did not stop cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JournalConf;
    use crate::file::{encode_checkpoint_location, encode_log_location, UNKNOWN_SEQUENCE_NUMBER};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tidemark_ufs::MemoryUfs;

    fn setup(conf: JournalConf) -> (MemoryUfs, UfsJournal) {
        let ufs = MemoryUfs::new();
        let journal = UfsJournal::with_conf(Arc::new(ufs.clone()), "/j", conf);
        (ufs, journal)
    }

    #[test]
    fn test_no_checkpoint_keeps_everything() {
        let (ufs, journal) = setup(JournalConf::default());
        ufs.put_file(&encode_log_location(&journal, 0, 5), b"");
        assert!(collect_garbage(&journal).unwrap().is_empty());
        assert_eq!(ufs.paths().len(), 1);
    }

    #[test]
    fn test_collects_covered_logs_and_old_checkpoints() {
        let (ufs, journal) = setup(JournalConf::default());
        let log_a = encode_log_location(&journal, 0, 5);
        let log_b = encode_log_location(&journal, 5, 10);
        let log_c = encode_log_location(&journal, 10, 15);
        let current = encode_log_location(&journal, 15, UNKNOWN_SEQUENCE_NUMBER);
        let old_checkpoint = encode_checkpoint_location(&journal, 0, 5);
        let checkpoint = encode_checkpoint_location(&journal, 0, 10);
        for path in [&log_a, &log_b, &log_c, &current, &old_checkpoint, &checkpoint] {
            ufs.put_file(path, b"");
        }

        let report = collect_garbage(&journal).unwrap();
        assert_eq!(report.deleted_logs, vec![log_a, log_b]);
        assert_eq!(report.deleted_checkpoints, vec![old_checkpoint]);

        let mut remaining = vec![checkpoint, log_c, current];
        remaining.sort();
        assert_eq!(ufs.paths(), remaining);

        // A second pass has nothing left to do.
        assert!(collect_garbage(&journal).unwrap().is_empty());
    }

    #[test]
    fn test_background_thread_collects_and_stops() {
        let conf = JournalConf {
            gc_period_ms: 10,
            ..JournalConf::default()
        };
        let (ufs, journal) = setup(conf);
        ufs.put_file(&encode_log_location(&journal, 0, 5), b"");
        ufs.put_file(&encode_checkpoint_location(&journal, 0, 5), b"");

        let mut gc = JournalGarbageCollector::start(journal.clone()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while ufs.paths().len() > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ufs.paths(), vec![encode_checkpoint_location(&journal, 0, 5)]);

        gc.stop().unwrap();
        assert!(gc.is_stopped());
        gc.stop().unwrap();
    }

    #[test]
    fn test_drop_stops_thread() {
        let (_, journal) = setup(JournalConf::default());
        let gc = JournalGarbageCollector::start(journal).unwrap();
        assert!(!gc.is_stopped());
        drop(gc);
    }
}
