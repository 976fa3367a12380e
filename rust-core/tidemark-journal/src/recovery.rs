// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Durable frontier discovery
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// After a medium failure the writer cannot trust anything it buffered since
// the last successful flush. Recovery asks the medium instead:
//
// 1. Take a fresh snapshot and find the incomplete log.
// 2. Scan it until the end or the first undecodable frame, tracking the
//    highest sequence number decoded. A torn trailing frame ends durable data.
// 3. Without an incomplete log, or with an empty one, the end of the most
//    recent complete log is authoritative (its name says where it ends). The
//    latest checkpoint counts too, since the logs it covers may be gone.
//
// `probe` does all of this without touching the namespace. `seal` then marks
// the incomplete log complete at the frontier, or deletes it when it held no
// entries, so the next segment can start right after the last durable entry.

use tidemark_ufs::UnderFileSystem;
use tracing::{debug, info, warn};

use crate::error::{JournalError, JournalResult};
use crate::file::SegmentFile;
use crate::journal::UfsJournal;
use crate::output::exists;
use crate::reader::SegmentReader;
use crate::snapshot::JournalSnapshot;

/// Where durable data on the medium ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableFrontier {
    /// The incomplete log found by the probe, if any.
    pub incomplete: Option<SegmentFile>,
    /// Highest sequence number decoded from the incomplete log.
    pub last_in_incomplete: Option<u64>,
    /// Sequence number of the last durable entry, or `None` when the journal
    /// holds no entries at all.
    pub last_persisted: Option<u64>,
}

impl DurableFrontier {
    /// The first sequence number that is not durable.
    pub fn next_sequence_number(&self) -> u64 {
        self.last_persisted.map_or(0, |last| last + 1)
    }
}

/// Find the durable frontier of `journal` without modifying the medium.
pub fn probe(journal: &UfsJournal) -> JournalResult<DurableFrontier> {
    let snapshot = JournalSnapshot::take(journal)?;

    let last_in_incomplete = match snapshot.current_log() {
        Some(current) => {
            info!(
                segment = %current.location,
                "Scanning incomplete log for the last persisted journal entry"
            );
            scan(journal.ufs().as_ref(), current)?
        }
        None => None,
    };

    let last_persisted = match last_in_incomplete {
        Some(last) => Some(last),
        None => {
            let from_log = snapshot.last_complete_log().and_then(|log| {
                debug!(segment = %log.location, end = log.end, "Using end of last complete log");
                log.end.checked_sub(1)
            });
            // Logs covered by a checkpoint may already be collected.
            let from_checkpoint = snapshot
                .latest_checkpoint()
                .and_then(|checkpoint| checkpoint.end.checked_sub(1));
            from_log.max(from_checkpoint)
        }
    };

    info!(
        journal = %journal.location(),
        ?last_persisted,
        "Found last persisted journal entry"
    );
    Ok(DurableFrontier {
        incomplete: snapshot.current_log,
        last_in_incomplete,
        last_persisted,
    })
}

/// Mark the incomplete log found by `probe` as complete at the frontier, or
/// delete it when no entry in it could be decoded.
///
/// Returns the completed segment, if one was produced.
pub fn seal(journal: &UfsJournal, frontier: &DurableFrontier) -> JournalResult<Option<SegmentFile>> {
    let Some(incomplete) = &frontier.incomplete else {
        return Ok(None);
    };
    let ufs = journal.ufs().as_ref();
    let src = &incomplete.location;

    let Some(last) = frontier.last_in_incomplete else {
        info!(segment = %src, "No journal entry found in incomplete log, deleting it");
        ufs.delete_file(src)
            .map_err(|source| JournalError::ufs(src, source))?;
        return Ok(None);
    };

    let completed = SegmentFile::log(journal, incomplete.start, last + 1);
    let dst = &completed.location;
    if exists(ufs, dst)? {
        warn!(segment = %dst, "Deleting duplicate completed log");
        ufs.delete_file(dst)
            .map_err(|source| JournalError::ufs(dst, source))?;
    }
    info!(src = %src, dst = %dst, "Renaming incomplete log at the durable frontier");
    ufs.rename_file(src, dst)
        .map_err(|source| JournalError::ufs(src, source))?;
    Ok(Some(completed))
}

/// Highest sequence number decodable from `segment`. A decode failure ends
/// the scan; an I/O failure is returned.
fn scan(ufs: &dyn UnderFileSystem, segment: &SegmentFile) -> JournalResult<Option<u64>> {
    let mut reader = SegmentReader::open(ufs, segment)?;
    let mut last: Option<u64> = None;
    loop {
        match reader.read() {
            Ok(Some(entry)) => {
                last = Some(last.map_or(entry.sequence_number, |l| l.max(entry.sequence_number)));
            }
            Ok(None) => break,
            Err(error) if error.is_decode_error() => {
                info!(
                    segment = %segment.location,
                    offset = reader.position(),
                    ?last,
                    "Durable data ends at undecodable entry"
                );
                break;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::JournalEntry;
    use crate::file::{encode_checkpoint_location, encode_log_location, UNKNOWN_SEQUENCE_NUMBER};
    use tidemark_ufs::MemoryUfs;

    fn setup() -> (MemoryUfs, UfsJournal) {
        let ufs = MemoryUfs::new();
        let journal = UfsJournal::new(ufs.clone(), "/j");
        (ufs, journal)
    }

    fn probe_and_seal(journal: &UfsJournal) -> Option<u64> {
        let frontier = probe(journal).unwrap();
        seal(journal, &frontier).unwrap();
        frontier.last_persisted
    }

    fn frames(range: std::ops::Range<u64>) -> Vec<u8> {
        range
            .flat_map(|seq| JournalEntry::new(b"x".to_vec()).with_sequence_number(seq).encode())
            .collect()
    }

    #[test]
    fn test_empty_journal() {
        let (ufs, journal) = setup();
        let frontier = probe(&journal).unwrap();
        assert_eq!(frontier.last_persisted, None);
        assert_eq!(frontier.next_sequence_number(), 0);
        assert!(seal(&journal, &frontier).unwrap().is_none());
        assert!(ufs.paths().is_empty());
    }

    #[test]
    fn test_complete_log_name_is_authoritative() {
        let (ufs, journal) = setup();
        // Contents are not read: the name alone decides.
        ufs.put_file(&encode_log_location(&journal, 0, 5), b"");
        ufs.put_file(&encode_log_location(&journal, 5, 9), b"");
        assert_eq!(probe_and_seal(&journal), Some(8));
    }

    #[test]
    fn test_checkpoint_covers_collected_logs() {
        let (ufs, journal) = setup();
        ufs.put_file(&encode_checkpoint_location(&journal, 0, 100), b"");
        ufs.put_file(&encode_log_location(&journal, 100, UNKNOWN_SEQUENCE_NUMBER), b"");
        assert_eq!(probe_and_seal(&journal), Some(99));
        assert_eq!(ufs.paths(), vec![encode_checkpoint_location(&journal, 0, 100)]);
    }

    #[test]
    fn test_probe_is_read_only_and_seal_renames() {
        let (ufs, journal) = setup();
        ufs.put_file(&encode_log_location(&journal, 0, 4), b"");
        let incomplete = encode_log_location(&journal, 4, UNKNOWN_SEQUENCE_NUMBER);
        let mut data = frames(4..7);
        data.extend_from_slice(&frames(7..8)[..5]);
        ufs.put_file(&incomplete, &data);

        let before = ufs.paths();
        let frontier = probe(&journal).unwrap();
        assert_eq!(ufs.paths(), before);
        assert_eq!(frontier.last_in_incomplete, Some(6));
        assert_eq!(frontier.last_persisted, Some(6));

        let sealed = seal(&journal, &frontier).unwrap().unwrap();
        assert_eq!((sealed.start, sealed.end), (4, 7));
        assert_eq!(
            ufs.paths(),
            vec![
                encode_log_location(&journal, 0, 4),
                encode_log_location(&journal, 4, 7)
            ]
        );
    }

    #[test]
    fn test_empty_incomplete_log_is_deleted() {
        let (ufs, journal) = setup();
        ufs.put_file(&encode_log_location(&journal, 0, 4), b"");
        ufs.put_file(&encode_log_location(&journal, 4, UNKNOWN_SEQUENCE_NUMBER), &[1, 2, 3]);

        assert_eq!(probe_and_seal(&journal), Some(3));
        assert_eq!(ufs.paths(), vec![encode_log_location(&journal, 0, 4)]);
    }

    #[test]
    fn test_seal_replaces_duplicate_destination() {
        let (ufs, journal) = setup();
        ufs.put_file(&encode_log_location(&journal, 0, UNKNOWN_SEQUENCE_NUMBER), &frames(0..2));
        ufs.put_file(&encode_log_location(&journal, 0, 2), b"stale");

        assert_eq!(probe_and_seal(&journal), Some(1));
        let dst = encode_log_location(&journal, 0, 2);
        assert_eq!(ufs.paths(), vec![dst.clone()]);
        assert_eq!(ufs.read_file(&dst), Some(frames(0..2)));
    }
}
