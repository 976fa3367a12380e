// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The write path of a metadata journal kept on an under file system (UFS)
// that may offer no atomic append and may only publish data when a stream
// is closed. Entries are appended in gap-free sequence order to log
// segments; a rename is the only marker that a segment is complete, and the
// writer reconciles with the medium after any write or flush failure.
//
// # Architecture
//
// The journal root holds two directories of segment files named
// `0x{start}-0x{end}` (`end` is exclusive):
//
// ```text
// <root>/logs/0x0000000000000000-0x0000000000000005         complete
// <root>/logs/0x0000000000000005-0x7fffffffffffffff         being written
// <root>/checkpoints/0x0000000000000000-0x0000000000000005
// ```
//
// ## Segment entry format (all integers little-endian)
//
// ```text
// [4 bytes: frame_length (u32)]  -- length of everything after this field
// [4 bytes: crc32 checksum]      -- CRC32 of all bytes after this field
// [8 bytes: sequence (u64)]
// [N bytes: payload]
// ```
//
// ## Usage
//
// ```rust
// use tidemark_journal::{JournalEntry, JournalReader, UfsJournal, UfsJournalLogWriter};
// use tidemark_ufs::MemoryUfs;
//
// let journal = UfsJournal::new(MemoryUfs::new(), "/tidemark/journal");
// let writer = UfsJournalLogWriter::new(journal.clone(), 0).unwrap();
//
// let seq = writer.write(JournalEntry::new(b"mkdir /a".to_vec())).unwrap();
// assert_eq!(seq, 0);
// writer.flush().unwrap();
// writer.close().unwrap();
//
// let entries = JournalReader::open(&journal, 0, true).unwrap().read_all().unwrap();
// assert_eq!(entries.len(), 1);
// ```

pub mod config;
pub mod entry;
pub mod error;
pub mod file;
pub mod gc;
pub mod journal;
pub mod output;
pub mod reader;
pub mod recovery;
pub mod snapshot;
pub mod writer;

// Re-export the primary public API for ergonomic imports.
pub use config::JournalConf;
pub use entry::{decode_frame, FrameError, JournalEntry};
pub use error::{JournalError, JournalResult};
pub use file::{
    decode_file_name, encode_checkpoint_location, encode_file_name, encode_log_location,
    SegmentFile, SegmentKind, UNKNOWN_SEQUENCE_NUMBER,
};
pub use gc::{collect_garbage, GcReport, JournalGarbageCollector};
pub use journal::UfsJournal;
pub use output::OutputHandle;
pub use reader::{JournalReader, SegmentReader};
pub use recovery::DurableFrontier;
pub use snapshot::{current_log, JournalSnapshot};
pub use writer::UfsJournalLogWriter;
