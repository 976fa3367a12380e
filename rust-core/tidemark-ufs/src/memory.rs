// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory medium for Tidemark.
//
// Uses a `BTreeMap` of path -> bytes behind a mutex. Two flavours exist:
//
// - flush-capable (`MemoryUfs::new`): a created file is visible immediately
//   and `flush` publishes the bytes buffered by the stream, like HDFS.
// - object store (`MemoryUfs::object_store`): `flush` publishes nothing and
//   the object only appears when the stream is closed, like S3 or OSS.
//
// Bytes a stream has buffered but not yet published are exactly the bytes a
// crash or medium failure can lose. Faults can be armed to make the next
// matching operation fail and to decide what happens to those bytes, which is
// what the journal's reconciliation tests are built on.

use std::collections::{BTreeMap, VecDeque};
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::backend::{UfsOutputStream, UnderFileSystem};
use crate::error::{UfsError, UfsResult};

/// What happens to the bytes a stream had buffered when it breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unflushed {
    /// The buffered bytes reached the medium despite the failure.
    Persisted,
    /// The buffered bytes never reached the medium.
    Lost,
    /// The buffered bytes reached the medium followed by the first half of
    /// the failing write, leaving a truncated trailing record.
    Torn,
}

/// A one-shot failure armed on a [`MemoryUfs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Let `after` writes succeed, then fail the next one.
    Write {
        /// Number of writes that still succeed before the failure.
        after: u64,
        /// Fate of the bytes the failing stream had buffered.
        unflushed: Unflushed,
    },
    /// Fail the next flush on a flush-capable medium.
    Flush {
        /// Fate of the bytes the failing stream had buffered.
        unflushed: Unflushed,
    },
    /// Fail the next `create`.
    Create,
    /// Fail the next `rename_file`.
    Rename,
    /// Fail the next `delete_file`.
    Delete,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    faults: VecDeque<Fault>,
}

impl MemoryState {
    fn take_write_fault(&mut self) -> Option<Unflushed> {
        let index = self
            .faults
            .iter()
            .position(|fault| matches!(fault, Fault::Write { .. }))?;
        if let Fault::Write { after, .. } = &mut self.faults[index] {
            if *after > 0 {
                *after -= 1;
                return None;
            }
        }
        match self.faults.remove(index) {
            Some(Fault::Write { unflushed, .. }) => Some(unflushed),
            _ => None,
        }
    }

    fn take_flush_fault(&mut self) -> Option<Unflushed> {
        let index = self
            .faults
            .iter()
            .position(|fault| matches!(fault, Fault::Flush { .. }))?;
        match self.faults.remove(index) {
            Some(Fault::Flush { unflushed }) => Some(unflushed),
            _ => None,
        }
    }

    fn take_fault(&mut self, wanted: &Fault) -> bool {
        match self.faults.iter().position(|fault| fault == wanted) {
            Some(index) => {
                self.faults.remove(index);
                true
            }
            None => false,
        }
    }

    /// Append `bytes` to the file at `path`. When `create_missing` is false a
    /// missing file swallows the bytes, like writes through a handle to an
    /// unlinked file.
    fn publish(&mut self, path: &str, bytes: &[u8], create_missing: bool) {
        match self.files.get_mut(path) {
            Some(contents) => contents.extend_from_slice(bytes),
            None if create_missing => {
                self.files.insert(path.to_string(), bytes.to_vec());
            }
            None => {
                debug!(path, len = bytes.len(), "Dropping bytes written to a removed file");
            }
        }
    }
}

/// An in-memory under file system with optional object-store semantics and
/// fault injection.
///
/// Cloning is cheap and every clone shares the same files and faults.
///
/// # Example
///
/// ```rust
/// use std::io::Write;
/// use tidemark_ufs::{MemoryUfs, UnderFileSystem};
///
/// let ufs = MemoryUfs::new();
/// let mut stream = ufs.create("/journal/logs/a").unwrap();
/// stream.write_all(b"entry").unwrap();
/// stream.flush().unwrap();
/// assert_eq!(ufs.read_file("/journal/logs/a"), Some(b"entry".to_vec()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryUfs {
    state: Arc<Mutex<MemoryState>>,
    object_store: bool,
}

impl MemoryUfs {
    /// Create an empty, flush-capable in-memory medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty in-memory medium with object-store semantics: no
    /// incremental flush, objects appear only when their stream is closed.
    pub fn object_store() -> Self {
        Self {
            state: Arc::default(),
            object_store: true,
        }
    }

    /// Arm a one-shot fault. Faults of the same kind fire in arming order.
    pub fn arm(&self, fault: Fault) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.push_back(fault);
        }
    }

    /// Number of armed faults that have not fired yet.
    pub fn armed_faults(&self) -> usize {
        self.state.lock().map(|state| state.faults.len()).unwrap_or(0)
    }

    /// Disarm every pending fault.
    pub fn clear_faults(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.clear();
        }
    }

    /// All file paths currently visible on the medium, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The published contents of the file at `path`.
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.files.get(path).cloned())
    }

    /// Place a file directly on the medium, replacing any existing one.
    pub fn put_file(&self, path: &str, contents: &[u8]) {
        if let Ok(mut state) = self.state.lock() {
            state.files.insert(path.to_string(), contents.to_vec());
        }
    }

    fn lock(&self) -> UfsResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| UfsError::Poisoned)
    }
}

impl UnderFileSystem for MemoryUfs {
    fn create(&self, path: &str) -> UfsResult<Box<dyn UfsOutputStream>> {
        let mut state = self.lock()?;
        if state.take_fault(&Fault::Create) {
            return Err(UfsError::Injected {
                op: "create",
                path: path.to_string(),
            });
        }
        if !self.object_store {
            state.files.insert(path.to_string(), Vec::new());
        }
        Ok(Box::new(MemoryOutputStream {
            path: path.to_string(),
            pending: Vec::new(),
            state: Arc::clone(&self.state),
            object_store: self.object_store,
            broken: false,
            closed: false,
        }))
    }

    fn open(&self, path: &str) -> UfsResult<Box<dyn Read + Send>> {
        let state = self.lock()?;
        let contents = state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| UfsError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(contents)))
    }

    fn exists(&self, path: &str) -> UfsResult<bool> {
        Ok(self.lock()?.files.contains_key(path))
    }

    fn delete_file(&self, path: &str) -> UfsResult<()> {
        let mut state = self.lock()?;
        if state.take_fault(&Fault::Delete) {
            return Err(UfsError::Injected {
                op: "delete",
                path: path.to_string(),
            });
        }
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| UfsError::NotFound(path.to_string()))
    }

    fn rename_file(&self, src: &str, dst: &str) -> UfsResult<()> {
        let mut state = self.lock()?;
        if state.take_fault(&Fault::Rename) {
            return Err(UfsError::Injected {
                op: "rename",
                path: src.to_string(),
            });
        }
        if state.files.contains_key(dst) {
            return Err(UfsError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("rename destination {dst} already exists"),
            )));
        }
        let contents = state
            .files
            .remove(src)
            .ok_or_else(|| UfsError::NotFound(src.to_string()))?;
        state.files.insert(dst.to_string(), contents);
        Ok(())
    }

    fn list(&self, dir: &str) -> UfsResult<Vec<String>> {
        let prefix = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        let state = self.lock()?;
        let names = state
            .files
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, _)| {
                let name = &path[prefix.len()..];
                (!name.contains('/')).then(|| name.to_string())
            })
            .collect();
        Ok(names)
    }

    fn mkdirs(&self, _dir: &str) -> UfsResult<()> {
        // Directories are implicit in the path keys.
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        !self.object_store
    }

    fn name(&self) -> &str {
        if self.object_store {
            "memory-object-store"
        } else {
            "memory"
        }
    }
}

/// A write handle to an in-memory file.
#[derive(Debug)]
struct MemoryOutputStream {
    path: String,
    /// Bytes accepted by `write` but not yet published.
    pending: Vec<u8>,
    state: Arc<Mutex<MemoryState>>,
    object_store: bool,
    /// Set once an injected fault fired; the stream rejects further I/O.
    broken: bool,
    closed: bool,
}

impl MemoryOutputStream {
    fn check_usable(&self) -> std::io::Result<()> {
        if self.closed {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("stream to {} already closed", self.path),
            ));
        }
        if self.broken {
            return Err(std::io::Error::other(format!(
                "stream to {} broken by an earlier failure",
                self.path
            )));
        }
        Ok(())
    }

    fn lock(&self) -> std::io::Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| std::io::Error::other("medium state lock poisoned"))
    }

    /// Break the stream, applying `fate` to the buffered bytes.
    fn fail(&mut self, op: &str, fate: Unflushed, failing_write: &[u8]) -> std::io::Error {
        let mut survivors = match fate {
            Unflushed::Persisted | Unflushed::Torn => std::mem::take(&mut self.pending),
            Unflushed::Lost => Vec::new(),
        };
        if fate == Unflushed::Torn {
            survivors.extend_from_slice(&failing_write[..failing_write.len() / 2]);
        }
        self.pending.clear();
        self.broken = true;

        let path = self.path.clone();
        if let Ok(mut state) = self.lock() {
            if !survivors.is_empty() {
                state.publish(&path, &survivors, true);
            }
        }
        debug!(path = %path, op, ?fate, "Injected stream failure");
        std::io::Error::other(format!("injected {op} failure on {path}"))
    }
}

impl Write for MemoryOutputStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.check_usable()?;
        let fault = self.lock()?.take_write_fault();
        if let Some(fate) = fault {
            return Err(self.fail("write", fate, buf));
        }
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.check_usable()?;
        if self.object_store {
            // Object stores only stage bytes locally until close.
            return Ok(());
        }
        let fault = self.lock()?.take_flush_fault();
        if let Some(fate) = fault {
            return Err(self.fail("flush", fate, &[]));
        }
        let pending = std::mem::take(&mut self.pending);
        let path = self.path.clone();
        self.lock()?.publish(&path, &pending, false);
        Ok(())
    }
}

impl UfsOutputStream for MemoryOutputStream {
    fn close(&mut self) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.broken {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        let path = self.path.clone();
        let object_store = self.object_store;
        self.lock()?.publish(&path, &pending, object_store);
        Ok(())
    }
}
