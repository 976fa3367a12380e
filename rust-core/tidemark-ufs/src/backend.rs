// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core under-file-system trait for Tidemark.
//
// Defines the `UnderFileSystem` trait that every journal medium must satisfy.
// The contract is deliberately small: create/open/exists/delete/rename/list.
// Rename and delete are not assumed to be atomic across failures, and a medium
// may not support incremental flush at all (object stores only publish data
// when a stream is closed).

use std::fmt;
use std::io::{Read, Write};

use crate::error::UfsResult;

/// A write handle to a single file on an under file system.
///
/// `write` and `flush` come from [`std::io::Write`]. Whether a successful
/// `flush` makes the bytes durable depends on
/// [`UnderFileSystem::supports_flush`].
pub trait UfsOutputStream: Write + Send + fmt::Debug {
    /// Flush remaining bytes and release the handle.
    ///
    /// Must be idempotent: closing an already-closed stream succeeds.
    fn close(&mut self) -> std::io::Result<()>;
}

/// A pluggable, synchronous under file system.
///
/// Paths are `/`-separated strings. Implementations must be safe to share
/// across threads because the journal writer and its garbage collector use
/// the same medium concurrently.
pub trait UnderFileSystem: Send + Sync + fmt::Debug {
    /// Create (or truncate) the file at `path`, creating parent directories
    /// as needed, and return a stream for writing it.
    fn create(&self, path: &str) -> UfsResult<Box<dyn UfsOutputStream>>;

    /// Open the file at `path` for sequential reading.
    fn open(&self, path: &str) -> UfsResult<Box<dyn Read + Send>>;

    /// Check whether a file exists at `path`.
    fn exists(&self, path: &str) -> UfsResult<bool>;

    /// Delete the file at `path`.
    ///
    /// Deleting a missing file is an error ([`crate::UfsError::NotFound`]).
    fn delete_file(&self, path: &str) -> UfsResult<()>;

    /// Rename the file at `src` to `dst`.
    fn rename_file(&self, src: &str, dst: &str) -> UfsResult<()>;

    /// List the names (not full paths) of the files directly under `dir`.
    ///
    /// A missing directory lists as empty.
    fn list(&self, dir: &str) -> UfsResult<Vec<String>>;

    /// Create `dir` and any missing parents.
    fn mkdirs(&self, dir: &str) -> UfsResult<()>;

    /// Whether `flush` on a stream durably persists the bytes written so far.
    ///
    /// Object stores return `false`: their data is only committed when the
    /// stream is closed.
    fn supports_flush(&self) -> bool;

    /// A human-readable name for this medium, used in logging.
    fn name(&self) -> &str;
}

/// Join a child name onto a `/`-separated directory path.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Return the final component of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
