// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for Tidemark media.
//
// Wraps any `UnderFileSystem` and transparently counts namespace operations
// and their failures. Used to observe how much medium traffic journal
// rotation, commit and reconciliation generate, and to assert that a failed
// reconciliation left the namespace untouched.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::backend::{UfsOutputStream, UnderFileSystem};
use crate::error::UfsResult;

/// Accumulated statistics for a medium.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MeteredUfs`] that owns them, until [`MeteredUfs::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UfsStats {
    /// Number of `create` operations performed.
    pub create_count: u64,
    /// Number of `open` operations performed.
    pub open_count: u64,
    /// Number of `exists` operations performed.
    pub exists_count: u64,
    /// Number of `delete_file` operations performed.
    pub delete_count: u64,
    /// Number of `rename_file` operations performed.
    pub rename_count: u64,
    /// Number of `list` operations performed.
    pub list_count: u64,
    /// Number of operations of any kind that returned an error.
    pub failure_count: u64,
    /// Cumulative wall-clock latency of renames, in milliseconds.
    pub rename_latency_sum_ms: f64,
}

impl UfsStats {
    /// Number of operations that changed the namespace (create, delete,
    /// rename).
    pub fn mutations(&self) -> u64 {
        self.create_count + self.delete_count + self.rename_count
    }
}

/// A medium wrapper that collects operation metrics.
///
/// Delegates every operation to an inner medium while counting invocations.
/// Statistics are available via [`MeteredUfs::stats`].
///
/// # Example
///
/// ```rust
/// use tidemark_ufs::{MemoryUfs, MeteredUfs, UnderFileSystem};
///
/// let metered = MeteredUfs::new(MemoryUfs::new());
/// metered.create("/j/a").unwrap();
/// metered.rename_file("/j/a", "/j/b").unwrap();
///
/// let stats = metered.stats();
/// assert_eq!(stats.create_count, 1);
/// assert_eq!(stats.rename_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MeteredUfs<U: UnderFileSystem> {
    /// The wrapped medium that performs the actual operations.
    inner: U,
    /// Shared, mutable statistics accumulator.
    stats: Arc<Mutex<UfsStats>>,
}

impl<U: UnderFileSystem> MeteredUfs<U> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: U) -> Self {
        Self {
            inner,
            stats: Arc::new(Mutex::new(UfsStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub fn stats(&self) -> UfsStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    /// Reset all statistics to zero.
    pub fn reset_stats(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            *stats = UfsStats::default();
        }
    }

    /// Return a reference to the inner medium.
    pub fn inner(&self) -> &U {
        &self.inner
    }

    fn record<T>(&self, result: &UfsResult<T>, bump: impl FnOnce(&mut UfsStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            bump(&mut stats);
            if result.is_err() {
                stats.failure_count += 1;
            }
        }
    }
}

impl<U: UnderFileSystem> UnderFileSystem for MeteredUfs<U> {
    fn create(&self, path: &str) -> UfsResult<Box<dyn UfsOutputStream>> {
        let result = self.inner.create(path);
        self.record(&result, |s| s.create_count += 1);
        result
    }

    fn open(&self, path: &str) -> UfsResult<Box<dyn Read + Send>> {
        let result = self.inner.open(path);
        self.record(&result, |s| s.open_count += 1);
        result
    }

    fn exists(&self, path: &str) -> UfsResult<bool> {
        let result = self.inner.exists(path);
        self.record(&result, |s| s.exists_count += 1);
        result
    }

    fn delete_file(&self, path: &str) -> UfsResult<()> {
        let result = self.inner.delete_file(path);
        self.record(&result, |s| s.delete_count += 1);
        result
    }

    fn rename_file(&self, src: &str, dst: &str) -> UfsResult<()> {
        let start = Instant::now();
        let result = self.inner.rename_file(src, dst);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.record(&result, |s| {
            s.rename_count += 1;
            s.rename_latency_sum_ms += elapsed_ms;
        });
        result
    }

    fn list(&self, dir: &str) -> UfsResult<Vec<String>> {
        let result = self.inner.list(dir);
        self.record(&result, |s| s.list_count += 1);
        result
    }

    fn mkdirs(&self, dir: &str) -> UfsResult<()> {
        self.inner.mkdirs(dir)
    }

    fn supports_flush(&self) -> bool {
        self.inner.supports_flush()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryUfs;

    #[test]
    fn test_counts_namespace_operations() {
        let metered = MeteredUfs::new(MemoryUfs::new());

        metered.create("/j/a").unwrap();
        metered.exists("/j/a").unwrap();
        metered.rename_file("/j/a", "/j/b").unwrap();
        metered.list("/j").unwrap();
        metered.open("/j/b").unwrap();
        metered.delete_file("/j/b").unwrap();

        let stats = metered.stats();
        assert_eq!(stats.create_count, 1);
        assert_eq!(stats.exists_count, 1);
        assert_eq!(stats.rename_count, 1);
        assert_eq!(stats.list_count, 1);
        assert_eq!(stats.open_count, 1);
        assert_eq!(stats.delete_count, 1);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.mutations(), 3);
        assert!(stats.rename_latency_sum_ms >= 0.0);
    }

    #[test]
    fn test_failures_are_counted() {
        let metered = MeteredUfs::new(MemoryUfs::new());
        assert!(metered.delete_file("/j/missing").is_err());
        assert!(metered.open("/j/missing").is_err());

        let stats = metered.stats();
        assert_eq!(stats.delete_count, 1);
        assert_eq!(stats.failure_count, 2);
    }

    #[test]
    fn test_reset_stats() {
        let metered = MeteredUfs::new(MemoryUfs::new());
        metered.create("/j/a").unwrap();
        metered.reset_stats();
        assert_eq!(metered.stats(), UfsStats::default());
    }

    #[test]
    fn test_delegates_capabilities() {
        let metered = MeteredUfs::new(MemoryUfs::object_store());
        assert!(!metered.supports_flush());
        assert_eq!(metered.name(), "memory-object-store");
        assert_eq!(metered.inner().name(), "memory-object-store");
    }
}
