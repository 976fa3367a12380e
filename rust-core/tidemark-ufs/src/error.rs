// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for the Tidemark under-file-system abstraction.
//
// Covers every failure a medium may report: raw I/O errors, missing paths,
// faults injected by the in-memory medium, and poisoned internal locks.

use thiserror::Error;

/// Errors that can occur when interacting with an under file system.
#[derive(Debug, Error)]
pub enum UfsError {
    /// An I/O error occurred in the underlying medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested path does not exist.
    #[error("path not found: {0}")]
    NotFound(String),

    /// A fault armed on [`crate::memory::MemoryUfs`] fired.
    #[error("injected {op} failure on {path}")]
    Injected {
        /// The medium operation that failed.
        op: &'static str,
        /// The path the operation was applied to.
        path: String,
    },

    /// An internal lock was poisoned by a panicking thread.
    #[error("medium state lock poisoned")]
    Poisoned,
}

impl UfsError {
    /// Returns `true` if this error means the path was absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            UfsError::NotFound(_) => true,
            UfsError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convenience type alias for medium results.
pub type UfsResult<T> = Result<T, UfsError>;
