// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tidemark Under File System Abstraction
//
// This crate provides the medium the Tidemark journal is written to. The
// `UnderFileSystem` trait is intentionally narrow (create, open, exists,
// delete, rename, list) because the journal must work over object stores
// that offer no atomic append and publish data only when a stream closes.
//
// # Modules
//
// - [`backend`] -- The `UnderFileSystem` and `UfsOutputStream` traits.
// - [`error`] -- The `UfsError` enum covering all medium failure modes.
// - [`local`] -- A `std::fs` backed medium.
// - [`memory`] -- An in-memory medium with object-store semantics and fault
//   injection, for tests and ephemeral journals.
// - [`metrics`] -- A transparent wrapper that counts medium operations.
//
// # Example
//
// ```rust
// use std::io::Write;
// use tidemark_ufs::{MemoryUfs, MeteredUfs, UnderFileSystem};
//
// let ufs = MeteredUfs::new(MemoryUfs::new());
// let mut stream = ufs.create("/journal/logs/0x0").unwrap();
// stream.write_all(b"payload").unwrap();
// stream.close().unwrap();
//
// assert!(ufs.exists("/journal/logs/0x0").unwrap());
// assert_eq!(ufs.stats().create_count, 1);
// ```

pub mod backend;
pub mod error;
pub mod local;
pub mod memory;
pub mod metrics;

// Re-export the most commonly used types at the crate root for convenience.
pub use backend::{file_name, join_path, UfsOutputStream, UnderFileSystem};
pub use error::{UfsError, UfsResult};
pub use local::LocalUfs;
pub use memory::{Fault, MemoryUfs, Unflushed};
pub use metrics::{MeteredUfs, UfsStats};
