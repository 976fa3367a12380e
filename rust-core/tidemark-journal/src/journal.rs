// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Journal handle
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A `UfsJournal` bundles the medium, the journal's root location and its
// configuration. It is cheap to clone: the log writer and its garbage
// collector each hold their own copy and share the medium through an `Arc`.

use std::sync::Arc;

use tidemark_ufs::{join_path, UfsError, UnderFileSystem};
use tracing::info;

use crate::config::JournalConf;
use crate::error::{JournalError, JournalResult};
use crate::file::{CHECKPOINT_DIRNAME, LOG_DIRNAME};

/// A journal rooted at a location on an under file system.
#[derive(Debug, Clone)]
pub struct UfsJournal {
    ufs: Arc<dyn UnderFileSystem>,
    location: String,
    conf: JournalConf,
}

impl UfsJournal {
    /// A journal at `location` with the default configuration.
    pub fn new(ufs: impl UnderFileSystem + 'static, location: impl Into<String>) -> Self {
        Self::with_conf(Arc::new(ufs), location, JournalConf::default())
    }

    /// A journal at `location` sharing `ufs`, with an explicit configuration.
    pub fn with_conf(
        ufs: Arc<dyn UnderFileSystem>,
        location: impl Into<String>,
        conf: JournalConf,
    ) -> Self {
        let location = location.into();
        let location = match location.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            ufs,
            location,
            conf,
        }
    }

    /// The medium this journal lives on.
    pub fn ufs(&self) -> &Arc<dyn UnderFileSystem> {
        &self.ufs
    }

    /// The journal's root location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The journal's configuration.
    pub fn conf(&self) -> &JournalConf {
        &self.conf
    }

    /// Directory holding log segments.
    pub fn log_dir(&self) -> String {
        join_path(&self.location, LOG_DIRNAME)
    }

    /// Directory holding checkpoints.
    pub fn checkpoint_dir(&self) -> String {
        join_path(&self.location, CHECKPOINT_DIRNAME)
    }

    /// Whether any log segment or checkpoint exists.
    pub fn is_formatted(&self) -> JournalResult<bool> {
        for dir in [self.log_dir(), self.checkpoint_dir()] {
            let names = self
                .ufs
                .list(&dir)
                .map_err(|source| JournalError::ufs(&dir, source))?;
            if !names.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Delete every log segment and checkpoint, then recreate the empty
    /// directories.
    pub fn format(&self) -> JournalResult<()> {
        let mut deleted = 0usize;
        for dir in [self.log_dir(), self.checkpoint_dir()] {
            let names = self
                .ufs
                .list(&dir)
                .map_err(|source| JournalError::ufs(&dir, source))?;
            for name in names {
                let path = join_path(&dir, &name);
                match self.ufs.delete_file(&path) {
                    Ok(()) => deleted += 1,
                    Err(UfsError::NotFound(_)) => {}
                    Err(source) => return Err(JournalError::ufs(path, source)),
                }
            }
            self.ufs
                .mkdirs(&dir)
                .map_err(|source| JournalError::ufs(&dir, source))?;
        }
        info!(
            journal = %self.location,
            ufs = self.ufs.name(),
            deleted,
            "Formatted journal"
        );
        Ok(())
    }
}
