// SPDX-License-Identifier: PMPL-1.0-or-later
//! Journal configuration.
//!
//! Defaults:
//! - max_log_size_bytes: 10 MiB
//! - gc_enabled: true
//! - gc_period_ms: 120000 (two minutes)

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JournalError, JournalResult};

/// Default size at which a flushed log segment is rotated (10 MiB).
pub const DEFAULT_MAX_LOG_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default interval between garbage collection passes.
pub const DEFAULT_GC_PERIOD_MS: u64 = 120_000;

/// Configuration for a journal and its log writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConf {
    /// Once a segment holds at least this many bytes, the next flush
    /// schedules a rotation.
    pub max_log_size_bytes: u64,
    /// Whether the writer runs a background garbage collector.
    pub gc_enabled: bool,
    /// Milliseconds between garbage collection passes.
    pub gc_period_ms: u64,
}

impl Default for JournalConf {
    fn default() -> Self {
        Self {
            max_log_size_bytes: DEFAULT_MAX_LOG_SIZE_BYTES,
            gc_enabled: true,
            gc_period_ms: DEFAULT_GC_PERIOD_MS,
        }
    }
}

impl JournalConf {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> JournalResult<Self> {
        let conf: Self = serde_json::from_str(json)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> JournalResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject values the writer cannot operate with.
    pub fn validate(&self) -> JournalResult<()> {
        if self.max_log_size_bytes == 0 {
            return Err(JournalError::InvalidConfig(
                "max_log_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.gc_period_ms == 0 {
            return Err(JournalError::InvalidConfig(
                "gc_period_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between garbage collection passes.
    pub fn gc_period(&self) -> Duration {
        Duration::from_millis(self.gc_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let conf = JournalConf::default();
        assert_eq!(conf.max_log_size_bytes, 10 * 1024 * 1024);
        assert!(conf.gc_enabled);
        assert_eq!(conf.gc_period(), Duration::from_secs(120));
        conf.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let conf = JournalConf::from_json_str(r#"{"max_log_size_bytes": 4096}"#).unwrap();
        assert_eq!(conf.max_log_size_bytes, 4096);
        assert!(conf.gc_enabled);
        assert_eq!(conf.gc_period_ms, DEFAULT_GC_PERIOD_MS);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = JournalConf::from_json_str(r#"{"gc_period_ms": 0}"#).unwrap_err();
        assert!(matches!(err, JournalError::InvalidConfig(_)));

        let err = JournalConf::from_json_str(r#"{"max_log_size_bytes": 0}"#).unwrap_err();
        assert!(matches!(err, JournalError::InvalidConfig(_)));

        let err = JournalConf::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, JournalError::Config(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.json");
        std::fs::write(&path, r#"{"gc_enabled": false, "gc_period_ms": 50}"#).unwrap();

        let conf = JournalConf::from_path(&path).unwrap();
        assert!(!conf.gc_enabled);
        assert_eq!(conf.gc_period(), Duration::from_millis(50));

        let missing = JournalConf::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, JournalError::Io(_)));
    }
}
