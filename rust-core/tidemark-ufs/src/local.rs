// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local filesystem medium for Tidemark.
//
// Maps journal paths directly onto `std::fs`. Streams are buffered and
// `flush` forces the buffer to stable storage with `sync_data`, so this
// medium supports incremental flush.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::backend::{UfsOutputStream, UnderFileSystem};
use crate::error::{UfsError, UfsResult};

/// An under file system backed by the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalUfs;

impl LocalUfs {
    /// Create a new local filesystem medium.
    pub fn new() -> Self {
        Self
    }
}

impl UnderFileSystem for LocalUfs {
    fn create(&self, path: &str) -> UfsResult<Box<dyn UfsOutputStream>> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        debug!(path, "Created local file");
        Ok(Box::new(LocalOutputStream {
            writer: Some(BufWriter::new(file)),
        }))
    }

    fn open(&self, path: &str) -> UfsResult<Box<dyn Read + Send>> {
        match File::open(path) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(UfsError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, path: &str) -> UfsResult<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_file(&self, path: &str) -> UfsResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(UfsError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn rename_file(&self, src: &str, dst: &str) -> UfsResult<()> {
        match fs::rename(src, dst) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(UfsError::NotFound(src.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self, dir: &str) -> UfsResult<Vec<String>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn mkdirs(&self, dir: &str) -> UfsResult<()> {
        fs::create_dir_all(dir)?;
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// A buffered write handle to a local file.
#[derive(Debug)]
struct LocalOutputStream {
    /// `None` once the stream has been closed.
    writer: Option<BufWriter<File>>,
}

impl LocalOutputStream {
    fn writer(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stream already closed")
        })
    }
}

impl Write for LocalOutputStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let writer = self.writer()?;
        writer.flush()?;
        writer.get_ref().sync_data()
    }
}

impl UfsOutputStream for LocalOutputStream {
    fn close(&mut self) -> std::io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::join_path;
    use tempfile::TempDir;

    fn root(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_create_write_read() {
        let dir = TempDir::new().unwrap();
        let ufs = LocalUfs::new();
        let path = join_path(&root(&dir), "nested/file");

        let mut stream = ufs.create(&path).unwrap();
        stream.write_all(b"hello").unwrap();
        stream.flush().unwrap();
        stream.close().unwrap();
        // Closing twice is allowed.
        stream.close().unwrap();

        let mut contents = Vec::new();
        ufs.open(&path).unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"hello");
        assert!(ufs.exists(&path).unwrap());
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let ufs = LocalUfs::new();
        let mut stream = ufs.create(&join_path(&root(&dir), "f")).unwrap();
        stream.close().unwrap();
        assert!(stream.write_all(b"x").is_err());
    }

    #[test]
    fn test_rename_and_delete() {
        let dir = TempDir::new().unwrap();
        let ufs = LocalUfs::new();
        let src = join_path(&root(&dir), "src");
        let dst = join_path(&root(&dir), "dst");

        ufs.create(&src).unwrap().close().unwrap();
        ufs.rename_file(&src, &dst).unwrap();
        assert!(!ufs.exists(&src).unwrap());
        assert!(ufs.exists(&dst).unwrap());

        ufs.delete_file(&dst).unwrap();
        assert!(!ufs.exists(&dst).unwrap());
        assert!(ufs.delete_file(&dst).unwrap_err().is_not_found());
        assert!(ufs.rename_file(&src, &dst).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_sorted_and_missing_dir() {
        let dir = TempDir::new().unwrap();
        let ufs = LocalUfs::new();
        let logs = join_path(&root(&dir), "logs");

        assert!(ufs.list(&logs).unwrap().is_empty());

        ufs.mkdirs(&logs).unwrap();
        for name in ["b", "a", "c"] {
            ufs.create(&join_path(&logs, name)).unwrap().close().unwrap();
        }
        ufs.mkdirs(&join_path(&logs, "subdir")).unwrap();

        assert_eq!(ufs.list(&logs).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_open_missing() {
        let dir = TempDir::new().unwrap();
        let ufs = LocalUfs::new();
        let err = ufs.open(&join_path(&root(&dir), "missing")).err().unwrap();
        assert!(err.is_not_found());
    }
}
