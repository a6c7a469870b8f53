//! JSON-lines file storage.

use crate::LogStorage;
use bizlog_common_config::{FileConfig, FILE_STORAGE_NAME};
use bizlog_types::{BizLogError, LogRecord, LOG_TARGET};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends one JSON object per record. Writes are serialized by a mutex.
#[derive(Debug)]
pub struct FileStorage {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStorage {
    /// Open (or create) the file for appending, creating parent directories.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, BizLogError> {
        let name = name.into();
        let path = path.as_ref().to_path_buf();
        let io_error = |e: std::io::Error| {
            BizLogError::storage_write(&name, format!("{}: {}", path.display(), e))
        };

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(io_error)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;

        debug!(target: LOG_TARGET, storage = %name, path = %path.display(), "opened file storage");
        Ok(Self {
            name,
            path,
            file: Mutex::new(file),
        })
    }

    /// Open the storage described by configuration, under [`FILE_STORAGE_NAME`].
    pub fn from_config(config: &FileConfig) -> Result<Self, BizLogError> {
        Self::open(FILE_STORAGE_NAME, &config.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStorage for FileStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn store(&self, record: &LogRecord) -> Result<(), BizLogError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| BizLogError::storage_write(&self.name, e.to_string()))?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BizLogError::storage_write(&self.name, e.to_string()))
    }
}
