//! In-process storage, mainly for tests and embedding.

use crate::LogStorage;
use bizlog_types::{BizLogError, LogRecord, ThrownError};
use parking_lot::Mutex;

/// Keeps records in a vector.
#[derive(Debug)]
pub struct MemoryStorage {
    name: String,
    store_on_error: bool,
    records: Mutex<Vec<LogRecord>>,
    handled: Mutex<Vec<ThrownError>>,
}

impl MemoryStorage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store_on_error: true,
            records: Mutex::new(Vec::new()),
            handled: Mutex::new(Vec::new()),
        }
    }

    /// Skip records whose operation failed.
    pub fn skip_on_error(mut self) -> Self {
        self.store_on_error = false;
        self
    }

    /// Copy of the stored records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Operation errors seen by [`LogStorage::handle_error`].
    pub fn handled_errors(&self) -> Vec<ThrownError> {
        self.handled.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().clear();
        self.handled.lock().clear();
    }
}

impl LogStorage for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn store(&self, record: &LogRecord) -> Result<(), BizLogError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn should_store_on_error(&self, _thrown: &ThrownError) -> bool {
        self.store_on_error
    }

    fn handle_error(&self, thrown: &ThrownError) {
        self.handled.lock().push(thrown.clone());
    }
}
