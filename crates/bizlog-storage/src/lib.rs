//! Storage strategies for finalized log records.
//!
//! A [`LogStorage`] is a named sink. The [`StorageRouter`] resolves the
//! names a caller asks for (or the configured defaults) and fans each record
//! out to every resolved sink.

use bizlog_types::{BizLogError, LogRecord, ThrownError};

pub mod console;
pub mod file;
pub mod memory;
pub mod router;

pub use console::ConsoleStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use router::StorageRouter;

/// A named sink for log records.
///
/// Implementations must tolerate concurrent calls; records dispatched
/// asynchronously may reach the same sink from several threads at once.
pub trait LogStorage: Send + Sync {
    /// Registry name of this storage.
    fn name(&self) -> &str;

    /// Persist the record.
    fn store(&self, record: &LogRecord) -> Result<(), BizLogError>;

    /// Whether a record whose operation failed should still be stored.
    fn should_store_on_error(&self, _thrown: &ThrownError) -> bool {
        true
    }

    /// Observe the failure of the audited operation.
    fn handle_error(&self, _thrown: &ThrownError) {}

    /// Entry point used by the router.
    ///
    /// For a failed operation, [`handle_error`](Self::handle_error) always
    /// runs first and [`should_store_on_error`](Self::should_store_on_error)
    /// then decides whether [`store`](Self::store) runs at all.
    fn do_store(&self, record: &LogRecord) -> Result<(), BizLogError> {
        if let Some(thrown) = &record.thrown {
            self.handle_error(thrown);
            if !self.should_store_on_error(thrown) {
                return Ok(());
            }
        }
        self.store(record)
    }
}
