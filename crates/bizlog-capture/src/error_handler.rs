//! Error handlers: the single choke point for failed dispatches.

use bizlog_storage::LogStorage;
use bizlog_types::{BizLogError, LogRecord, LOG_TARGET};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

/// Extra key holding the failure message on an annotated record.
pub const ERROR_KEY: &str = "error";
/// Extra key naming the handler that annotated the record.
pub const HANDLER_KEY: &str = "异常处理器";

/// Receives each failed dispatch exactly once.
pub trait ErrorHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Handle the failure of `record`. An `Err` is raised to synchronous
    /// callers; on the async path it is logged on the pool thread.
    fn on_error(&self, record: LogRecord, error: BizLogError) -> Result<(), BizLogError>;
}

/// Writes an annotated copy of the record to a fallback storage, then
/// raises [`BizLogError::Handled`].
pub struct DefaultErrorHandler {
    fallback: Arc<dyn LogStorage>,
}

impl DefaultErrorHandler {
    pub const NAME: &'static str = "DefaultErrorHandler";

    pub fn new(fallback: Arc<dyn LogStorage>) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> &Arc<dyn LogStorage> {
        &self.fallback
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_error(&self, mut record: LogRecord, error: BizLogError) -> Result<(), BizLogError> {
        let mut extra = IndexMap::with_capacity(2);
        extra.insert(ERROR_KEY.to_string(), Value::String(error.to_string()));
        extra.insert(HANDLER_KEY.to_string(), Value::String(Self::NAME.to_string()));
        record.extra = extra;

        if let Err(e) = self.fallback.do_store(&record) {
            error!(
                target: LOG_TARGET,
                storage = self.fallback.name(),
                error = %e,
                "fallback storage failed while handling a log failure"
            );
        }

        Err(BizLogError::Handled {
            handler: Self::NAME.to_string(),
            source: Box::new(error),
        })
    }
}

impl std::fmt::Debug for DefaultErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultErrorHandler")
            .field("fallback", &self.fallback.name())
            .finish()
    }
}
