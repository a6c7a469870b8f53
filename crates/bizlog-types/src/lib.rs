//! Core types for the biz-log pipeline.

mod action;
mod context;
mod error;
mod id;
mod record;
pub mod registry;

pub use action::{codes, Action, StdAction};
pub use context::{MethodSignature, ParseContext, ParseContextBuilder, ThrownError};
pub use error::{BizLogError, Result};
pub use id::RecordId;
pub use record::{LogRecord, LogRecordBuilder};

/// Tracing target for pipeline events.
pub const LOG_TARGET: &str = "biz-log";
