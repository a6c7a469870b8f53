//! Business log capture for the biz-log pipeline.
//!
//! [`BizLogManager`] turns calls into [`LogRecord`](bizlog_types::LogRecord)s
//! and dispatches them to storages, inline or on an [`ExecutorProvider`].
//! Storage failures are funneled to a single [`ErrorHandler`].
//! [`BizLogInterceptor`] wraps business operations so each call is recorded
//! from a [`BizLogDescriptor`], and [`BizLogBuilder`] wires everything from
//! [`BizLogConfig`](bizlog_common_config::BizLogConfig).

mod builder;
mod error_handler;
mod executor;
mod interceptor;
mod manager;

pub use builder::{BizLog, BizLogBuilder};
pub use error_handler::{DefaultErrorHandler, ErrorHandler, ERROR_KEY, HANDLER_KEY};
pub use executor::{DefaultExecutorProvider, ExecutorProvider, Task};
pub use interceptor::{BizLogDescriptor, BizLogInterceptor, ExtraValueSupplier};
pub use manager::{BizLogManager, DispatchCompletion, Dispatched, ACTION_CODE_KEY};

// Re-export types for convenience
pub use bizlog_types::{
    codes, registry, Action, BizLogError, LogRecord, MethodSignature, ParseContext, StdAction,
    ThrownError,
};
