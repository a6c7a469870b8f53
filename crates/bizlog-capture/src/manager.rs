//! Record assembly and the sync/async dispatch decision.

use crate::error_handler::ErrorHandler;
use crate::executor::ExecutorProvider;
use bizlog_common_log::spans::{dispatch_span, record_failure, Timer};
use bizlog_common_thread::{completion, Completion};
use bizlog_parse::{CompositeParser, TemplateParser};
use bizlog_storage::StorageRouter;
use bizlog_types::{registry, BizLogError, LogRecord, ParseContext, LOG_TARGET};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Extra key carrying the action code on the template path. Never stored.
pub const ACTION_CODE_KEY: &str = "actionCode";

/// Pending result of an asynchronous dispatch.
pub type DispatchCompletion = Completion<Result<(), BizLogError>>;

/// How a record was dispatched.
#[derive(Debug)]
pub enum Dispatched {
    /// Stored (or handled) before returning.
    Sync,
    /// Handed to the executor; the completion yields the final outcome,
    /// after the error handler has run.
    Async(DispatchCompletion),
}

impl Dispatched {
    /// Block until the dispatch finished. Sync dispatches return immediately.
    pub fn wait(self) -> Result<(), BizLogError> {
        match self {
            Self::Sync => Ok(()),
            Self::Async(done) => done
                .wait()
                .map_err(|e| BizLogError::Executor(e.to_string()))?,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

/// Builds records and routes them to storages, inline or on the executor.
pub struct BizLogManager {
    router: Arc<StorageRouter>,
    parser: Arc<CompositeParser>,
    executor: Arc<dyn ExecutorProvider>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl BizLogManager {
    pub fn new(
        router: StorageRouter,
        parser: CompositeParser,
        executor: Arc<dyn ExecutorProvider>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        let manager = Self {
            router: Arc::new(router),
            parser: Arc::new(parser),
            executor,
            error_handler,
        };
        info!(
            target: LOG_TARGET,
            default_storage = ?manager.router.default_names(),
            storages = ?manager.router.names(),
            parsers = ?manager.parser.chain(),
            executor = manager.executor.name(),
            error_handler = manager.error_handler.name(),
            "biz-log manager ready"
        );
        manager
    }

    pub fn router(&self) -> &StorageRouter {
        &self.router
    }

    pub fn parser(&self) -> &CompositeParser {
        &self.parser
    }

    pub fn executor(&self) -> &Arc<dyn ExecutorProvider> {
        &self.executor
    }

    pub fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.error_handler
    }

    /// Store a finished record inline. Failures go straight to the caller.
    pub fn record<S: AsRef<str>>(&self, record: &LogRecord, names: &[S]) -> Result<(), BizLogError> {
        self.router.store(record, names)
    }

    /// Store a finished record on the executor. Failures are reported through
    /// the completion only; the error handler is not involved.
    pub fn record_async<S: AsRef<str>>(
        &self,
        record: LogRecord,
        names: &[S],
    ) -> Result<DispatchCompletion, BizLogError> {
        let names = owned_names(names);
        let router = Arc::clone(&self.router);
        let (completer, done) = completion();

        self.executor.execute(Box::new(move || {
            completer.complete(router.store(&record, names.as_slice()));
        }))?;
        Ok(done)
    }

    /// Build a record from a registered action code and dispatch it.
    pub fn record_action<S: AsRef<str>>(
        &self,
        code: &str,
        content: impl Into<String>,
        asynchronous: bool,
        extra: Option<IndexMap<String, Value>>,
        names: &[S],
    ) -> Result<Dispatched, BizLogError> {
        let action = registry::of(code)?;
        let record = LogRecord::builder(action)
            .content(content)
            .extras(extra.unwrap_or_default())
            .build();
        self.record_choose(record, asynchronous, names)
    }

    /// Render a template against a capture context and dispatch the result.
    ///
    /// The action code is read from the `actionCode` extra. Other string
    /// extras are rendered through the same parser chain.
    pub fn record_template<S: AsRef<str>>(
        &self,
        template: &str,
        ctx: &ParseContext,
        asynchronous: bool,
        names: &[S],
    ) -> Result<Dispatched, BizLogError> {
        let code = ctx
            .extra()
            .get(ACTION_CODE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BizLogError::PipelineMisuse(format!(
                    "template records need a string '{}' extra",
                    ACTION_CODE_KEY
                ))
            })?;
        let action = registry::of(code)?;

        let content = self.parser.parse(template, ctx)?;
        let mut extra = IndexMap::with_capacity(ctx.extra().len());
        for (key, value) in ctx.extra() {
            if key == ACTION_CODE_KEY {
                continue;
            }
            let value = match value {
                Value::String(text) => Value::String(self.parser.parse(text, ctx)?),
                other => other.clone(),
            };
            extra.insert(key.clone(), value);
        }

        let record = LogRecord::builder(action)
            .content(content)
            .thrown(ctx.thrown().cloned())
            .extras(extra)
            .build();
        self.record_choose(record, asynchronous, names)
    }

    /// Dispatch a record, routing any storage failure to the error handler
    /// exactly once.
    ///
    /// On the sync path the handler's own error is returned to the caller.
    /// On the async path it is logged on the pool thread and delivered
    /// through the completion.
    pub fn record_choose<S: AsRef<str>>(
        &self,
        record: LogRecord,
        asynchronous: bool,
        names: &[S],
    ) -> Result<Dispatched, BizLogError> {
        if asynchronous {
            return self.dispatch_async(record, owned_names(names));
        }

        let span = dispatch_span(record.action.code(), "sync").entered();
        let timer = Timer::start("dispatch_sync");
        let result = match self.router.store(&record, names) {
            Ok(()) => Ok(Dispatched::Sync),
            Err(e) => {
                record_failure(&span, &e);
                debug!(target: LOG_TARGET, record = %record.id, error = %e, "handing failure to error handler");
                self.error_handler
                    .on_error(record, e)
                    .map(|()| Dispatched::Sync)
            }
        };
        timer.finish();
        result
    }

    fn dispatch_async(
        &self,
        record: LogRecord,
        names: Vec<String>,
    ) -> Result<Dispatched, BizLogError> {
        let span = dispatch_span(record.action.code(), "async");
        let router = Arc::clone(&self.router);
        let handler = Arc::clone(&self.error_handler);
        let (completer, done) = completion();

        self.executor.execute(Box::new(move || {
            let _entered = span.enter();
            let timer = Timer::start("dispatch_async");
            let id = record.id;
            let result = match router.store(&record, names.as_slice()) {
                Ok(()) => Ok(()),
                Err(e) => handler.on_error(record, e),
            };
            if let Err(e) = &result {
                record_failure(&span, e);
                error!(
                    target: LOG_TARGET,
                    record = %id,
                    handler = handler.name(),
                    error = %e,
                    "async log dispatch failed"
                );
            }
            timer.finish();
            completer.complete(result);
        }))?;

        Ok(Dispatched::Async(done))
    }
}

fn owned_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| n.as_ref().to_string()).collect()
}

impl std::fmt::Debug for BizLogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BizLogManager")
            .field("router", &self.router)
            .field("parser", &self.parser)
            .field("executor", &self.executor.name())
            .field("error_handler", &self.error_handler.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::DefaultErrorHandler;
    use crate::executor::Task;
    use bizlog_common_config::ParserConfig;
    use bizlog_storage::{LogStorage, MemoryStorage};
    use bizlog_types::{codes, MethodSignature, ThrownError};
    use parking_lot::Mutex;
    use std::time::Duration;
    use test_case::test_case;

    /// Runs every task on the submitting thread.
    struct Inline;

    impl ExecutorProvider for Inline {
        fn name(&self) -> &str {
            "Inline"
        }

        fn execute(&self, task: Task) -> Result<(), BizLogError> {
            task();
            Ok(())
        }

        fn shutdown(&self, _timeout: Duration) {}
    }

    /// Counts invocations and swallows the failure.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<(LogRecord, String)>>,
    }

    impl ErrorHandler for Recording {
        fn name(&self) -> &str {
            "Recording"
        }

        fn on_error(&self, record: LogRecord, error: BizLogError) -> Result<(), BizLogError> {
            self.seen.lock().push((record, error.to_string()));
            Ok(())
        }
    }

    struct Down;

    impl LogStorage for Down {
        fn name(&self) -> &str {
            "down"
        }

        fn store(&self, _record: &LogRecord) -> Result<(), BizLogError> {
            Err(BizLogError::storage_write("down", "unreachable"))
        }
    }

    fn manager(handler: Arc<dyn ErrorHandler>) -> (Arc<MemoryStorage>, BizLogManager) {
        let console = Arc::new(MemoryStorage::new("console"));
        let router = StorageRouter::new(
            vec![console.clone() as Arc<dyn LogStorage>, Arc::new(Down)],
            vec!["console".to_string()],
        )
        .unwrap();
        let parser = CompositeParser::from_config(&ParserConfig::default(), None, Vec::new()).unwrap();
        (console, BizLogManager::new(router, parser, Arc::new(Inline), handler))
    }

    fn ctx(extra_code: Option<&str>) -> ParseContext {
        let mut builder = ParseContext::builder(MethodSignature::new("user_service", "delete"))
            .arg("id", 42)
            .ret(true)
            .extra("operator", "#{#id} by admin")
            .extra("count", 1);
        if let Some(code) = extra_code {
            builder = builder.extra(ACTION_CODE_KEY, code);
        }
        builder.build()
    }

    #[test]
    fn test_record_action_sync() {
        let (console, manager) = manager(Arc::new(Recording::default()));
        let dispatched = manager
            .record_action::<&str>(codes::DELETE, "user 42 removed", false, None, &[])
            .unwrap();

        assert!(!dispatched.is_async());
        let records = console.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action.code(), "DELETE");
        assert_eq!(records[0].content, "user 42 removed");
        assert!(records[0].thrown.is_none());
    }

    #[test_case(false ; "sync")]
    #[test_case(true ; "async")]
    fn test_record_action_keeps_extras(asynchronous: bool) {
        let (console, manager) = manager(Arc::new(Recording::default()));
        let mut extra = IndexMap::new();
        extra.insert("operator".to_string(), Value::from("ann"));
        extra.insert("ip".to_string(), Value::from("10.0.0.8"));

        let dispatched = manager
            .record_action(codes::LOGIN, "signed in", asynchronous, Some(extra), &["console"])
            .unwrap();
        assert_eq!(dispatched.is_async(), asynchronous);
        dispatched.wait().unwrap();

        let record = &console.records()[0];
        let keys: Vec<&str> = record.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["operator", "ip"]);
    }

    #[test]
    fn test_unregistered_code_is_raised_before_dispatch() {
        let handler = Arc::new(Recording::default());
        let (console, manager) = manager(handler.clone());
        for asynchronous in [false, true] {
            let result = manager.record_action::<&str>("NO_SUCH_ACTION", "x", asynchronous, None, &[]);
            assert!(matches!(result, Err(BizLogError::NotRegistered { .. })));
        }
        assert!(console.is_empty());
        assert!(handler.seen.lock().is_empty());
    }

    #[test]
    fn test_record_template_renders_content_and_extras() {
        let (console, manager) = manager(Arc::new(Recording::default()));
        manager
            .record_template::<&str>("deleted user #{#id}: #{#ret}", &ctx(Some("DELETE")), false, &[])
            .unwrap();

        let record = &console.records()[0];
        assert_eq!(record.action.code(), "DELETE");
        assert_eq!(record.content, "deleted user 42: true");
        assert_eq!(record.extra["operator"], "42 by admin");
        assert_eq!(record.extra["count"], 1);
        assert!(!record.extra.contains_key(ACTION_CODE_KEY));
    }

    #[test]
    fn test_record_template_requires_action_code() {
        let (console, manager) = manager(Arc::new(Recording::default()));
        let result = manager.record_template::<&str>("x", &ctx(None), false, &[]);
        assert!(matches!(result, Err(BizLogError::PipelineMisuse(_))));
        assert!(console.is_empty());
    }

    #[test]
    fn test_record_template_carries_thrown_error() {
        let (console, manager) = manager(Arc::new(Recording::default()));
        let ctx = ParseContext::builder(MethodSignature::new("svc", "m"))
            .thrown(Some(ThrownError::new("NotFound", "no user 7")))
            .extra(ACTION_CODE_KEY, "QUERY")
            .build();
        manager
            .record_template::<&str>("failed: #{#ex.message}", &ctx, false, &[])
            .unwrap();

        let record = &console.records()[0];
        assert_eq!(record.content, "failed: no user 7");
        assert_eq!(record.thrown.as_ref().unwrap().kind, "NotFound");
        assert_eq!(console.handled_errors().len(), 1);
    }

    #[test]
    fn test_sync_failure_with_default_handler_is_raised() {
        let fallback = Arc::new(MemoryStorage::new("fallback"));
        let (_, manager) = manager(Arc::new(DefaultErrorHandler::new(fallback.clone())));
        let result = manager.record_action(codes::UPDATE, "x", false, None, &["down"]);

        match result {
            Err(BizLogError::Handled { source, .. }) => {
                assert!(matches!(*source, BizLogError::StorageWrite { .. }))
            }
            other => panic!("expected Handled, got {:?}", other),
        }
        assert_eq!(fallback.len(), 1);
    }

    #[test]
    fn test_failures_reach_handler_once_on_both_paths() {
        let handler = Arc::new(Recording::default());
        let (console, manager) = manager(handler.clone());

        manager
            .record_action(codes::EXPORT, "sync", false, None, &["console", "down"])
            .unwrap();
        manager
            .record_action(codes::EXPORT, "async", true, None, &["down", "console"])
            .unwrap()
            .wait()
            .unwrap();

        let seen = handler.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0.content, "sync");
        assert_eq!(seen[1].0.content, "async");
        assert!(seen[1].1.contains("unreachable"));
        assert_eq!(console.len(), 2);
    }

    #[test]
    fn test_unknown_target_goes_to_handler() {
        let handler = Arc::new(Recording::default());
        let (console, manager) = manager(handler.clone());
        manager
            .record_action(codes::LOGIN, "x", false, None, &["console", "missing"])
            .unwrap();

        assert!(console.is_empty());
        assert!(handler.seen.lock()[0].1.contains("missing"));
    }

    #[test]
    fn test_record_and_record_async_skip_handler() {
        let handler = Arc::new(Recording::default());
        let (console, manager) = manager(handler.clone());
        let record = LogRecord::new(registry::of(codes::CREATE).unwrap(), "direct");

        assert!(manager.record(&record, &["down"]).is_err());
        let done = manager.record_async(record, &["console"]).unwrap();
        assert!(done.wait().unwrap().is_ok());

        assert_eq!(console.len(), 1);
        assert!(handler.seen.lock().is_empty());
    }
}
