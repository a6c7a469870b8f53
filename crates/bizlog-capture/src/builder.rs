//! Wiring the pipeline from configuration.

use crate::error_handler::{DefaultErrorHandler, ErrorHandler};
use crate::executor::{DefaultExecutorProvider, ExecutorProvider};
use crate::interceptor::{BizLogInterceptor, ExtraValueSupplier};
use crate::manager::BizLogManager;
use bizlog_common_config::{validate, BizLogConfig, DEFAULT_STORAGE_NAME, FILE_STORAGE_NAME};
use bizlog_parse::{
    CompositeParser, ComponentResolver, ExpressionParser, ScopeExtension, TemplateParser,
};
use bizlog_storage::{ConsoleStorage, FileStorage, LogStorage, StorageRouter};
use bizlog_types::{BizLogError, LOG_TARGET};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Assembles a [`BizLog`] from configuration plus caller-supplied parts.
///
/// Anything not supplied falls back to the default implementation: a console
/// storage under `console`, a file storage when enabled, the bounded worker
/// pool and [`DefaultErrorHandler`].
pub struct BizLogBuilder {
    config: BizLogConfig,
    storages: Vec<Arc<dyn LogStorage>>,
    parsers: Vec<Arc<dyn TemplateParser>>,
    extensions: Vec<Arc<dyn ScopeExtension>>,
    components: Option<Arc<dyn ComponentResolver>>,
    executor: Option<Arc<dyn ExecutorProvider>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    supplier: Option<Arc<dyn ExtraValueSupplier>>,
}

impl BizLogBuilder {
    pub fn new(config: BizLogConfig) -> Self {
        Self {
            config,
            storages: Vec::new(),
            parsers: Vec::new(),
            extensions: Vec::new(),
            components: None,
            executor: None,
            error_handler: None,
            supplier: None,
        }
    }

    /// Register a storage under its own name. A storage named `console`
    /// replaces the built-in console storage.
    pub fn storage(mut self, storage: Arc<dyn LogStorage>) -> Self {
        self.storages.push(storage);
        self
    }

    /// Add a parser to the chain, ordered by its priority.
    pub fn parser(mut self, parser: Arc<dyn TemplateParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn scope_extension(mut self, extension: Arc<dyn ScopeExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn components(mut self, resolver: Arc<dyn ComponentResolver>) -> Self {
        self.components = Some(resolver);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn ExecutorProvider>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn extra_supplier(mut self, supplier: Arc<dyn ExtraValueSupplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn build(self) -> Result<BizLog, BizLogError> {
        let config = self.config;
        validate(&config).map_err(|e| BizLogError::PipelineMisuse(e.to_string()))?;

        let mut storages = self.storages;
        let has = |storages: &[Arc<dyn LogStorage>], name: &str| {
            storages.iter().any(|s| s.name() == name)
        };
        if !has(&storages, DEFAULT_STORAGE_NAME) {
            storages.push(Arc::new(ConsoleStorage::new(config.console.level)));
        }
        if config.file.enabled && !has(&storages, FILE_STORAGE_NAME) {
            storages.push(Arc::new(FileStorage::from_config(&config.file)?));
        }
        let router = StorageRouter::new(storages, config.storage_names.clone())?;

        let expression = if config.parser.expression.enabled {
            let mut parser = ExpressionParser::from_config(&config.parser.expression)?;
            for extension in self.extensions {
                parser = parser.with_extension(extension);
            }
            if let Some(resolver) = self.components {
                parser = parser.with_components(resolver);
            }
            Some(parser)
        } else {
            None
        };
        let parser = CompositeParser::from_config(&config.parser, expression, self.parsers)?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(DefaultExecutorProvider::new(&config.async_pool)?),
        };
        let error_handler = self.error_handler.unwrap_or_else(|| {
            Arc::new(DefaultErrorHandler::new(Arc::new(ConsoleStorage::new(
                config.console.level,
            ))))
        });

        let manager = Arc::new(BizLogManager::new(router, parser, executor, error_handler));
        let mut interceptor = BizLogInterceptor::new(Arc::clone(&manager), config.enabled);
        if let Some(supplier) = self.supplier {
            interceptor = interceptor.with_supplier(supplier);
        }

        debug!(target: LOG_TARGET, enabled = config.enabled, "biz-log pipeline built");
        Ok(BizLog {
            manager,
            interceptor,
            await_termination: config.async_pool.await_termination(),
        })
    }
}

/// A wired pipeline: the manager, its interceptor and executor lifecycle.
#[derive(Debug)]
pub struct BizLog {
    manager: Arc<BizLogManager>,
    interceptor: BizLogInterceptor,
    await_termination: Duration,
}

impl BizLog {
    pub fn builder(config: BizLogConfig) -> BizLogBuilder {
        BizLogBuilder::new(config)
    }

    pub fn manager(&self) -> &Arc<BizLogManager> {
        &self.manager
    }

    pub fn interceptor(&self) -> &BizLogInterceptor {
        &self.interceptor
    }

    /// Drain the executor, waiting up to the configured termination timeout.
    pub fn shutdown(&self) {
        self.shutdown_timeout(self.await_termination);
    }

    pub fn shutdown_timeout(&self, timeout: Duration) {
        self.manager.executor().shutdown(timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizlog_storage::MemoryStorage;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_register_console() {
        let biz_log = BizLog::builder(BizLogConfig::default()).build().unwrap();
        let manager = biz_log.manager();

        assert_eq!(manager.router().names(), vec!["console"]);
        assert_eq!(manager.executor().name(), "DefaultExecutorProvider");
        assert_eq!(manager.error_handler().name(), "DefaultErrorHandler");
        assert_eq!(
            manager.parser().chain(),
            vec!["ExpressionParser", "PlainTextParser"]
        );
        biz_log.shutdown();
    }

    #[test]
    fn test_supplied_console_replaces_builtin() {
        let console = Arc::new(MemoryStorage::new("console"));
        let biz_log = BizLog::builder(BizLogConfig::default())
            .storage(console.clone())
            .build()
            .unwrap();

        biz_log
            .manager()
            .record_action::<&str>("LOGIN", "ann signed in", false, None, &[])
            .unwrap();
        assert_eq!(console.len(), 1);
        biz_log.shutdown();
    }

    #[test]
    fn test_file_storage_when_enabled() {
        let dir = tempdir().unwrap();
        let mut config = BizLogConfig::default();
        config.file.enabled = true;
        config.file.path = dir.path().join("biz.jsonl");

        let biz_log = BizLog::builder(config).build().unwrap();
        assert_eq!(biz_log.manager().router().names(), vec!["console", "file"]);
        biz_log
            .manager()
            .record_action("EXPORT", "report", false, None, &["file"])
            .unwrap();
        biz_log.shutdown();

        let written = std::fs::read_to_string(dir.path().join("biz.jsonl")).unwrap();
        assert_eq!(written.lines().count(), 1);
    }

    #[test]
    fn test_invalid_config_is_misuse() {
        let mut config = BizLogConfig::default();
        config.storage_names.clear();
        assert!(matches!(
            BizLog::builder(config).build(),
            Err(BizLogError::PipelineMisuse(_))
        ));

        let mut config = BizLogConfig::default();
        config.storage_names = vec!["audit".to_string()];
        assert!(matches!(
            BizLog::builder(config).build(),
            Err(BizLogError::PipelineMisuse(_))
        ));
    }

    #[test]
    fn test_disabled_expression_parser() {
        let mut config = BizLogConfig::default();
        config.parser.expression.enabled = false;
        let biz_log = BizLog::builder(config).build().unwrap();
        assert_eq!(biz_log.manager().parser().chain(), vec!["PlainTextParser"]);
        biz_log.shutdown();
    }
}
