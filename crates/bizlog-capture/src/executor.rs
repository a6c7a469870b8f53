//! Execution providers for asynchronous dispatch.

use bizlog_common_config::AsyncPoolConfig;
use bizlog_common_thread::{Dispatch, PoolConfig, PoolError, PoolStats, ShutdownReport, WorkerPool};
use bizlog_types::{BizLogError, LOG_TARGET};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Work-submission surface used for asynchronous dispatch.
pub trait ExecutorProvider: Send + Sync {
    /// Implementation name, for diagnostics.
    fn name(&self) -> &str;

    /// Run the task, now or later. Must not drop accepted work.
    fn execute(&self, task: Task) -> Result<(), BizLogError>;

    /// Stop accepting work and wait up to `timeout` for queued work.
    fn shutdown(&self, timeout: Duration);
}

/// Bounded worker pool; saturated submissions run on the caller's thread.
pub struct DefaultExecutorProvider {
    pool: WorkerPool,
    await_termination: Duration,
    report: Mutex<Option<ShutdownReport>>,
}

impl DefaultExecutorProvider {
    pub fn new(config: &AsyncPoolConfig) -> Result<Self, BizLogError> {
        let pool = WorkerPool::new(PoolConfig {
            core_size: config.core_pool_size,
            max_size: config.max_pool_size,
            queue_capacity: config.queue_capacity,
            thread_name_prefix: config.thread_name_prefix.clone(),
            ..PoolConfig::default()
        })
        .map_err(|e| BizLogError::Executor(e.to_string()))?;

        Ok(Self {
            pool,
            await_termination: config.await_termination(),
            report: Mutex::new(None),
        })
    }

    /// Shut down with the configured await-termination timeout.
    pub fn shutdown_default(&self) -> ShutdownReport {
        self.shutdown_with_report(self.await_termination)
    }

    /// Shut down and report how the drain went.
    ///
    /// Only the first call drains; later calls return the first report.
    pub fn shutdown_with_report(&self, timeout: Duration) -> ShutdownReport {
        let mut report = self.report.lock();
        if let Some(existing) = report.as_ref() {
            return existing.clone();
        }

        let result = self.pool.shutdown(timeout);
        if result.drained {
            info!(target: LOG_TARGET, "biz-log executor shut down");
        } else {
            warn!(
                target: LOG_TARGET,
                discarded = result.discarded,
                abandoned_workers = result.abandoned_workers,
                "biz-log executor did not drain before timeout"
            );
        }
        *report = Some(result.clone());
        result
    }

    pub fn is_shut_down(&self) -> bool {
        self.pool.is_shut_down()
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl ExecutorProvider for DefaultExecutorProvider {
    fn name(&self) -> &str {
        "DefaultExecutorProvider"
    }

    fn execute(&self, task: Task) -> Result<(), BizLogError> {
        match self.pool.submit(task) {
            Ok(Dispatch::CallerRan) => {
                debug!(target: LOG_TARGET, "executor saturated, ran task on caller thread");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(PoolError::ShutDown) => Err(BizLogError::Executor(
                "executor is shut down".to_string(),
            )),
            Err(e) => Err(BizLogError::Executor(e.to_string())),
        }
    }

    fn shutdown(&self, timeout: Duration) {
        self.shutdown_with_report(timeout);
    }
}

impl std::fmt::Debug for DefaultExecutorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultExecutorProvider")
            .field("config", self.pool.config())
            .field("await_termination", &self.await_termination)
            .finish()
    }
}
