//! Thread management utilities.
//!
//! This crate provides the worker pool that backs asynchronous record dispatch:
//! - Core workers started eagerly, extra workers up to a maximum under load
//! - A bounded work queue
//! - Caller-runs saturation policy (work is never dropped while the pool is open)
//! - Graceful shutdown with a drain timeout
//! - Completion handles and panic capture

#![warn(missing_docs)]

pub mod completion;

pub use completion::{completion, Completer, Completion, CompletionError};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool sizing and naming.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Workers started with the pool and kept alive until shutdown.
    pub core_size: usize,
    /// Upper bound on live workers, including core workers.
    pub max_size: usize,
    /// Capacity of the work queue.
    pub queue_capacity: usize,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
    /// Idle time after which a non-core worker exits.
    pub keep_alive: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_size: 4,
            max_size: 8,
            queue_capacity: 200,
            thread_name_prefix: "pool-worker-".to_string(),
            keep_alive: Duration::from_secs(60),
        }
    }
}

/// Where a submitted task ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Placed on the work queue.
    Queued,
    /// Handed to a freshly spawned non-core worker.
    Spawned,
    /// Queue and workers were saturated; ran on the submitting thread.
    CallerRan,
}

/// Worker pool errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool no longer accepts work.
    #[error("worker pool is shut down")]
    ShutDown,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Sizing is inconsistent.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// All workers finished within the timeout.
    pub drained: bool,
    /// Queued tasks discarded after the timeout expired.
    pub discarded: usize,
    /// Workers still running when the timeout expired; they are detached.
    pub abandoned_workers: usize,
}

/// Counters describing pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks run to completion on workers.
    pub completed: u64,
    /// Tasks that panicked (on workers or the caller).
    pub panicked: u64,
    /// Tasks run on the submitting thread.
    pub caller_runs: u64,
    /// Workers currently alive.
    pub live_workers: usize,
    /// Tasks waiting in the queue.
    pub queued: usize,
}

struct WorkerShared {
    receiver: Receiver<Job>,
    live: Mutex<usize>,
    all_exited: Condvar,
    completed: AtomicU64,
    panicked: AtomicU64,
    caller_runs: AtomicU64,
    next_id: AtomicUsize,
}

impl WorkerShared {
    fn run(&self, job: Job) {
        match catch_panic(AssertUnwindSafe(job)) {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.panicked.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Holds a worker's live slot; released on exit, even on unwind.
struct LiveGuard {
    shared: Arc<WorkerShared>,
    counted: bool,
}

impl LiveGuard {
    /// Give up the slot of an idle non-core worker, unless work was queued
    /// meanwhile. Runs under the `live` lock, which `submit` also takes after
    /// queueing, so a queued task always sees either this worker or `live == 0`.
    fn retire_if_idle(&mut self) -> bool {
        let mut live = self.shared.live.lock();
        if !self.shared.receiver.is_empty() {
            return false;
        }
        release(&self.shared, &mut live);
        self.counted = false;
        true
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        if self.counted {
            let mut live = self.shared.live.lock();
            release(&self.shared, &mut live);
        }
    }
}

fn release(shared: &WorkerShared, live: &mut usize) {
    *live -= 1;
    if *live == 0 {
        shared.all_exited.notify_all();
    }
}

/// A bounded thread pool with caller-runs saturation.
pub struct WorkerPool {
    config: PoolConfig,
    sender: Mutex<Option<Sender<Job>>>,
    shared: Arc<WorkerShared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl WorkerPool {
    /// Create a pool and start its core workers.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.max_size == 0 {
            return Err(PoolError::InvalidConfig("max_size must be greater than 0".into()));
        }
        if config.max_size < config.core_size {
            return Err(PoolError::InvalidConfig(format!(
                "max_size ({}) must be >= core_size ({})",
                config.max_size, config.core_size
            )));
        }

        let (sender, receiver) = crossbeam_channel::bounded::<Job>(config.queue_capacity);
        let pool = Self {
            config,
            sender: Mutex::new(Some(sender)),
            shared: Arc::new(WorkerShared {
                receiver,
                live: Mutex::new(0),
                all_exited: Condvar::new(),
                completed: AtomicU64::new(0),
                panicked: AtomicU64::new(0),
                caller_runs: AtomicU64::new(0),
                next_id: AtomicUsize::new(0),
            }),
            handles: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        };

        for _ in 0..pool.config.core_size {
            *pool.shared.live.lock() += 1;
            pool.spawn_worker(None, true)?;
        }

        Ok(pool)
    }

    /// Submit a task.
    ///
    /// Tries the queue first, then a new non-core worker, and finally runs the
    /// task on the calling thread. Fails only once the pool is shut down.
    pub fn submit<F>(&self, f: F) -> Result<Dispatch, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock().clone().ok_or(PoolError::ShutDown)?;

        let job = match sender.try_send(Box::new(f)) {
            Ok(()) => {
                self.ensure_worker()?;
                return Ok(Dispatch::Queued);
            }
            Err(TrySendError::Disconnected(_)) => return Err(PoolError::ShutDown),
            Err(TrySendError::Full(job)) => job,
        };

        let reserved = {
            let mut live = self.shared.live.lock();
            if *live < self.config.max_size {
                *live += 1;
                true
            } else {
                false
            }
        };

        if reserved {
            self.spawn_worker(Some(job), false)?;
            return Ok(Dispatch::Spawned);
        }

        self.shared.caller_runs.fetch_add(1, Ordering::Relaxed);
        if catch_panic(AssertUnwindSafe(job)).is_err() {
            self.shared.panicked.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Dispatch::CallerRan)
    }

    /// Start a non-core worker when queued work has nobody to run it, which
    /// happens with `core_size == 0` or after idle workers retired.
    fn ensure_worker(&self) -> Result<(), PoolError> {
        {
            let mut live = self.shared.live.lock();
            if *live > 0 {
                return Ok(());
            }
            *live += 1;
        }
        self.spawn_worker(None, false)
    }

    /// Spawn a worker whose live slot has already been reserved.
    fn spawn_worker(&self, first: Option<Job>, core: bool) -> Result<(), PoolError> {
        let shared = self.shared.clone();
        let keep_alive = self.config.keep_alive;
        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}", self.config.thread_name_prefix, id);

        let spawned = thread::Builder::new().name(name).spawn(move || {
            let mut guard = LiveGuard {
                shared,
                counted: true,
            };
            if let Some(job) = first {
                guard.shared.run(job);
            }
            loop {
                if core {
                    match guard.shared.receiver.recv() {
                        Ok(job) => guard.shared.run(job),
                        Err(_) => break,
                    }
                } else {
                    match guard.shared.receiver.recv_timeout(keep_alive) {
                        Ok(job) => guard.shared.run(job),
                        Err(RecvTimeoutError::Timeout) => {
                            if guard.retire_if_idle() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }
        });

        match spawned {
            Ok(handle) => {
                self.handles.lock().push(handle);
                Ok(())
            }
            Err(e) => {
                let mut live = self.shared.live.lock();
                release(&self.shared, &mut live);
                Err(PoolError::Spawn(e))
            }
        }
    }

    /// Stop accepting work, wait up to `timeout` for queued and running tasks,
    /// then discard whatever is still queued.
    ///
    /// Calling this more than once is harmless; later calls report an empty drain.
    pub fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.shut_down.store(true, Ordering::SeqCst);
        // Dropping the only sender lets workers drain the queue and then exit.
        drop(self.sender.lock().take());

        let deadline = Instant::now() + timeout;
        let mut live = self.shared.live.lock();
        while *live > 0 {
            if self.shared.all_exited.wait_until(&mut live, deadline).timed_out() {
                break;
            }
        }
        let abandoned_workers = *live;
        drop(live);

        let mut discarded = 0;
        while self.shared.receiver.try_recv().is_ok() {
            discarded += 1;
        }

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        if abandoned_workers == 0 {
            for handle in handles {
                let _ = handle.join();
            }
        }

        ShutdownReport {
            drained: abandoned_workers == 0 && discarded == 0,
            discarded,
            abandoned_workers,
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Snapshot of pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.shared.completed.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
            caller_runs: self.shared.caller_runs.load(Ordering::Relaxed),
            live_workers: *self.shared.live.lock(),
            queued: self.shared.receiver.len(),
        }
    }

    /// Pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers exit once the queue drains; we don't join here to avoid blocking.
        drop(self.sender.lock().take());
    }
}

/// Catch panics and convert to Result.
pub fn catch_panic<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    std::panic::catch_unwind(f).map_err(|e| {
        if let Some(s) = e.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = e.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    })
}
