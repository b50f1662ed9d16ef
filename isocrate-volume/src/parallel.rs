//! Worker pool and main-thread operation queue for the march scheduler
//!
//! The pool wraps a long-lived rayon pool sized to the machine. Jobs are
//! fire-and-forget closures whose result comes back over a channel, so the
//! caller can block on them or hand the handles to another job.

use isocrate_core::{Error, Result};
use log::{error, info};
use rayon::ThreadPoolBuilder;
use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Mutex, PoisonError};

/// Thread pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPoolConfig {
    /// Number of threads to use (None = hardware concurrency)
    pub num_threads: Option<usize>,
    /// Thread stack size in bytes
    pub stack_size: Option<usize>,
    /// Thread name prefix
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(8 * 1024 * 1024), // 8MB stack
            thread_name_prefix: "isocrate-march".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    /// Set number of threads
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set stack size
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Set thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Fixed-size worker pool
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool").field("size", &self.size).finish()
    }
}

impl ThreadPool {
    /// Spin up the worker threads
    pub fn new(config: ThreadPoolConfig) -> Result<Self> {
        let size = config.num_threads.unwrap_or_else(num_cpus::get);
        if size == 0 {
            return Err(Error::InvalidConfiguration(
                "thread pool needs at least one thread".to_string(),
            ));
        }

        let mut builder = ThreadPoolBuilder::new()
            .num_threads(size)
            .panic_handler(|_| error!("march job panicked"));

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        if !config.thread_name_prefix.is_empty() {
            let prefix = config.thread_name_prefix.clone();
            builder = builder.thread_name(move |index| format!("{}-{}", prefix, index));
        }

        let pool = builder
            .build()
            .map_err(|e| Error::ThreadPool(format!("Failed to create thread pool: {}", e)))?;

        info!("started thread pool with {} threads", size);
        Ok(Self { pool, size })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on a worker thread
    ///
    /// Jobs start in submission order once a worker is free.
    pub fn enqueue<F, R>(&self, job: F) -> JobHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.pool.spawn_fifo(move || {
            // the handle may already be gone
            let _ = sender.send(job());
        });
        JobHandle { receiver }
    }
}

/// Result of an enqueued job
#[derive(Debug)]
pub struct JobHandle<R> {
    receiver: Receiver<R>,
}

impl<R> JobHandle<R> {
    /// Block until the job finishes
    ///
    /// Fails if the job panicked before producing a result.
    pub fn wait(self) -> Result<R> {
        self.receiver
            .recv()
            .map_err(|_| Error::ThreadPool("job ended without a result".to_string()))
    }
}

type Operation = Box<dyn FnOnce() + Send + 'static>;

/// Closures posted from workers for the owning thread to run
///
/// Workers `add`; the owner calls `drain` from its loop.
#[derive(Default)]
pub struct MainThreadQueue {
    operations: Mutex<VecDeque<Operation>>,
}

impl fmt::Debug for MainThreadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThreadQueue").field("pending", &self.len()).finish()
    }
}

impl MainThreadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post an operation
    pub fn add<F>(&self, operation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock().push_back(Box::new(operation));
    }

    /// Run every pending operation in the order it was added
    ///
    /// Operations added while draining run on the next drain. Returns the
    /// number of operations run.
    pub fn drain(&self) -> usize {
        let pending = std::mem::take(&mut *self.lock());
        let count = pending.len();
        for operation in pending {
            operation();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Operation>> {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
