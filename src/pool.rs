//! Fixed-size worker pool for per-file tasks
//!
//! Wraps a dedicated rayon thread pool. Tasks are fire-and-forget; the pool
//! tracks how many are outstanding so the run can wait for them with a
//! deadline, and cancels the queued remainder when the deadline passes.

use crate::error::Result;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

/// How the pool ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReport {
    /// Every submitted task ran to completion
    Graceful,
    /// The timeout expired; `outstanding` tasks had not completed
    TimedOut { outstanding: usize },
}

#[derive(Debug, Default)]
struct TaskTracker {
    pending: Mutex<usize>,
    idle: Condvar,
    cancelled: AtomicBool,
}

impl TaskTracker {
    fn started(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending += 1;
    }

    fn finished(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

/// Decrements the pending count even when the task unwinds
struct PendingGuard(Arc<TaskTracker>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.finished();
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    tracker: Arc<TaskTracker>,
}

impl WorkerPool {
    /// Build a pool with `threads` workers
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("bamboo-worker-{}", i))
            .panic_handler(log_panic)
            .build()?;
        debug!(threads = pool.current_num_threads(), "Worker pool started");

        Ok(Self {
            pool,
            tracker: Arc::new(TaskTracker::default()),
        })
    }

    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a task
    ///
    /// Tasks still queued when a shutdown times out are dropped without
    /// running.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tracker.started();
        let tracker = Arc::clone(&self.tracker);
        self.pool.spawn(move || {
            let guard = PendingGuard(tracker);
            if guard.0.cancelled.load(Ordering::Acquire) {
                return;
            }
            task();
        });
    }

    /// Wait up to `timeout` for every task, then cancel whatever is left
    ///
    /// Tasks already running when the timeout expires are left to finish on
    /// their own.
    pub fn shutdown(self, timeout: Duration) -> ShutdownReport {
        let pending = self.tracker.pending.lock().unwrap_or_else(|e| e.into_inner());
        let (pending, wait) = self
            .tracker
            .idle
            .wait_timeout_while(pending, timeout, |pending| *pending > 0)
            .unwrap_or_else(|e| e.into_inner());

        if wait.timed_out() && *pending > 0 {
            let outstanding = *pending;
            self.tracker.cancelled.store(true, Ordering::Release);
            warn!(
                outstanding,
                timeout_secs = timeout.as_secs(),
                "Worker pool did not finish in time, cancelling queued tasks"
            );
            return ShutdownReport::TimedOut { outstanding };
        }

        debug!("Worker pool drained");
        ShutdownReport::Graceful
    }
}

fn log_panic(payload: Box<dyn Any + Send>) {
    error!(panic = panic_message(payload.as_ref()), "Worker task panicked");
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_runs_every_task() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.size(), 4);

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        assert_eq!(pool.shutdown(Duration::from_secs(10)), ShutdownReport::Graceful);
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_single_worker_keeps_submission_order() {
        let pool = WorkerPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..20 {
            let order = Arc::clone(&order);
            pool.submit(move || order.lock().unwrap().push(i));
        }

        assert_eq!(pool.shutdown(Duration::from_secs(10)), ShutdownReport::Graceful);
        assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_timeout_cancels_queued_tasks() {
        let pool = WorkerPool::new(1).unwrap();
        let executed = Arc::new(AtomicUsize::new(0));

        pool.submit(|| std::thread::sleep(Duration::from_millis(500)));
        for _ in 0..3 {
            let executed = Arc::clone(&executed);
            pool.submit(move || {
                executed.fetch_add(1, Ordering::Relaxed);
            });
        }

        let tracker = Arc::clone(&pool.tracker);
        let started = Instant::now();
        let report = pool.shutdown(Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_millis(450));
        assert_eq!(report, ShutdownReport::TimedOut { outstanding: 4 });

        // Let the sleeping task finish and the queue drain
        let deadline = Instant::now() + Duration::from_secs(5);
        while *tracker.pending.lock().unwrap() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(*tracker.pending.lock().unwrap(), 0);
        assert_eq!(executed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_panicking_task_does_not_stall_shutdown() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(|| panic!("boom"));
        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        assert_eq!(pool.shutdown(Duration::from_secs(10)), ShutdownReport::Graceful);
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(payload.as_ref()), "static text");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned text"));
        assert_eq!(panic_message(payload.as_ref()), "owned text");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
