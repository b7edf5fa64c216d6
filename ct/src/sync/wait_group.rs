//! WaitGroup - completion counter with async wait-for-zero

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Errors raised by misuse of a [`WaitGroup`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitGroupError {
    #[error("done() called with no outstanding tasks")]
    Underflow,

    #[error("add({delta}) overflows counter at {count}")]
    Overflow { count: usize, delta: usize },
}

struct Inner {
    count: AtomicUsize,
    zero: Notify,
}

/// Counts outstanding tasks; `wait()` resolves once the count reaches zero.
///
/// Cloning shares the same counter, so each task can own a handle.
#[derive(Clone)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    /// Create a group with `count` outstanding tasks
    pub fn new(count: usize) -> Self {
        debug!(%count, "WaitGroup::new: called");
        Self {
            inner: Arc::new(Inner {
                count: AtomicUsize::new(count),
                zero: Notify::new(),
            }),
        }
    }

    /// Register `delta` more outstanding tasks
    pub fn add(&self, delta: usize) -> Result<(), WaitGroupError> {
        debug!(%delta, "WaitGroup::add: called");
        self.inner
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_add(delta))
            .map(|_| ())
            .map_err(|count| WaitGroupError::Overflow { count, delta })
    }

    /// Mark one task finished, waking waiters when the count hits zero
    pub fn done(&self) -> Result<(), WaitGroupError> {
        let previous = self
            .inner
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
            .map_err(|_| WaitGroupError::Underflow)?;

        debug!(remaining = previous - 1, "WaitGroup::done: called");
        if previous == 1 {
            self.inner.zero.notify_waiters();
        }
        Ok(())
    }

    /// Guard that calls `done()` when finished or dropped, including on panic
    pub fn done_guard(&self) -> DoneGuard {
        DoneGuard { wg: Some(self.clone()) }
    }

    /// Current number of outstanding tasks
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Suspend until every outstanding task has called `done()`
    pub async fn wait(&self) {
        debug!(count = self.count(), "WaitGroup::wait: called");
        loop {
            let notified = self.inner.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent notify_waiters is not missed
            notified.as_mut().enable();

            if self.count() == 0 {
                debug!("WaitGroup::wait: reached zero");
                return;
            }
            notified.await;
        }
    }
}

/// Marks one task done exactly once, even if the task unwinds
#[must_use = "dropping the guard immediately marks the task done"]
pub struct DoneGuard {
    wg: Option<WaitGroup>,
}

impl DoneGuard {
    /// Mark the task done now, reporting counter misuse
    pub fn finish(mut self) -> Result<(), WaitGroupError> {
        match self.wg.take() {
            Some(wg) => wg.done(),
            None => Ok(()),
        }
    }
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        if let Some(wg) = self.wg.take() {
            debug!("DoneGuard::drop: task ended without finish()");
            if let Err(e) = wg.done() {
                warn!("DoneGuard::drop: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGroup").field("count", &self.count()).finish()
    }
}
