//! Bounded waiting for long symbolic computations.
//!
//! [`TimeoutGuard::run`] executes work on a dedicated thread and waits for its
//! result at most for the configured budget. When the budget expires the
//! caller gets [`GuardError::TimedOut`] right away and the result, if one ever
//! arrives, is dropped.
//!
//! Threads cannot be killed, so the guard also raises a [`CancelToken`] on
//! expiry. Work that polls the token between steps stops at the next step
//! boundary; a single long step still runs to completion in the background.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use thiserror::Error;
use tracing::warn;

/// A flag shared with running work, raised when its result is no longer wanted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Errors returned by [`TimeoutGuard::run`].
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("timeout after {0:?}")]
    TimedOut(Duration),

    #[error("computation panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Runs work with a wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutGuard {
    budget: Duration,
}

impl Default for TimeoutGuard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET)
    }
}

impl TimeoutGuard {
    /// Ten minutes.
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(600);

    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Runs `work` on a new thread and waits for it up to the budget.
    ///
    /// The work receives a token that is cancelled if the budget expires.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::TimedOut`] if the budget expires first,
    /// [`GuardError::Panicked`] if the work panics, and [`GuardError::Spawn`]
    /// if the worker thread cannot be created.
    pub fn run<T, F>(&self, work: F) -> Result<T, GuardError>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (sender, receiver) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name("ctrlprop-check".into())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(&worker_cancel)));
                // The receiver is gone if the caller stopped waiting.
                let _ = sender.send(result);
            })?;

        match receiver.recv_timeout(self.budget) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(GuardError::Panicked(panic_message(payload.as_ref()))),
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(budget = ?self.budget, "check exceeded its budget, abandoning worker");
                Err(GuardError::TimedOut(self.budget))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(GuardError::Panicked("worker exited without a result".into()))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
