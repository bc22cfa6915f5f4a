//! Bounded completion gate.
//!
//! # Responsibilities
//! - Count units of in-flight work (`enter` / `exit`)
//! - Let any number of waiters block until the count reaches zero
//! - Give up waiting after a caller-supplied timeout
//!
//! # Design Decisions
//! - Zero-crossing is detected by the `exit` that observes a previous count of 1,
//!   which then wakes every registered waiter at once
//! - Waiters register interest before re-checking the count, so a wakeup
//!   between the check and the await cannot be lost
//! - `exit` without a matching `enter` is a bug in the caller and panics

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Counter of outstanding work with a bounded drain wait.
#[derive(Debug, Default)]
pub struct Gate {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl Gate {
    /// Create an empty gate.
    pub fn new() -> Self {
        Self {
            outstanding: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Record one unit of outstanding work.
    pub fn enter(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Record completion of one unit of work.
    ///
    /// # Panics
    ///
    /// Panics if called more times than [`Gate::enter`].
    pub fn exit(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.drained.notify_waiters(),
            Ok(_) => {}
            Err(_) => panic!("Gate::exit called without a matching Gate::enter"),
        }
    }

    /// Enter the gate and return a guard that exits when dropped.
    pub fn track(&self) -> GateGuard<'_> {
        self.enter();
        GateGuard { gate: self }
    }

    /// Current number of outstanding units.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Wait until the outstanding count reaches zero or `timeout` elapses.
    ///
    /// Returns `true` if the gate drained, `false` if the timeout won.
    /// An already-empty gate returns `true` immediately, whatever the timeout.
    pub async fn await_drain(&self, timeout: Duration) -> bool {
        if self.outstanding() == 0 {
            return true;
        }

        tokio::time::timeout(timeout, self.drained()).await.is_ok()
    }

    /// Wait for the count to reach zero with no upper bound.
    pub(crate) async fn drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps one unit of work registered on a [`Gate`] for its lifetime.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a Gate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.exit();
    }
}
