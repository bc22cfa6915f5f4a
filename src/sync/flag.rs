//! One-way "draining" flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flag read by every connection task and written once when the handler closes.
///
/// Release/acquire ordering is sufficient: a task that observes `true` also
/// observes everything the closer did before setting it.
#[derive(Debug, Default)]
pub struct ShutdownFlag(AtomicBool);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark the owner as draining.
    ///
    /// Returns `true` only for the call that flipped the flag; later calls are no-ops.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Whether the owner is draining. Never blocks.
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
