//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGHUP/SIGINT/SIGQUIT/SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger (signal or programmatic) → accept loop stops
//!     → listener closed → handler closed → wait for connection tasks
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, close handler, wait
//! - Triggering is idempotent; a second trigger after an accept failure is a no-op
//! - The top-level wait has no deadline; per-connection grace lives in the handler

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{SignalWatcher, TerminationSignal};
