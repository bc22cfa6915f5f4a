//! Synchronization primitives shared by handlers and the server lifecycle.
//!
//! # Data Flow
//! ```text
//! Connection task:
//!     read line → gate.track() → write response → guard dropped (exit)
//!
//! Handler close:
//!     flag.set() → gate.await_drain(grace) → force close stream
//! ```
//!
//! # Design Decisions
//! - Gate waits are always bounded; nothing here blocks forever
//! - Flag is written once and never reset

pub mod flag;
pub mod gate;

pub use flag::ShutdownFlag;
pub use gate::{Gate, GateGuard};
