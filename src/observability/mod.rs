//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (connection_id, peer_addr, ...)
//!
//! Consumers (logging.rs):
//!     → console (ANSI)
//!     → dated log file under the configured directory
//! ```
//!
//! # Design Decisions
//! - Structured logging through the tracing crate everywhere
//! - Connection IDs flow through every per-connection event
//! - Log level from RUST_LOG, defaulting to info for this crate

pub mod logging;

pub use logging::{LogSettings, LogSetupError};
