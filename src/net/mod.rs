//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → connection.rs (task tracking, per-connection record, registry)
//!     → Hand off to the connection handler
//!
//! Connection States:
//!     Registered → Draining (gate held during close) → Closed
//! ```
//!
//! # Design Decisions
//! - The listener is owned solely by the server lifecycle
//! - Each connection is tracked so close can sweep it

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionId, ConnectionRegistry, ConnectionTracker};
pub use listener::{Listener, ListenerError};
