//! Concurrent TCP server skeleton with graceful shutdown.
//!
//! Accepts connections, hands each one to a pluggable [`tcp::Handler`] on its
//! own task, and drains in order when a termination signal arrives or the
//! listener fails: stop accepting, close the handler, wait for every
//! connection task.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod sync;
pub mod tcp;

pub use config::ServerProperties;
pub use lifecycle::Shutdown;
pub use tcp::{EchoHandler, Handler, Server, ServerConfig};
