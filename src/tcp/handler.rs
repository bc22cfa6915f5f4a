//! Connection handler abstraction.

use futures_util::future::BoxFuture;
use tokio::net::TcpStream;

/// Services accepted connections for the server.
///
/// The server calls [`Handler::handle`] once per accepted connection, each on
/// its own task, and [`Handler::close`] once when it starts draining.
/// Implementations own the connections they are handed and must make
/// `close` safe to run concurrently with `handle` and more than once.
pub trait Handler: Send + Sync + 'static {
    /// Consume `stream` until the peer hangs up, a read fails, or the
    /// handler is closed. Termination is not an error.
    fn handle(&self, stream: TcpStream) -> BoxFuture<'_, ()>;

    /// Stop taking new connections and close every connection held,
    /// giving in-flight responses a bounded grace period first.
    fn close(&self) -> BoxFuture<'_, ()>;
}
