//! Connection records and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own each accepted stream's write side and in-flight gate
//! - Track a handler's live connections and sweep them on close
//! - Count per-connection tasks so the server can wait for all of them
//!
//! # Design Decisions
//! - The read half goes to the handler's task, the write half stays in the record,
//!   so a close can sever the stream without touching the reader
//! - Every termination path untracks the connection, not only clean EOF
//! - The close sweep drains connections concurrently, bounded by one grace period

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use crate::sync::{Gate, ShutdownFlag};

/// Grace period a connection gets to finish in-flight work on close.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A tracked client connection, owned by the registry of the handler that accepted it.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    gate: Gate,
    closed: watch::Sender<bool>,
}

impl Connection {
    fn new(peer_addr: Option<SocketAddr>, writer: OwnedWriteHalf) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: ConnectionId::new(),
            peer_addr,
            writer: Mutex::new(Some(writer)),
            gate: Gate::new(),
            closed,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Gate counting this connection's in-flight response work.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Whether the connection has been closed by its registry.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the connection has been closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so this only returns once the flag flips.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Write the whole buffer to the peer.
    ///
    /// Fails with `NotConnected` once the connection is closed. A write still
    /// blocked when a forced close happens is abandoned.
    pub async fn write_all(&self, buf: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(not_connected());
        };

        tokio::select! {
            res = writer.write_all(buf) => res,
            _ = self.closed() => Err(not_connected()),
        }
    }

    /// Give in-flight work up to `grace` to finish, then close the stream.
    ///
    /// Returns whether the gate drained in time. The stream is closed either way.
    pub async fn close(&self, grace: Duration) -> bool {
        let drained = self.gate.await_drain(grace).await;
        if !drained {
            tracing::warn!(
                connection_id = %self.id,
                peer_addr = ?self.peer_addr,
                outstanding = self.gate.outstanding(),
                grace_ms = grace.as_millis() as u64,
                "Connection did not drain in time, closing anyway"
            );
        }
        self.shutdown().await;
        drained
    }

    async fn shutdown(&self) {
        self.closed.send_replace(true);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }
}

fn not_connected() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "connection closed")
}

/// The set of live connections a handler owns, plus its draining flag.
///
/// Handlers register each accepted stream here and release it when their
/// read loop ends. [`ConnectionRegistry::close`] sets the flag and sweeps
/// every tracked connection.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    closing: ShutdownFlag,
    grace_period: Duration,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            closing: ShutdownFlag::new(),
            grace_period,
        }
    }

    /// Whether `close` has been called.
    pub fn is_closing(&self) -> bool {
        self.closing.get()
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Start tracking a freshly accepted stream.
    ///
    /// Returns the connection record and the read half the caller should
    /// consume. Returns `None`, with the stream already closed, if the
    /// registry is closing.
    pub async fn register(&self, stream: TcpStream) -> Option<(Arc<Connection>, OwnedReadHalf)> {
        if self.closing.get() {
            tracing::debug!(peer_addr = ?stream.peer_addr().ok(), "Rejecting connection while closing");
            return None;
        }

        let peer_addr = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        let conn = Arc::new(Connection::new(peer_addr, writer));
        self.connections.insert(conn.id(), Arc::clone(&conn));

        // A close sweep may have snapshotted the set just before the insert.
        if self.closing.get() {
            self.release(&conn).await;
            return None;
        }

        tracing::debug!(connection_id = %conn.id(), peer_addr = ?peer_addr, "Connection registered");
        Some((conn, reader))
    }

    /// Stop tracking a connection and close its stream.
    pub async fn release(&self, conn: &Connection) {
        self.connections.remove(&conn.id());
        conn.shutdown().await;
        tracing::debug!(connection_id = %conn.id(), peer_addr = ?conn.peer_addr(), "Connection released");
    }

    /// Set the draining flag, then close every tracked connection.
    ///
    /// Each connection gets the grace period to drain its gate before its
    /// stream is closed. Safe to call repeatedly and concurrently.
    pub async fn close(&self) {
        if self.closing.set() {
            tracing::info!(connections = self.connections.len(), "Handler shutting down");
        }

        // Snapshot first so no shard lock is held across an await.
        let snapshot: Vec<Arc<Connection>> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        join_all(snapshot.iter().map(|conn| async move {
            conn.close(self.grace_period).await;
            self.connections.remove(&conn.id());
        }))
        .await;
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts the server's per-connection tasks so shutdown can wait for all of them.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    active: Gate,
    accepted: AtomicU64,
    completed: AtomicU64,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TrackerInner::default()),
        }
    }

    /// Record a new connection task. Returns a guard that marks it finished on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.inner.accepted.fetch_add(1, Ordering::AcqRel);
        self.inner.active.enter();
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection task count.
    pub fn active_count(&self) -> u64 {
        self.inner.active.outstanding() as u64
    }

    /// Total tasks ever tracked.
    pub fn accepted(&self) -> u64 {
        self.inner.accepted.load(Ordering::Acquire)
    }

    /// Total tasks that have finished.
    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Wait until every tracked task has finished. No timeout.
    pub async fn wait_idle(&self) {
        self.inner.active.drained().await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection task's lifetime.
/// Marks the task finished when dropped, including on panic unwind.
#[derive(Debug)]
pub struct ConnectionGuard {
    inner: Arc<TrackerInner>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this task's connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.inner.completed.fetch_add(1, Ordering::AcqRel);
        self.inner.active.exit();
        tracing::trace!(task_id = %self.id, "Connection task finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(tracker.accepted(), 2);
        assert_eq!(tracker.completed(), 2);
    }

    #[tokio::test]
    async fn wait_idle_returns_after_last_guard() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.track();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn register_and_release() {
        let registry = ConnectionRegistry::new();
        let (mut client, server) = socket_pair().await;

        let (conn, _reader) = registry.register(server).await.unwrap();
        assert_eq!(registry.len(), 1);

        conn.write_all(b"hi\n").await.unwrap();
        let mut buf = [0u8; 3];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi\n");

        registry.release(&conn).await;
        assert!(registry.is_empty());
        assert!(conn.is_closed());
        assert_eq!(
            conn.write_all(b"late").await.unwrap_err().kind(),
            std::io::ErrorKind::NotConnected
        );
    }

    #[tokio::test]
    async fn register_while_closing_rejects() {
        let registry = ConnectionRegistry::new();
        registry.close().await;

        let (mut client, server) = socket_pair().await;
        assert!(registry.register(server).await.is_none());
        assert!(registry.is_empty());

        // Peer sees the stream closed without any data.
        let mut buf = Vec::new();
        assert_eq!(client.read_to_end(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_waits_for_gate_then_closes() {
        let registry = Arc::new(ConnectionRegistry::with_grace_period(Duration::from_secs(5)));
        let (mut client, server) = socket_pair().await;
        let (conn, _reader) = registry.register(server).await.unwrap();

        conn.gate().enter();
        let closer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.close().await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!conn.is_closed());
        conn.write_all(b"done\n").await.unwrap();
        conn.gate().exit();

        closer.await.unwrap();
        assert!(conn.is_closed());
        assert!(registry.is_empty());

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"done\n");
    }

    #[tokio::test]
    async fn close_twice_concurrently() {
        let registry = Arc::new(ConnectionRegistry::with_grace_period(Duration::from_millis(50)));
        let (_client, server) = socket_pair().await;
        let (conn, _reader) = registry.register(server).await.unwrap();

        tokio::join!(registry.close(), registry.close());

        assert!(registry.is_closing());
        assert!(registry.is_empty());
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn close_forces_undrained_connection() {
        let registry = ConnectionRegistry::with_grace_period(Duration::from_secs(1));
        let (mut client, server) = socket_pair().await;
        let (conn, _reader) = registry.register(server).await.unwrap();

        conn.gate().enter();
        registry.close().await;
        assert!(conn.is_closed());

        let mut buf = Vec::new();
        assert_eq!(client.read_to_end(&mut buf).await.unwrap(), 0);
        client.shutdown().await.ok();
    }
}
