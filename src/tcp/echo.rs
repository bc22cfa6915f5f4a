//! Line echo handler.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

use crate::net::ConnectionRegistry;
use crate::tcp::Handler;

/// Writes every newline-terminated line straight back to its sender.
///
/// Bytes not yet terminated by `\n` stay buffered until the next read;
/// a trailing partial line at end-of-input is dropped, never echoed.
#[derive(Debug, Default)]
pub struct EchoHandler {
    registry: ConnectionRegistry,
}

impl EchoHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            registry: ConnectionRegistry::with_grace_period(grace_period),
        }
    }

    /// Connections currently being served.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    async fn serve(&self, stream: TcpStream) {
        let Some((conn, reader)) = self.registry.register(stream).await else {
            return;
        };

        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            let read = tokio::select! {
                res = reader.read_until(b'\n', &mut line) => res,
                _ = conn.closed() => {
                    tracing::debug!(connection_id = %conn.id(), "Connection closed by handler");
                    break;
                }
            };

            match read {
                Ok(0) => {
                    tracing::info!(connection_id = %conn.id(), "Connection closed by peer");
                    break;
                }
                Ok(_) if !line.ends_with(b"\n") => {
                    tracing::info!(
                        connection_id = %conn.id(),
                        pending_bytes = line.len(),
                        "Connection closed by peer mid-line"
                    );
                    break;
                }
                Ok(_) => {
                    let _in_flight = conn.gate().track();
                    if let Err(e) = conn.write_all(&line).await {
                        tracing::warn!(connection_id = %conn.id(), error = %e, "Echo write failed");
                        break;
                    }
                    line.clear();
                }
                Err(e) => {
                    tracing::warn!(connection_id = %conn.id(), error = %e, "Read failed");
                    break;
                }
            }
        }

        self.registry.release(&conn).await;
    }
}

impl Handler for EchoHandler {
    fn handle(&self, stream: TcpStream) -> BoxFuture<'_, ()> {
        self.serve(stream).boxed()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.registry.close().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Connects a client and runs `handler.handle` on the accepted side.
    async fn connect(handler: &Arc<EchoHandler>) -> (TcpStream, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());

        let handler = Arc::clone(handler);
        let (stream, _) = accepted.unwrap();
        let task = tokio::spawn(async move { handler.handle(stream).await });
        (client.unwrap(), task)
    }

    #[tokio::test]
    async fn echoes_line() {
        let handler = Arc::new(EchoHandler::new());
        let (mut client, task) = connect(&handler).await;

        client.write_all(b"PING\n").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"PING\n");

        client.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(handler.registry().is_empty());
    }

    #[tokio::test]
    async fn joins_line_split_across_writes() {
        let handler = Arc::new(EchoHandler::new());
        let (mut client, task) = connect(&handler).await;

        client.write_all(b"hel").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.write_all(b"lo\nworld\n").await.unwrap();
        client.shutdown().await.unwrap();

        let mut echoed = Vec::new();
        client.read_to_end(&mut echoed).await.unwrap();
        assert_eq!(echoed, b"hello\nworld\n");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn partial_line_is_not_echoed() {
        let handler = Arc::new(EchoHandler::new());
        let (mut client, task) = connect(&handler).await;

        client.write_all(b"abc").await.unwrap();
        client.shutdown().await.unwrap();

        task.await.unwrap();
        let mut echoed = Vec::new();
        client.read_to_end(&mut echoed).await.unwrap();
        assert!(echoed.is_empty());
        assert!(handler.registry().is_empty());
    }

    #[tokio::test]
    async fn close_ends_idle_connection() {
        let handler = Arc::new(EchoHandler::with_grace_period(Duration::from_millis(100)));
        let (mut client, task) = connect(&handler).await;

        client.write_all(b"one\n").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();

        handler.close().await;
        task.await.unwrap();
        assert!(handler.registry().is_closing());
        assert!(handler.registry().is_empty());

        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn connection_after_close_is_refused_service() {
        let handler = Arc::new(EchoHandler::new());
        handler.close().await;

        let (mut client, task) = connect(&handler).await;
        task.await.unwrap();

        let _ = client.write_all(b"PING\n").await;
        let mut echoed = Vec::new();
        let _ = client.read_to_end(&mut echoed).await;
        assert!(echoed.is_empty());
        assert!(handler.registry().is_empty());
    }
}
