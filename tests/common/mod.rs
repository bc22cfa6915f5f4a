//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tcp_server::lifecycle::Shutdown;
use tcp_server::net::Listener;
use tcp_server::tcp::{Handler, ServeReport, Server, ServerConfig, ServerState};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<ServerState>,
    pub task: JoinHandle<ServeReport>,
}

impl TestServer {
    /// Trigger shutdown and wait for the server to stop.
    pub async fn stop(self) -> ServeReport {
        self.shutdown.trigger();
        self.join().await
    }

    /// Wait for the server to stop on its own.
    pub async fn join(self) -> ServeReport {
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}

/// Start `handler` behind a server bound to 127.0.0.1:0.
pub async fn start_server<H: Handler>(handler: Arc<H>) -> TestServer {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr();

    let server = Server::new(ServerConfig::new(addr.to_string()), handler);
    let shutdown = server.shutdown_handle();
    let mut state = server.state();

    let task = tokio::spawn(server.serve(listener));
    state
        .wait_for(|s| *s == ServerState::Listening)
        .await
        .unwrap();

    TestServer {
        addr,
        shutdown,
        state,
        task,
    }
}

pub async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}
