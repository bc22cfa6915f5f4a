//! TCP server lifecycle.
//!
//! # Responsibilities
//! - Bind the configured address (fatal on failure)
//! - Run the accept loop and spawn one task per connection
//! - Watch for termination signals alongside the accept loop
//! - Tear down in order: stop listening, close the handler, wait for tasks
//!
//! # Design Decisions
//! - A signal and an accept failure both end the accept loop, so teardown
//!   has exactly one call site; it takes the listener by value and cannot
//!   run twice
//! - The final wait for connection tasks has no deadline

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::lifecycle::{Shutdown, SignalWatcher};
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::tcp::Handler;

/// What the lifecycle needs to start listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` to bind.
    pub address: String,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Lifecycle states, in the only order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    Draining,
    Stopped,
}

/// Connection task counts at the moment the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeReport {
    /// Tasks spawned by the accept loop.
    pub accepted: u64,
    /// Tasks that ran to completion.
    pub completed: u64,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("failed to install signal handlers")]
    Signal(#[source] std::io::Error),
}

/// A TCP server dispatching connections to a [`Handler`].
pub struct Server<H> {
    config: ServerConfig,
    handler: Arc<H>,
    shutdown: Shutdown,
    state: watch::Sender<ServerState>,
}

impl<H: Handler> Server<H> {
    /// Create a server in the `Created` state.
    pub fn new(config: ServerConfig, handler: Arc<H>) -> Self {
        let (state, _) = watch::channel(ServerState::Created);
        Self {
            config,
            handler,
            shutdown: Shutdown::new(),
            state,
        }
    }

    /// Handle for requesting shutdown without an OS signal.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Bind the configured address and serve until a termination signal
    /// arrives or the listener fails.
    pub async fn listen_and_serve_with_signal(self) -> Result<ServeReport, ServerError> {
        let mut signals = SignalWatcher::install().map_err(ServerError::Signal)?;
        let listener = Listener::bind(&self.config.address).await?;

        let shutdown = self.shutdown.clone();
        let watcher = tokio::spawn(async move {
            if let Some(signal) = signals.recv().await {
                tracing::info!(signal = %signal, "Shutdown signal received");
                shutdown.trigger();
            }
        });

        let report = self.serve(listener).await;
        watcher.abort();
        Ok(report)
    }

    /// Serve connections from an already-bound listener until shutdown is
    /// triggered or accepting fails.
    pub async fn serve(self, listener: Listener) -> ServeReport {
        let tracker = ConnectionTracker::new();
        self.transition(ServerState::Listening);
        tracing::info!(address = %listener.local_addr(), "Server listening");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => break,
                res = listener.accept() => res,
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    let guard = tracker.track();
                    tracing::info!(task_id = %guard.id(), peer_addr = %peer_addr, "Accepted connection");

                    let handler = Arc::clone(&self.handler);
                    tokio::spawn(async move {
                        let _guard = guard;
                        handler.handle(stream).await;
                    });
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Accept failed, stopping listener");
                    break;
                }
            }
        }

        self.teardown(listener).await;

        tracing::info!(active = tracker.active_count(), "Waiting for connection tasks");
        tracker.wait_idle().await;
        self.transition(ServerState::Stopped);

        let report = ServeReport {
            accepted: tracker.accepted(),
            completed: tracker.completed(),
        };
        tracing::info!(accepted = report.accepted, completed = report.completed, "Server stopped");
        report
    }

    async fn teardown(&self, listener: Listener) {
        // Latch the trigger so a signal arriving after an accept failure is a no-op.
        self.shutdown.trigger();
        self.transition(ServerState::Draining);

        drop(listener);
        tracing::info!("Listener closed");

        self.handler.close().await;
        tracing::info!("Handler closed");
    }

    fn transition(&self, next: ServerState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = ?previous, to = ?next, "Server state changed");
    }
}

impl<H> std::fmt::Debug for Server<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("handler", &"<handler>")
            .field("state", &*self.state.borrow())
            .finish()
    }
}
