//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGHUP, SIGINT, SIGQUIT and SIGTERM
//! - Report which of them arrived first
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered at construction, so a signal delivered after
//!   `install` returns is never lost
//! - All four signals mean "shut down"; every other signal keeps its default behaviour

use std::fmt;

/// Process signals treated as a request to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Hangup,
    Interrupt,
    Quit,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Quit => "SIGQUIT",
            TerminationSignal::Terminate => "SIGTERM",
        };
        f.write_str(name)
    }
}

#[cfg(unix)]
pub use unix::SignalWatcher;

#[cfg(not(unix))]
pub use fallback::SignalWatcher;

#[cfg(unix)]
mod unix {
    use super::TerminationSignal;
    use tokio::signal::unix::{signal, Signal, SignalKind};

    /// Listens for the termination signals.
    #[derive(Debug)]
    pub struct SignalWatcher {
        hangup: Signal,
        interrupt: Signal,
        quit: Signal,
        terminate: Signal,
    }

    impl SignalWatcher {
        /// Register the signal handlers. Must be called inside a Tokio runtime.
        pub fn install() -> std::io::Result<Self> {
            Ok(Self {
                hangup: signal(SignalKind::hangup())?,
                interrupt: signal(SignalKind::interrupt())?,
                quit: signal(SignalKind::quit())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        /// Wait for the next termination signal.
        ///
        /// Returns `None` only if the runtime's signal driver has shut down.
        pub async fn recv(&mut self) -> Option<TerminationSignal> {
            tokio::select! {
                s = self.hangup.recv() => s.map(|_| TerminationSignal::Hangup),
                s = self.interrupt.recv() => s.map(|_| TerminationSignal::Interrupt),
                s = self.quit.recv() => s.map(|_| TerminationSignal::Quit),
                s = self.terminate.recv() => s.map(|_| TerminationSignal::Terminate),
            }
        }
    }
}

#[cfg(not(unix))]
mod fallback {
    use super::TerminationSignal;

    /// Listens for Ctrl+C, the only termination signal available off Unix.
    #[derive(Debug)]
    pub struct SignalWatcher(());

    impl SignalWatcher {
        pub fn install() -> std::io::Result<Self> {
            Ok(Self(()))
        }

        pub async fn recv(&mut self) -> Option<TerminationSignal> {
            tokio::signal::ctrl_c()
                .await
                .ok()
                .map(|_| TerminationSignal::Interrupt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(TerminationSignal::Hangup.to_string(), "SIGHUP");
        assert_eq!(TerminationSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(TerminationSignal::Quit.to_string(), "SIGQUIT");
        assert_eq!(TerminationSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn install_inside_runtime() {
        assert!(SignalWatcher::install().is_ok());
    }
}
