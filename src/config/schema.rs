//! Configuration schema definitions.
//!
//! Only `bind` and `port` are consumed by the server itself; the remaining
//! properties are carried through for handlers that want them.

/// Properties read from the server's configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    /// Listen IP or host name.
    pub bind: String,

    /// Listen port.
    pub port: u16,

    /// Append-only persistence toggle.
    pub append_only: bool,

    /// Append-only log file name.
    pub append_filename: String,

    /// Maximum concurrent clients.
    pub max_clients: usize,

    /// Password required from clients, empty for none.
    pub require_pass: String,

    /// Number of logical databases.
    pub databases: usize,

    /// Peer addresses for clustering.
    pub peers: Vec<String>,

    /// This node's own address among `peers`.
    pub self_addr: String,
}

impl ServerProperties {
    /// `bind:port`, the address the listener binds.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6379,
            append_only: false,
            append_filename: String::new(),
            max_clients: 0,
            require_pass: String::new(),
            databases: 16,
            peers: Vec::new(),
            self_addr: String::new(),
        }
    }
}
