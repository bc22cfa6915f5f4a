//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (key value lines)
//!     → loader.rs (parse onto defaults via the key table)
//!     → validation.rs (semantic checks)
//!     → ServerProperties (validated, immutable)
//!     → address() handed to the server as ServerConfig
//! ```
//!
//! # Design Decisions
//! - Config is an explicit value passed to the server, never a global
//! - Missing file is not an error: the caller supplies the fallback
//! - Validation separates syntactic (loader) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse, ConfigError};
pub use schema::ServerProperties;
pub use validation::ValidationError;
