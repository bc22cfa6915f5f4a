//! TCP server subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs: bind → accept loop → spawn per connection
//!     → handler.rs: Handler::handle(stream)
//!         → echo.rs: read line → gate → write line back
//! shutdown: stop accept → Handler::close → wait for tasks
//! ```

pub mod echo;
pub mod handler;
pub mod server;

pub use echo::EchoHandler;
pub use handler::Handler;
pub use server::{ServeReport, Server, ServerConfig, ServerError, ServerState};
