//! Mode routing
//!
//! Unified entry points for the execution modes:
//! - Server mode (HTTP redirect server)
//! - CLI mode (one-shot link management commands)

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "server")]
pub use server::run_server;

#[cfg(feature = "cli")]
pub use cli::run_cli;
