//! System-level modules
//!
//! - Logging initialization
//! - Startup wiring and execution modes live in `crate::runtime`

pub mod logging;
