//! Application lifetime: startup wiring and graceful shutdown

pub mod shutdown;
pub mod startup;
