//! HTTP surface
//!
//! Only the public redirect endpoint lives here. Link management goes
//! through `LinkService` directly (CLI or an embedding service).

pub mod services;
