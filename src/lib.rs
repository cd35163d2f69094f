//! Shardlink - URL shortener core
//!
//! Short codes are minted from a sharded counter and a salted encoder. Every
//! link lives in two stores: the authoritative relational store and a
//! replicated key/value resolution store read on every redirect.
//!
//! # Features
//! - **server**: HTTP redirect server (default)
//! - **cli**: Command-line link management (default)
//!
//! # Architecture
//! - `storage`: Authoritative store traits, SeaORM backend and in-memory store
//! - `resolution`: Resolution store traits, wire codec, Redis and in-memory adapters
//! - `services`: Shard counter, code encoder, link service, resolver, click aggregation
//! - `api`: HTTP redirect endpoint
//! - `interfaces`: CLI
//! - `config`: Static configuration
//! - `runtime`: Startup wiring, execution modes and shutdown
//! - `system`: Logging

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
#[cfg(feature = "cli")]
pub mod interfaces;
pub mod resolution;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
