//! Service layer
//!
//! Core components of the short-link system, wired together by
//! `runtime::startup` and shared by the HTTP server and the CLI.

pub mod bootstrap;
pub mod click_aggregator;
pub mod code_encoder;
mod link_service;
pub mod resolver;
pub mod shard_counter;
pub mod validation;

pub use click_aggregator::{ClickAggregator, ClickStatsSnapshot};
pub use code_encoder::CodeEncoder;
pub use link_service::*;
pub use resolver::{Resolution, Resolver};
pub use shard_counter::ShardCounter;
