//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for shardlink using clap's derive macros.

use clap::{Parser, Subcommand};

/// Shardlink - URL shortener core with a redirect server
#[derive(Parser)]
#[command(name = "shardlink")]
#[command(version)]
#[command(about = "URL shortener core with a redirect server", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the redirect server (default)
    Serve,

    /// Create a short link
    Create {
        /// Destination URL (http/https)
        destination: String,

        /// Custom short code (generated when omitted)
        #[arg(long)]
        custom: Option<String>,

        /// Custom host (default domain when omitted)
        #[arg(long, default_value = "")]
        host: String,

        /// Creator recorded on the link
        #[arg(long, default_value = "cli")]
        creator: String,

        /// Free-form note
        #[arg(long, default_value = "")]
        note: String,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Extra query parameter merged into the destination (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Soft-delete a link by id
    Delete {
        /// Link id
        id: String,
    },

    /// Resolve a short code through the resolution store
    Resolve {
        /// Short code
        code: String,

        /// Host (default domain when omitted)
        #[arg(long, default_value = "")]
        host: String,
    },

    /// Rewrite the resolution record of a link from the authoritative store
    Republish {
        /// Link id
        id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// 解析 `key=value` 形式的参数
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
