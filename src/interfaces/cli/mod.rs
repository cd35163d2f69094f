//! CLI interface module
//!
//! This module provides command-line link management for shardlink.

pub mod commands;

use std::fmt;

use crate::cli::{Commands, ConfigCommands};
use crate::errors::ShardlinkError;
use crate::runtime::lifetime::startup::StartupContext;
use commands::{config_generate, create_link, delete_link, republish_link, resolve_link};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    CommandError(String),
    Link(ShardlinkError),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
            CliError::Link(err) => err.public().format_simple(),
        }
    }

    /// Format as colored output
    #[cfg(feature = "cli")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
            CliError::Link(err) => err.public().format_colored(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<ShardlinkError> for CliError {
    fn from(err: ShardlinkError) -> Self {
        CliError::Link(err)
    }
}

/// 不需要存储的配置子命令
pub fn run_config_command(action: ConfigCommands) -> Result<(), CliError> {
    match action {
        ConfigCommands::Generate { output_path, force } => config_generate(output_path, force),
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(ctx: &StartupContext, cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Create {
            destination,
            custom,
            host,
            creator,
            note,
            tags,
            params,
        } => {
            let request = crate::services::CreateLinkRequest {
                custom,
                host,
                destination,
                query_params: params.into_iter().collect(),
                utm: None,
                creator,
                note,
                tags,
            };
            create_link(&ctx.link_service, request).await
        }

        Commands::Delete { id } => delete_link(&ctx.link_service, &id).await,

        Commands::Resolve { code, host } => resolve_link(&ctx.resolver, &code, &host).await,

        Commands::Republish { id } => republish_link(&ctx.link_service, &id).await,

        Commands::Config { action } => run_config_command(action),

        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by server mode".to_string(),
        )),
    }
}
