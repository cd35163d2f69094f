//! CLI mode
//!
//! Builds the same startup context as the server, without the HTTP layer,
//! and hands it to the command implementation.

use crate::cli::Commands;
use crate::config::StaticConfig;
use crate::interfaces::cli::{self, CliError};
use crate::runtime::lifetime;

/// Run one CLI command
pub async fn run_cli(config: &StaticConfig, cmd: Commands) -> Result<(), CliError> {
    // 配置生成不需要连接存储
    if let Commands::Config { action } = cmd {
        return cli::run_config_command(action);
    }

    let startup = lifetime::startup::prepare_startup(config)
        .await
        .map_err(|e| CliError::StorageError(format!("{:#}", e)))?;
    cli::run_cli_command(&startup, cmd).await
}
