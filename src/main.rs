use clap::Parser;
use tracing::error;

use shardlink::cli::{Cli, Commands};
use shardlink::config::StaticConfig;
use shardlink::runtime::modes;
use shardlink::system::logging::init_logging;

#[actix_web::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = StaticConfig::load(cli.config.as_deref());

    // 日志 guard 需要存活到进程结束
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = modes::run_server(&config).await {
                error!("Server exited with error: {:#}", e);
                eprintln!("{:#}", e);
                return std::process::ExitCode::FAILURE;
            }
        }
        cmd => {
            if let Err(e) = modes::run_cli(&config, cmd).await {
                eprintln!("{}", e.format_colored());
                return std::process::ExitCode::FAILURE;
            }
        }
    }

    std::process::ExitCode::SUCCESS
}
