//! Resolve link command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::{Resolution, Resolver};

pub async fn resolve_link(resolver: &Resolver, code: &str, host: &str) -> Result<(), CliError> {
    match resolver.resolve(code, host).await? {
        Resolution::Redirect(destination) => {
            println!("{} -> {}", code.cyan(), destination.blue().underline());
        }
        Resolution::Deleted => {
            println!("{} {} (deleted)", "✗".bold().yellow(), code.cyan());
        }
        Resolution::NotFound => {
            return Err(CliError::CommandError(format!(
                "Short link does not exist: {}",
                code
            )));
        }
    }
    Ok(())
}
