//! Delete link command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::LinkService;

pub async fn delete_link(service: &LinkService, id: &str) -> Result<(), CliError> {
    let link = service.get_link(id).await?;
    if link.deleted {
        println!(
            "{} Link {} was already deleted",
            "ℹ".bold().blue(),
            link.code.cyan()
        );
        return Ok(());
    }

    service.delete_link(id).await?;
    println!(
        "{} Deleted short link: {}",
        "✓".bold().green(),
        link.code.cyan()
    );
    Ok(())
}
