//! Republish link command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::resolution::ResolutionRecord;
use crate::services::LinkService;

pub async fn republish_link(service: &LinkService, id: &str) -> Result<(), CliError> {
    match service.republish(id).await? {
        ResolutionRecord::Active { destination, .. } => println!(
            "{} Republished {} -> {}",
            "✓".bold().green(),
            id.cyan(),
            destination.blue().underline()
        ),
        ResolutionRecord::Tombstone => println!(
            "{} Republished {} as deleted",
            "✓".bold().green(),
            id.cyan()
        ),
    }
    Ok(())
}
