//! Create link command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::{CreateLinkRequest, LinkService};

pub async fn create_link(service: &LinkService, request: CreateLinkRequest) -> Result<(), CliError> {
    let link = service.create_link(request).await?;

    if !link.is_custom {
        println!(
            "{} Generated code: {}",
            "ℹ".bold().blue(),
            link.code.magenta()
        );
    }

    let destination = link.full_destination()?;
    let key = if link.host.is_empty() {
        link.code.clone()
    } else {
        format!("{}/{}", link.host, link.code)
    };
    println!(
        "{} Created short link: {} -> {}",
        "✓".bold().green(),
        key.cyan(),
        destination.blue().underline()
    );
    println!("  id: {}", link.id.dimmed());

    Ok(())
}
