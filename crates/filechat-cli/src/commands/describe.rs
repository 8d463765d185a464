//! Describe command - set the description of the chosen file.

use super::Context;
use anyhow::Result;
use colored::Colorize;
use filechat_core::Session;

pub fn run(session: &str, description: Option<String>) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    run_with(&ctx, &session, description)
}

pub fn run_with(ctx: &Context, session: &Session, description: Option<String>) -> Result<()> {
    let description = description.map(|d| d.trim().to_string());
    if description.as_deref() == Some("") {
        anyhow::bail!("Give a description, or pass --clear to remove it");
    }

    let record = ctx.selected_file(session)?;
    ctx.library.describe(&record.identifier, description.clone())?;

    match description {
        Some(text) => println!("{} {}: {}", "✓".green(), record.display_name, text),
        None => println!("{} Cleared description of {}", "✓".green(), record.display_name),
    }
    Ok(())
}
