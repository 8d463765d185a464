//! Session commands - choose the owner and the file to chat with.

use super::Context;
use anyhow::{Context as _, Result};
use colored::Colorize;
use filechat_core::Session;

pub fn owner(session: &str, name: Option<&str>) -> Result<()> {
    let ctx = Context::open()?;
    let mut session = ctx.load_session(session)?;

    match name {
        Some(name) => owner_with(&ctx, &mut session, name),
        None => {
            print_session(&session);
            Ok(())
        }
    }
}

/// Switch the owner of `session`. The chosen file is dropped with it.
pub fn owner_with(ctx: &Context, session: &mut Session, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Owner must not be empty");
    }

    session.choose_owner(name);
    ctx.save_session(session)?;
    forget_history(ctx, session)?;

    println!("{} Owner changed to {}", "✓".green(), name.cyan());
    Ok(())
}

pub fn choose(session: &str, collection: &str, file: &str) -> Result<()> {
    let ctx = Context::open()?;
    let mut session = ctx.load_session(session)?;
    choose_with(&ctx, &mut session, collection, file)
}

/// Select `file` in `collection` of the current owner, if it exists.
pub fn choose_with(ctx: &Context, session: &mut Session, collection: &str, file: &str) -> Result<()> {
    let files = ctx.library.files_in_collection(&session.owner, collection)?;

    if !files.iter().any(|record| record.display_name == file) {
        anyhow::bail!(
            "No file '{}' in {} for owner {}. See 'filechat files {}'.",
            file,
            collection,
            session.owner,
            collection
        );
    }

    let previous = session.selected_identifier();
    session.choose_file(collection, file);
    ctx.save_session(session)?;
    if session.selected_identifier() != previous {
        forget_history(ctx, session)?;
    }

    println!(
        "{} Chose {} {}",
        "✓".green(),
        file.white().bold(),
        format!("({})", collection).dimmed()
    );
    Ok(())
}

/// Turns about one file mean nothing for the next.
fn forget_history(ctx: &Context, session: &Session) -> Result<()> {
    ctx.library
        .forget_history(&session.name)
        .context("Failed to clear chat history")?;
    Ok(())
}

pub fn print_session(session: &Session) {
    println!("  {}: {}", "Session".cyan(), session.name);
    println!("  {}: {}", "Owner".cyan(), session.owner);
    match (&session.collection, &session.file) {
        (Some(collection), Some(file)) => {
            println!("  {}: {} ({})", "File".cyan(), file, collection)
        }
        _ => println!("  {}: {}", "File".cyan(), "none chosen".dimmed()),
    }
}
