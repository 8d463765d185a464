//! Listing commands - subjects and files of the current owner.

use super::Context;
use anyhow::Result;
use colored::Colorize;
use filechat_core::Session;

pub fn subjects(session: &str) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    subjects_with(&ctx, &session)
}

pub fn subjects_with(ctx: &Context, session: &Session) -> Result<()> {
    let collections = ctx.library.collections_for_owner(&session.owner)?;

    println!(
        "{}",
        format!("Available Subjects ({})", session.owner).cyan().bold()
    );
    println!("{}", "─".repeat(50));

    if collections.is_empty() {
        println!(
            "{}",
            "Nothing yet. Use 'filechat upload' or 'filechat add-link' to add files.".dimmed()
        );
        return Ok(());
    }

    for (i, collection) in collections.iter().enumerate() {
        println!("  {}. {}", i + 1, collection);
    }
    Ok(())
}

pub fn files(session: &str, collection: Option<&str>) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    files_with(&ctx, &session, collection)
}

pub fn files_with(ctx: &Context, session: &Session, collection: Option<&str>) -> Result<()> {
    let files = match collection {
        Some(collection) => ctx.library.files_in_collection(&session.owner, collection)?,
        None => ctx.library.files_for_owner(&session.owner)?,
    };

    let title = match collection {
        Some(collection) => format!("Available Files ({} - {})", session.owner, collection),
        None => format!("Available Files ({})", session.owner),
    };
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(50));

    if files.is_empty() {
        println!("{}", "No files found.".dimmed());
        return Ok(());
    }

    let chosen = session.selected_identifier();
    for (i, file) in files.iter().enumerate() {
        let marker = if chosen.as_deref() == Some(file.identifier.as_str()) {
            "*".green().bold()
        } else {
            " ".normal()
        };

        if collection.is_some() {
            println!("{} {}. {}", marker, i + 1, file.display_name);
        } else {
            println!(
                "{} {}. {} {}",
                marker,
                i + 1,
                file.display_name,
                format!("({})", file.collection_name).dimmed()
            );
        }

        if let Some(ref description) = file.description {
            println!("     {}", description.dimmed());
        }
    }
    Ok(())
}
