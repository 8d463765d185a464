//! Delete command.

use super::Context;
use anyhow::{Context as _, Result};
use colored::Colorize;
use filechat_core::Session;

pub fn run(session: &str, collection: &str, file: &str) -> Result<()> {
    let ctx = Context::open()?;
    let mut session = ctx.load_session(session)?;
    ctx.recover_pending()?;
    run_with(&ctx, &mut session, collection, file)
}

pub fn run_with(ctx: &Context, session: &mut Session, collection: &str, file: &str) -> Result<()> {
    let record = ctx
        .block_on(ctx.library.remove(&session.owner, collection, file))
        .with_context(|| format!("Failed to delete '{}' from {}", file, collection))?;

    if session.selected_identifier().as_deref() == Some(record.identifier.as_str()) {
        session.clear_selection();
        ctx.save_session(session)?;
    }

    println!(
        "{} {} {}",
        "Deleted:".green().bold(),
        record.display_name,
        format!("({})", record.collection_name).dimmed()
    );
    Ok(())
}
