//! Show command - display file details.

use super::{preview, Context};
use anyhow::Result;
use colored::Colorize;
use filechat_core::{derive_identifier, FileRecord, Session, SourceKind};

pub fn run(session: &str, collection: Option<&str>, file: Option<&str>) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    run_with(&ctx, &session, collection, file)
}

/// Show `file` in `collection`, or the chosen file when none is given.
pub fn run_with(
    ctx: &Context,
    session: &Session,
    collection: Option<&str>,
    file: Option<&str>,
) -> Result<()> {
    let record = match (collection, file) {
        (Some(collection), Some(file)) => {
            let identifier = derive_identifier(&session.owner, collection, file);
            ctx.library
                .record(&identifier)?
                .ok_or_else(|| anyhow::anyhow!("No file '{}' in {}", file, collection))?
        }
        _ => ctx.selected_file(session)?,
    };

    print_record(ctx, &record)
}

fn print_record(ctx: &Context, record: &FileRecord) -> Result<()> {
    let icon = match record.source_kind {
        SourceKind::Document => "📄",
        SourceKind::Media => "🎵",
        SourceKind::Link => "🔗",
        SourceKind::VideoLink => "🎬",
    };

    println!("{} {}", icon, record.display_name.white().bold());
    println!("{}", "─".repeat(70));

    println!("  {}: {}", "ID".cyan(), record.identifier);
    println!("  {}: {}", "Owner".cyan(), record.owner);
    println!("  {}: {}", "Subject".cyan(), record.collection_name);
    println!("  {}: {}", "Kind".cyan(), record.source_kind.as_str());
    println!("  {}: {}", "Added".cyan(), ctx.format_date(&record.created_at));

    if let Some(ref description) = record.description {
        println!("  {}: {}", "Description".cyan(), description);
    }

    let indexes = ctx.library.indexes();
    if indexes.exists(&record.identifier) {
        let index = indexes.load(&record.identifier)?;
        println!(
            "  {}: {} chunks, {} dims ({})",
            "Index".cyan(),
            index.len(),
            index.dimensions,
            index.embedding_model
        );
    } else {
        println!("  {}: {}", "Index".cyan(), "missing".red());
    }

    if let Some(ref content) = record.content {
        println!();
        println!(
            "{} ({} chars)",
            "Content Preview".white().bold(),
            content.chars().count()
        );
        println!("{}", "─".repeat(70));
        println!("{}", preview(content, 500).dimmed());
    }

    Ok(())
}
