//! Status command - registry, index and tool health.

use super::{format_size, session::print_session, Context};
use anyhow::Result;
use colored::Colorize;
use filechat_db::Database;

pub fn run(session: &str) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;

    println!("{}", "Filechat Status".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Session".white().bold());
    print_session(&session);

    let db = ctx.db();
    let mut stats = db.get_stats()?;
    stats.database_size_bytes = Database::file_size(&ctx.paths.database_file)?;

    println!();
    println!("{}", "Registry".white().bold());
    println!("  {}: {}", "Files".cyan(), stats.total_files);
    let mut kinds: Vec<_> = stats.files_by_kind.iter().collect();
    kinds.sort();
    for (kind, count) in kinds {
        println!("    {} {}: {}", "•".dimmed(), kind, count);
    }
    println!("  {}: {}", "Owners".cyan(), stats.total_owners);
    println!("  {}: {}", "Subjects".cyan(), stats.total_collections);
    println!("  {}: {}", "Sessions".cyan(), stats.total_sessions);
    println!(
        "  {}: {} ({})",
        "Database".cyan(),
        ctx.paths.database_file.display(),
        format_size(stats.database_size_bytes)
    );

    let indexed = ctx.library.indexes().list()?;
    println!();
    println!("{}", "Vector Indexes".white().bold());
    println!("  {}: {}", "Stored".cyan(), indexed.len());
    println!("  {}: {}", "Directory".cyan(), ctx.paths.index_dir.display());
    if indexed.len() as i64 != stats.total_files {
        println!(
            "  {} Index count differs from the registry. Run 'filechat recover'.",
            "!".yellow()
        );
    }
    if stats.pending_intents > 0 {
        println!(
            "  {} {} interrupted operations pending. Run 'filechat recover'.",
            "!".yellow(),
            stats.pending_intents
        );
    }

    println!();
    println!("{}", "Ollama".white().bold());
    let client = ctx.library.model().client();
    if ctx.block_on(client.is_available()) {
        println!("  {} Running at {}", "●".green(), client.host());
        for model in [&ctx.config.ollama.model, &ctx.config.ollama.embedding_model] {
            match ctx.block_on(client.has_model(model)) {
                Ok(true) => println!("  {} {}", "✓".green(), model),
                Ok(false) => println!(
                    "  {} {} (run 'ollama pull {}')",
                    "✗".red(),
                    model,
                    model
                ),
                Err(e) => println!("  {} {}: {}", "?".yellow(), model, e),
            }
        }
    } else {
        println!("  {} Not running at {}", "✗".red(), client.host());
    }

    println!();
    println!("{}", "External Tools".white().bold());
    for (tool, available) in filechat_process::check_dependencies() {
        if available {
            println!("  {} {}", "✓".green(), tool);
        } else {
            println!("  {} {} {}", "✗".red(), tool, "(not found)".dimmed());
        }
    }

    Ok(())
}
