//! Recover command - settle interrupted writes and deletes.

use super::Context;
use anyhow::{Context as _, Result};
use chrono::{Duration, Utc};
use colored::Colorize;

pub fn run(prune_days: Option<i64>) -> Result<()> {
    let ctx = Context::open()?;

    if !ctx.db().integrity_check()? {
        anyhow::bail!(
            "Database integrity check failed: {}",
            ctx.paths.database_file.display()
        );
    }

    let report = ctx
        .library
        .recover()
        .context("Failed to recover interrupted operations")?;

    if report.is_empty() {
        println!("{} Nothing to recover.", "✓".green());
    } else {
        println!("{}", "Recovered".cyan().bold());
        println!("  {} Writes committed: {}", "●".green(), report.committed);
        println!("  {} Writes rolled back: {}", "○".yellow(), report.rolled_back);
        println!("  {} Deletes finished: {}", "●".green(), report.deletes_completed);
    }

    if let Some(days) = prune_days {
        if days < 0 {
            anyhow::bail!("--prune-days must not be negative");
        }
        let pruned = ctx.db().prune_intents(Utc::now() - Duration::days(days))?;
        println!("{} Pruned {} settled intents", "✓".green(), pruned);
    }

    Ok(())
}
