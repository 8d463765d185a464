//! Upload and add-link commands.

use super::Context;
use anyhow::{Context as _, Result};
use colored::Colorize;
use filechat_core::Session;
use filechat_ingest::{collect_files, SubmitOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn add_link(session: &str, url: &str, collection: &str) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    ctx.recover_pending()?;
    add_link_with(&ctx, &session, url, collection)
}

pub fn add_link_with(ctx: &Context, session: &Session, url: &str, collection: &str) -> Result<()> {
    let pb = spinner(format!("Processing {}", url))?;
    let result = ctx.block_on(ctx.library.submit_link(&session.owner, collection, url));
    pb.finish_and_clear();

    report(&result.with_context(|| format!("Failed to add {}", url))?);
    Ok(())
}

pub fn run(session: &str, collection: &str, path: &str, name: Option<&str>) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    ctx.recover_pending()?;
    run_with(&ctx, &session, collection, path, name)
}

pub fn run_with(
    ctx: &Context,
    session: &Session,
    collection: &str,
    path: &str,
    name: Option<&str>,
) -> Result<()> {
    let path = PathBuf::from(shellexpand::tilde(path).into_owned());
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        let pb = spinner(format!("Processing {}", path.display()))?;
        let result = ctx.block_on(ctx.library.submit_file(&session.owner, collection, &path, name));
        pb.finish_and_clear();

        report(&result.with_context(|| format!("Failed to upload {}", path.display()))?);
        return Ok(());
    }

    if name.is_some() {
        anyhow::bail!("--name only applies to a single file");
    }
    upload_dir(ctx, session, collection, &path)
}

fn upload_dir(ctx: &Context, session: &Session, collection: &str, dir: &Path) -> Result<()> {
    let files = collect_files(dir);
    if files.is_empty() {
        println!("{} No files found in {}", "Note:".yellow(), dir.display());
        return Ok(());
    }

    println!(
        "{} {} files into {}",
        "Uploading".cyan().bold(),
        files.len(),
        collection.cyan()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut stored = 0;
    let mut existing = 0;
    let mut failed = Vec::new();

    for file in &files {
        let label = relative_name(dir, file);
        pb.set_message(label.clone());

        // Same-named files in different subdirectories stay distinct
        let submitted = ctx.library.submit_file(&session.owner, collection, file, Some(&label));
        match ctx.block_on(submitted) {
            Ok(SubmitOutcome::Stored(_)) => stored += 1,
            Ok(SubmitOutcome::AlreadyExists(_)) => existing += 1,
            Err(e) => failed.push((label, e)),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "{} {} stored, {} already present, {} failed",
        "Done:".green().bold(),
        stored,
        existing,
        failed.len()
    );

    if failed.is_empty() {
        return Ok(());
    }
    for (label, e) in &failed {
        println!("  {} {}: {}", "✗".red(), label, e.to_string().dimmed());
    }
    anyhow::bail!("{} of {} files could not be uploaded", failed.len(), files.len())
}

/// Path of `file` below `dir`, with `/` separators on every platform.
fn relative_name(dir: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(dir).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn report(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Stored(record) => {
            println!(
                "{} {} {}",
                "Stored:".green().bold(),
                record.display_name,
                format!("({})", record.collection_name).dimmed()
            );
            if let Some(ref description) = record.description {
                println!("  {}: {}", "Title".cyan(), description);
            }
            println!("  {}: {}", "ID".cyan(), record.identifier);
        }
        SubmitOutcome::AlreadyExists(identifier) => {
            println!(
                "{} Already added, nothing to do ({})",
                "Note:".yellow().bold(),
                identifier
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filechat_core::derive_identifier;

    #[test]
    fn test_relative_name_keeps_subdirectories() {
        let dir = Path::new("/home/alice/course");
        let week1 = relative_name(dir, &dir.join("week1").join("notes.md"));
        let week2 = relative_name(dir, &dir.join("week2").join("notes.md"));

        assert_eq!(week1, "week1/notes.md");
        assert_eq!(week2, "week2/notes.md");
        assert_ne!(
            derive_identifier("alice", "biology", &week1),
            derive_identifier("alice", "biology", &week2)
        );
    }

    #[test]
    fn test_relative_name_top_level_file() {
        let dir = Path::new("/home/alice/course");
        assert_eq!(relative_name(dir, &dir.join("syllabus.pdf")), "syllabus.pdf");
    }
}
