//! Chat command - answer questions from the chosen file.

use super::Context;
use anyhow::{Context as _, Result};
use colored::Colorize;
use filechat_core::Session;
use filechat_ingest::{Answer, ChatTurn};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn run(session: &str, question: &str, show_sources: bool) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    ask(&ctx, &session, question, show_sources)
}

/// Answer `question` about the chosen file, with the earlier turns of the
/// session as history, and remember the new turn.
pub fn ask(ctx: &Context, session: &Session, question: &str, show_sources: bool) -> Result<()> {
    let record = ctx.selected_file(session)?;

    let client = ctx.library.model().client();
    if !ctx.block_on(client.is_available()) {
        anyhow::bail!(
            "Ollama is not running at {}. Start it with 'ollama serve'.",
            client.host()
        );
    }

    let history = ctx
        .library
        .chat_history(&session.name, &record.identifier, ctx.config.chat.history_turns)
        .context("Failed to load chat history")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Reading {}", record.display_name));
    pb.enable_steady_tick(Duration::from_millis(100));

    let answer = ctx.block_on(ctx.library.answer(&record.identifier, question, &history));
    pb.finish_and_clear();
    let answer = answer.context("Failed to generate answer")?;

    print_answer(&answer, show_sources);
    ctx.library
        .remember_turn(&session.name, &record.identifier, &ChatTurn::new(question, answer.text))
        .context("Failed to save chat history")?;
    Ok(())
}

pub fn reset_session(session: &str) -> Result<()> {
    let ctx = Context::open()?;
    let session = ctx.load_session(session)?;
    reset(&ctx, &session)
}

/// Forget the chat history of `session`.
pub fn reset(ctx: &Context, session: &Session) -> Result<()> {
    let removed = ctx
        .library
        .forget_history(&session.name)
        .context("Failed to clear chat history")?;
    println!("{} Chat history cleared ({} turns)", "✓".green(), removed);
    Ok(())
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", "Answer:".green().bold());
    println!();
    println!("{}", answer.text.trim());
    println!();

    if !show_sources || answer.sources.is_empty() {
        return;
    }

    println!("{}", "─".repeat(70));
    println!("{}", "Sources:".cyan().bold());
    for (i, source) in answer.sources.iter().enumerate() {
        println!(
            "  {}. {} (similarity: {:.0}%)",
            i + 1,
            source.excerpt.dimmed(),
            source.similarity * 100.0
        );
    }
}
