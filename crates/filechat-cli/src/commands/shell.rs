//! Shell command - interactive REPL.

use super::{chat, delete, describe, list, session as session_cmd, show, upload, Context};
use anyhow::Result;
use colored::Colorize;
use filechat_core::Session;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive shell.
pub fn run(session_name: &str) -> Result<()> {
    let ctx = Context::open()?;
    let mut session = ctx.load_session(session_name)?;
    ctx.recover_pending()?;

    let mut rl = DefaultEditor::new()?;
    let history_path = ctx.paths.data_dir.join("shell_history");
    let _ = rl.load_history(&history_path);

    println!("{}", "Filechat Interactive Shell".cyan().bold());
    println!("{}", "─".repeat(50));
    println!(
        "Type {} for available commands, {} to exit.",
        "help".cyan(),
        "exit".cyan()
    );
    println!();

    loop {
        let prompt = format!("{} ", format!("{}>", session.owner).green().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match execute_command(line, &ctx, &mut session) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Exit) => break,
                    Err(e) => eprintln!("{} {:#}", "Error:".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    println!("Goodbye!");
    let _ = rl.save_history(&history_path);

    Ok(())
}

enum Flow {
    Continue,
    Exit,
}

/// Execute a shell command.
fn execute_command(
    input: &str,
    ctx: &Context,
    session: &mut Session,
) -> Result<Flow> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let cmd = parts.first().copied().unwrap_or("");
    let args = &parts[1..];

    match cmd {
        "help" | "?" => print_help(),
        "exit" | "quit" | "q" => return Ok(Flow::Exit),

        "chat" | "ask" | "a" => {
            if args.is_empty() {
                println!("Usage: chat <question>");
            } else {
                chat::ask(ctx, session, &args.join(" "), true)?;
            }
        }

        "reset" => chat::reset(ctx, session)?,

        "owner" => match args.first() {
            Some(name) => session_cmd::owner_with(ctx, session, name)?,
            None => session_cmd::print_session(session),
        },

        "choose" | "c" => {
            if args.len() < 2 {
                println!("Usage: choose <collection> <file>");
            } else {
                session_cmd::choose_with(ctx, session, args[0], &args[1..].join(" "))?;
            }
        }

        "subjects" => list::subjects_with(ctx, session)?,

        "files" | "ls" => list::files_with(ctx, session, args.first().copied())?,

        "add-link" => {
            if args.len() != 2 {
                println!("Usage: add-link <url> <collection>");
            } else {
                upload::add_link_with(ctx, session, args[0], args[1])?;
            }
        }

        "upload" => {
            if args.len() < 2 {
                println!("Usage: upload <collection> <path>");
            } else {
                upload::run_with(ctx, session, args[0], &args[1..].join(" "), None)?;
            }
        }

        "delete" => {
            if args.len() < 2 {
                println!("Usage: delete <collection> <file>");
            } else {
                delete::run_with(ctx, session, args[0], &args[1..].join(" "))?;
            }
        }

        "describe" => match args {
            [] => println!("Usage: describe <text> | describe --clear"),
            ["--clear"] => describe::run_with(ctx, session, None)?,
            _ => describe::run_with(ctx, session, Some(args.join(" ")))?,
        },

        "show" => show::run_with(ctx, session, None, None)?,

        "clear" | "cls" => print!("\x1B[2J\x1B[1;1H"),

        _ => {
            println!(
                "{} Unknown command: '{}'. Type {} for help.",
                "?".yellow(),
                cmd,
                "help".cyan()
            );
        }
    }

    Ok(Flow::Continue)
}

/// Print help information.
fn print_help() {
    println!("{}", "Available Commands:".cyan().bold());
    println!();
    println!("  {}            Ask about the chosen file", "chat <question>".white());
    println!("  {}                      Forget the chat history", "reset".white());
    println!("  {}               Show or change the owner", "owner [name]".white());
    println!("  {}  Choose the file to chat with", "choose <subject> <file>".white());
    println!("  {}                   List subjects", "subjects".white());
    println!("  {}            List files", "files [subject]".white());
    println!("  {}   Add a web page or video", "add-link <url> <subject>".white());
    println!("  {}  Upload a file or directory", "upload <subject> <path>".white());
    println!("  {}  Delete a file", "delete <subject> <file>".white());
    println!("  {}            Describe the chosen file", "describe <text>".white());
    println!("  {}                       Show the chosen file", "show".white());
    println!("  {}                      Clear the screen", "clear".white());
    println!("  {}                       Exit the shell", "exit".white());
    println!();
    println!("{}", "Shortcuts:".cyan().bold());
    println!(
        "  {} = chat, {} = choose, {} = files",
        "a".yellow(),
        "c".yellow(),
        "ls".yellow()
    );
    println!();
}
