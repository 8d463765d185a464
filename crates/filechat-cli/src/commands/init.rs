//! Initialize filechat.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use filechat_config::Config;
use filechat_db::Database;

pub fn run() -> Result<()> {
    let base = get_paths()?;

    if !base.config_file.exists() {
        Config::create_default_file(&base.config_file).context("Failed to create config file")?;
        println!(
            "  {} Created config: {}",
            "✓".green(),
            base.config_file.display()
        );
    }

    let config = Config::load_from(&base.config_file).context("Failed to load config")?;
    let paths = base
        .apply_config(&config)
        .context("Failed to resolve data directory")?;

    if paths.is_initialized() {
        println!("{} Filechat is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing filechat...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created data directory: {}", "✓".green(), paths.data_dir.display());

    Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        paths.database_file.display()
    );

    println!();
    println!("{}", "Filechat initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Pick an owner: {}", "filechat owner alice".cyan());
    println!(
        "  2. Add something: {}",
        "filechat add-link https://example.com/page biology".cyan()
    );
    println!("  3. Choose it: {}", "filechat choose biology https://example.com/page".cyan());
    println!("  4. Ask away: {}", "filechat chat what is this page about?".cyan());

    Ok(())
}
