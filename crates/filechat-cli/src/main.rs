//! Filechat CLI - chat with your files, pages and videos.

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "filechat")]
#[command(author, version, about = "Ask questions about your files, web pages and videos", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Session holding the chosen owner and file
    #[arg(long, global = true, env = "FILECHAT_SESSION", default_value = "default")]
    session: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize filechat (create config and database)
    Init,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show registry, index and tool status
    Status,

    /// Show or change the owner used by the session
    Owner {
        /// New owner name
        name: Option<String>,
    },

    /// Choose the file to chat with
    Choose {
        /// Collection (subject) the file belongs to
        collection: String,
        /// Display name of the file, or the link it was added from
        file: String,
    },

    /// Add a web page or online video to a collection
    AddLink {
        /// Page or video URL
        url: String,
        /// Collection (subject) to add it to
        collection: String,
    },

    /// Upload a file, or every file in a directory, to a collection
    Upload {
        /// Collection (subject) to add to
        collection: String,
        /// File or directory to upload
        path: String,
        /// Display name for a single file (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List the subjects of the current owner
    Subjects,

    /// List files of the current owner
    Files {
        /// Only files in this collection
        collection: Option<String>,
    },

    /// Delete a file and its index
    Delete {
        /// Collection (subject) the file belongs to
        collection: String,
        /// Display name of the file
        file: String,
    },

    /// Set the description of the chosen file
    Describe {
        /// New description
        text: Vec<String>,
        /// Remove the description instead
        #[arg(long, conflicts_with = "text")]
        clear: bool,
    },

    /// Show details of the chosen file or of the given one
    Show {
        /// Collection (subject) of the file
        collection: Option<String>,
        /// Display name of the file
        #[arg(requires = "collection")]
        file: Option<String>,
    },

    /// Ask a question about the chosen file
    Chat {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,
        /// Hide the retrieved sources
        #[arg(long)]
        no_sources: bool,
    },

    /// Forget the chat history of the session
    Reset,

    /// Start an interactive shell
    Shell,

    /// Finish writes and deletes left behind by an interrupted run
    Recover {
        /// Also forget settled intents older than this many days
        #[arg(long)]
        prune_days: Option<i64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Open config in editor
    Edit,
    /// Set a configuration value
    Set {
        /// Config key (e.g., ollama.model)
        key: String,
        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filechat=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filechat=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let session = cli.session.as_str();
    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Edit => commands::config::edit(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Status => commands::status::run(session),
        Commands::Owner { name } => commands::session::owner(session, name.as_deref()),
        Commands::Choose { collection, file } => {
            commands::session::choose(session, &collection, &file)
        }
        Commands::AddLink { url, collection } => {
            commands::upload::add_link(session, &url, &collection)
        }
        Commands::Upload {
            collection,
            path,
            name,
        } => commands::upload::run(session, &collection, &path, name.as_deref()),
        Commands::Subjects => commands::list::subjects(session),
        Commands::Files { collection } => commands::list::files(session, collection.as_deref()),
        Commands::Delete { collection, file } => {
            commands::delete::run(session, &collection, &file)
        }
        Commands::Describe { text, clear } => {
            let description = if clear { None } else { Some(text.join(" ")) };
            commands::describe::run(session, description)
        }
        Commands::Show { collection, file } => {
            commands::show::run(session, collection.as_deref(), file.as_deref())
        }
        Commands::Chat {
            question,
            no_sources,
        } => commands::chat::run(session, &question.join(" "), !no_sources),
        Commands::Reset => commands::chat::reset_session(session),
        Commands::Shell => commands::shell::run(session),
        Commands::Recover { prune_days } => commands::recover::run(prune_days),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
