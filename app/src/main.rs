#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use command::{
    CommandStrategy, InfoStrategy, InitStrategy, RecordInput, RecordStrategy, SessionsInput,
    SessionsStrategy, VersionStrategy,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clawgate")]
#[command(about = "clawgate conversation session store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show version
    Version,
    /// Show configuration and session store information
    Info,
    /// Inspect and manage stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
    /// Append agent turns (JSON lines) to a session
    Record {
        /// Session key
        key: String,

        /// Read turns from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Do not save the session after recording
        #[arg(long)]
        no_save: bool,
    },
}

#[derive(Subcommand)]
enum SessionsCommand {
    /// List stored sessions
    List,
    /// Create a new empty session
    New {
        /// Session name; generated when omitted
        name: Option<String>,
    },
    /// Print a session's history
    Show {
        /// Session key
        key: String,

        /// Number of most recent messages to show (0 for all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Cut at exactly the last N messages, ignoring tool-call pairing
        #[arg(long)]
        raw: bool,

        /// Print messages as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Remove all messages from a session
    Clear {
        /// Session key
        key: String,
    },
    /// Delete a session
    Delete {
        /// Session key
        key: String,
    },
}

impl From<SessionsCommand> for SessionsInput {
    fn from(command: SessionsCommand) -> Self {
        match command {
            SessionsCommand::List => Self::List,
            SessionsCommand::New { name } => Self::New { name },
            SessionsCommand::Show {
                key,
                limit,
                raw,
                json,
            } => Self::Show {
                key,
                limit,
                raw,
                json,
            },
            SessionsCommand::Clear { key } => Self::Clear { key },
            SessionsCommand::Delete { key } => Self::Delete { key },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => InitStrategy.execute(())?,
        Commands::Version => VersionStrategy.execute(())?,
        Commands::Info => InfoStrategy.execute(())?,
        Commands::Sessions { command } => SessionsStrategy.execute(command.into())?,
        Commands::Record { key, file, no_save } => {
            RecordStrategy.execute(RecordInput { key, file, no_save })?;
        }
    }

    Ok(())
}
