use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "nudge")]
#[command(about = "Offline-first reminders from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to the local cache database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull changes from the server once
    Sync,
    /// Keep the local cache in sync until interrupted
    Watch,
    /// Show cached lists
    Lists {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show cached reminders
    Reminders {
        /// Only reminders of this list
        #[arg(long, value_name = "ID", conflicts_with = "smart")]
        list: Option<String>,
        /// Smart list: today, scheduled, all, flagged, completed
        #[arg(long, value_name = "NAME")]
        smart: Option<String>,
        /// Viewer timezone used for "today" (IANA name)
        #[arg(long, value_name = "ZONE", default_value = "UTC")]
        timezone: String,
        /// Include every completed reminder
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sync checkpoints and cache contents
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview how a due date is stored
    Due {
        /// Date or date-time, e.g. 2024-06-01 or 2024-06-01T09:00
        input: String,
        /// IANA timezone the input is written in
        #[arg(long, value_name = "ZONE", default_value = "UTC")]
        timezone: String,
        /// Keep the clock reading regardless of zone
        #[arg(long)]
        floating: bool,
        /// Only the calendar date matters
        #[arg(long)]
        date_only: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
