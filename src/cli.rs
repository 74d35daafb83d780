use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stickyboard",
    version,
    about = "Sticky-note board with pinning, reminders and a focus timer"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Base URL of the note service
    #[arg(long, global = true, env = "STICKYBOARD_API_URL")]
    pub api_url: Option<String>,
    /// Email identifying the signed-in user
    #[arg(long, global = true, env = "STICKYBOARD_OWNER")]
    pub owner: Option<String>,
    /// Keep notes in a local YAML file instead of the service
    #[arg(long, global = true)]
    pub local: bool,
    /// Directory for reminder log and daily stats
    #[arg(long, global = true, env = "STICKYBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    /// Config file (defaults to config.yml in the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `stickyboard=trace`
    #[arg(long, global = true, env = "STICKYBOARD_LOG")]
    pub log: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a local notes file in the current directory
    Init,
    /// List notes, pinned first
    List {
        /// Page to show (6 notes per page)
        #[arg(long)]
        page: Option<usize>,
    },
    /// Add a new note
    Add {
        /// Title of the note
        title: String,
        /// Content line (repeatable). Prefix `H:` for a heading
        #[arg(long = "point", short = 'p')]
        points: Vec<String>,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Reminder in YYYY.MM.DD@hh:mm format (local time)
        #[arg(long)]
        remind: Option<String>,
    },
    /// Edit an existing note
    Edit {
        /// Note id to edit
        note_id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Replace all content lines (repeatable)
        #[arg(long = "point", short = 'p')]
        points: Vec<String>,
    },
    /// Append a content line to a note
    AddPoint {
        /// Note id
        note_id: i64,
        /// The line to append
        line: String,
    },
    /// Toggle a task by its index in the note
    Toggle {
        /// Note id
        note_id: i64,
        /// Point index as shown by `list`
        index: usize,
    },
    /// Pin or unpin a note
    Pin {
        /// Note id
        note_id: i64,
    },
    /// Delete a note
    Delete {
        /// Note id
        note_id: i64,
    },
    /// Show today's focus statistics
    Stats,
    /// Keep the board open: reminders, focus timer and archiving run live
    Watch,
}
