mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.global.log.as_deref());
    let global = &args.global;
    let command = args.command.unwrap_or(cli::Command::List { page: None });
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { page } => commands::list(global, page).await,
        cli::Command::Add {
            title,
            points,
            description,
            remind,
        } => commands::add(global, title, points, description, remind).await,
        cli::Command::Edit {
            note_id,
            title,
            description,
            points,
        } => commands::edit(global, note_id, title, description, points).await,
        cli::Command::AddPoint { note_id, line } => {
            commands::add_point(global, note_id, line).await
        }
        cli::Command::Toggle { note_id, index } => commands::toggle(global, note_id, index).await,
        cli::Command::Pin { note_id } => commands::pin(global, note_id).await,
        cli::Command::Delete { note_id } => commands::delete(global, note_id).await,
        cli::Command::Stats => commands::stats(global),
        cli::Command::Watch => commands::watch(global).await,
    }
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
