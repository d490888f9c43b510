mod commands;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use meeting_light_rs::StatusColor;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug, Clone)]
enum EventCommands {
    /// Print the stored events
    List,
    /// Drop events that do not start today
    Purge,
    /// Merge a downloaded calendar into the store, keeping join flags
    Import { file: String },
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Discover lights on the local network
    Scan,
    /// Show the current light state
    Status,
    /// Set the light to a status color
    Set { color: StatusColor },
    /// Mark a meeting as joined and turn the light red
    Join {
        #[arg(long)]
        meeting_id: Option<String>,
    },
    /// Run one reconciliation pass against the calendar
    Reconcile,
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
}

#[derive(Parser, Debug)]
struct Params {
    /// Device cache file (cached address and alias)
    #[clap(long, env = "MEETING_LIGHT_CONFIG", default_value = "config.json")]
    config: String,
    /// Calendar events file written by the sync job
    #[clap(long, env = "MEETING_LIGHT_EVENTS", default_value = "events.json")]
    events: String,
    /// Name of the bulb, used when the cache has none
    #[clap(long, env = "MEETING_LIGHT_ALIAS")]
    alias: Option<String>,
    /// Timeout for a single request to the bulb
    #[clap(long, default_value = "5")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let params = Params::parse();

    match &params.command.clone() {
        Commands::Scan => commands::scan(params).await?,
        Commands::Status => commands::status(params).await?,
        Commands::Set { color } => commands::set_color(params, *color).await?,
        Commands::Join { meeting_id } => commands::join(params, meeting_id.as_deref()).await?,
        Commands::Reconcile => commands::reconcile(params).await?,
        Commands::Events { command } => match command {
            EventCommands::List => commands::list_events(params)?,
            EventCommands::Purge => commands::purge_events(params)?,
            EventCommands::Import { file } => commands::import_events(params, file)?,
        },
    }

    Ok(())
}
