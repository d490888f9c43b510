mod logging;
mod poller;
mod settings;
#[cfg(test)]
mod test_helper;
mod web;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use logging::{LogConfig, RotationPeriod, setup_logging};
use settings::Settings;
use tracing::info;
use web::AppState;
use web::metrics::{Metrics, init_metrics};
use web::state::ServiceState;

#[derive(Parser, Debug)]
pub struct Params {
    /// Settings file path (if not set, default settings are used)
    #[clap(long)]
    settings: Option<String>,
    /// Port to listen on, overrides the settings file
    #[clap(long)]
    port: Option<u16>,
    /// Directory for rolling log files (if not set, logs to stdout only)
    #[clap(long)]
    log_dir: Option<String>,
    /// Prefix for log file names
    #[clap(long, default_value = "meeting-light")]
    log_prefix: String,
    /// Log rotation period: minutely, hourly, daily or never
    #[clap(long, default_value = "daily")]
    log_rotation: RotationPeriod,
    /// Number of rotated log files to keep (0 keeps all)
    #[clap(long, default_value = "7")]
    max_log_files: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let params = Params::parse();

    let _log_guard = setup_logging(params.log_dir.as_ref().map(|dir| LogConfig {
        log_dir: dir.clone(),
        log_prefix: params.log_prefix.clone(),
        rotation: params.log_rotation,
        max_log_files: params.max_log_files,
    }))?;

    let settings = Settings::load(params.settings.as_deref());
    let port = params.port.unwrap_or(settings.port);
    let service = Arc::new(settings.build_service()?);
    let state = ServiceState::new();

    let metrics_handle = init_metrics()?;
    Metrics::set_info(env!("CARGO_PKG_VERSION"));

    let poll_interval = Some(settings.poll_interval()).filter(|i| !i.is_zero());
    web::start_web_server(
        port,
        AppState {
            service: service.clone(),
            state: state.clone(),
            metrics_handle,
            poll_interval,
        },
    )
    .await?;

    let poller = poller::spawn_poller(service, state, settings.poll_interval());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    if let Some(poller) = poller {
        poller.abort();
    }
    Ok(())
}
