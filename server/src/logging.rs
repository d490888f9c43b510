//! Console logging, optionally mirrored to rolling log files.
//!
//! Rotation is handled by `tracing-appender`, old files are pruned at start.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl std::str::FromStr for RotationPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minutely" | "minute" => Ok(RotationPeriod::Minutely),
            "hourly" | "hour" => Ok(RotationPeriod::Hourly),
            "daily" | "day" => Ok(RotationPeriod::Daily),
            "never" | "none" => Ok(RotationPeriod::Never),
            _ => Err(format!(
                "Invalid rotation period '{}'. Valid options: minutely, hourly, daily, never",
                s
            )),
        }
    }
}

impl From<RotationPeriod> for Rotation {
    fn from(period: RotationPeriod) -> Self {
        match period {
            RotationPeriod::Minutely => Rotation::MINUTELY,
            RotationPeriod::Hourly => Rotation::HOURLY,
            RotationPeriod::Daily => Rotation::DAILY,
            RotationPeriod::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: String,
    pub log_prefix: String,
    pub rotation: RotationPeriod,
    /// Files kept after pruning, 0 keeps everything.
    pub max_log_files: usize,
}

/// Keep alive for the lifetime of the process; dropping it flushes the file
/// writer.
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// Logs to stdout, plus a rolling file when `file` is set. Levels follow
/// `RUST_LOG`.
pub fn setup_logging(file: Option<LogConfig>) -> std::io::Result<LogGuard> {
    let Some(config) = file else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
        return Ok(LogGuard { _guards: vec![] });
    };

    let log_dir = Path::new(&config.log_dir);
    if config.max_log_files > 0 {
        cleanup_old_logs(log_dir, &config.log_prefix, config.max_log_files)?;
    }

    let file_appender = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.log_prefix)
        .filename_suffix("log")
        .max_log_files(config.max_log_files)
        .build(log_dir)
        .map_err(std::io::Error::other)?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = Layer::default()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    let console_layer = Layer::default()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LogGuard {
        _guards: vec![file_guard],
    })
}

/// Removes the oldest `<prefix>*.log` files beyond `max_files`.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: usize) -> std::io::Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let mut log_files: Vec<_> = std::fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".log"))
        })
        .filter_map(|entry| {
            let mtime = entry.metadata().ok()?.modified().ok()?;
            Some((entry.path(), mtime))
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            eprintln!("Warning: failed to remove old log file {:?}: {}", path, e);
        }
    }

    Ok(())
}
