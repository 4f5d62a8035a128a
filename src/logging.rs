//! Tracing setup for the pretraining binary.
//!
//! Console output is always on. `ENABLE_FILE_LOGS=true|1` adds a rolling
//! file under `LOG_DIR` (default `./logs`) named by `TELLO_LOG_FILE`
//! (default `trainer.log`) and rotated per `TELLO_LOG_ROTATION`
//! (`daily`, `hourly` or `never`).

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_TARGET: &str = "tello_rl";
const DEFAULT_LOG_FILE: &str = "trainer.log";

/// Keeps the background file writer alive; hold it until process exit.
pub struct FileLogGuard {
    _guard: WorkerGuard,
    pub path: PathBuf,
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// A bare level such as `debug` applies to this crate only; dependencies
/// stay at `warn`. Full directives pass through unchanged.
pub fn filter_directive(log_level: &str) -> String {
    let level = log_level.trim();
    let is_bare_level = matches!(
        level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    );
    if is_bare_level {
        format!("warn,{CRATE_TARGET}={level}")
    } else {
        level.to_string()
    }
}

pub fn parse_rotation(value: &str) -> Rotation {
    match value.trim().to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{CRATE_TARGET}=info")));
    let stdout_layer = fmt::layer().with_target(true);

    if file_logging_enabled() {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
        let file_name =
            std::env::var("TELLO_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let rotation = std::env::var("TELLO_LOG_ROTATION")
            .map(|v| parse_rotation(&v))
            .unwrap_or(Rotation::DAILY);

        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let path = PathBuf::from(&log_dir).join(&file_name);
                let file_appender = RollingFileAppender::new(rotation, &log_dir, &file_name);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();

                tracing::info!(path = %path.display(), "writing trainer logs to file");
                return Some(FileLogGuard {
                    _guard: guard,
                    path,
                });
            }
            Err(err) => eprintln!("cannot create log directory {log_dir}: {err}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    None
}
