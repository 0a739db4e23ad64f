//! Tracing setup: stdout always, plus a daily-rolling file when
//! `ENABLE_FILE_LOGS` is set.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,danci_survey=info,danci_survey_backend=info";

/// Keeps the non-blocking file writer flushing until dropped
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileLogOptions {
    pub dir: PathBuf,
    pub file_prefix: String,
}

impl FileLogOptions {
    /// `None` unless `ENABLE_FILE_LOGS` is `true` or `1`
    pub fn from_env() -> Option<Self> {
        let enabled = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if !enabled {
            return None;
        }
        Some(Self {
            dir: std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs")),
            file_prefix: "survey-backend.log".to_string(),
        })
    }
}

pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing(log_level: &str, file: Option<FileLogOptions>) -> Option<FileLogGuard> {
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(options) = file {
        match std::fs::create_dir_all(&options.dir) {
            Err(err) => {
                eprintln!(
                    "failed to create log directory {}: {err}",
                    options.dir.display()
                );
            }
            Ok(()) => {
                let appender =
                    RollingFileAppender::new(Rotation::DAILY, &options.dir, &options.file_prefix);
                let (file_writer, guard) = tracing_appender::non_blocking(appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(env_filter(log_level))
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();

                return Some(FileLogGuard { _guard: guard });
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(stdout_layer)
        .init();

    None
}

