use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::APP_DIR_NAME;

const LOG_FILE_NAME: &str = "faceit-presence.log";
const KEEP_LOG_DAYS: u64 = 7;

/// Set up console and daily rolling file logging.
///
/// `RUST_LOG` wins over `debug`. The returned guard flushes the file writer
/// when dropped, so keep it alive for the whole run.
pub fn init_logging(debug: bool) -> WorkerGuard {
    let log_dir = get_log_directory();

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            "debug,hyper=warn,reqwest=warn"
        } else {
            "info,hyper=warn,reqwest=warn"
        })
    });

    let console_layer = fmt::layer()
        .with_target(debug)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());
    tracing::info!("faceit-presence version: {}", env!("CARGO_PKG_VERSION"));

    cleanup_old_logs(&log_dir, KEEP_LOG_DAYS);

    guard
}

fn get_log_directory() -> PathBuf {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("logs");

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    log_dir
}

/// Delete rotated log files older than `keep_days`. The live file is kept.
fn cleanup_old_logs(log_dir: &Path, keep_days: u64) -> usize {
    let max_age = Duration::from_secs(keep_days.saturating_mul(24 * 60 * 60));
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return 0;
    };

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();

        let is_rotated = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_NAME) && name != LOG_FILE_NAME);
        if !is_rotated {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };

        if modified < cutoff {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
            } else {
                tracing::debug!("Removed old log file: {:?}", path);
                removed += 1;
            }
        }
    }
    removed
}
