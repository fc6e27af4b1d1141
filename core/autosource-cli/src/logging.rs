//! Logging setup for the autosource binary.
//!
//! Stdout belongs to the shell (our output is eval'd), so the default
//! subscriber writes warnings to stderr only. Setting `AUTOSOURCE_DEBUG_LOG`
//! redirects debug-level logs to a daily-rotated file under the cache dir,
//! keeping the interactive prompt clean while debugging hook behavior.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn init() -> Option<WorkerGuard> {
    let debug_enabled = std::env::var("AUTOSOURCE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);

    if debug_enabled {
        if let Some(guard) = try_init_file_logging() {
            return Some(guard);
        }
        // Fall through to stderr if the log dir is unusable.
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    None
}

fn try_init_file_logging() -> Option<WorkerGuard> {
    let log_dir = dirs::cache_dir()?.join("autosource").join("logs");
    fs_err::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::daily(&log_dir, "autosource.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
