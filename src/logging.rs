use crate::config::Settings;
use crate::error::StartupError;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_NAME: &str = "taskdeck.log";

/// Where log lines go. The terminal is owned by the UI, so this is always a
/// file.
pub fn log_path(settings: &Settings) -> PathBuf {
    settings.log_file.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("taskdeck")
            .join(LOG_FILE_NAME)
    })
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Keep the guard alive until exit or buffered lines are
/// lost.
pub fn init(settings: &Settings) -> Result<WorkerGuard, StartupError> {
    let path = log_path(settings);
    let dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| LOG_FILE_NAME.into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(false);

    Registry::default().with(env_filter).with(fmt_layer).try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_log_file_wins() {
        let settings = Settings {
            log_file: Some(PathBuf::from("/tmp/board/debug.log")),
            ..Settings::default()
        };
        assert_eq!(log_path(&settings), PathBuf::from("/tmp/board/debug.log"));
    }

    #[test]
    fn test_default_log_file_name() {
        let path = log_path(&Settings::default());
        assert!(path.ends_with("taskdeck/taskdeck.log"));
    }
}
