//! Structured logging setup with tracing

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
///
/// Console output is pretty-printed in debug builds; the rolling JSON log
/// file is written in every build. `RUST_LOG` overrides the default `info`
/// filter.
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = super::log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "gallery.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the writer on drop; it has to live as long as the
    // process, so leak it.
    std::mem::forget(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .with(fmt::layer().json().with_writer(non_blocking))
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(non_blocking))
            .init();
    }

    tracing::info!("Logging initialized");
    Ok(())
}

/// Clean up log files older than the given number of days
///
/// Returns how many files were removed. Only `.log` files in the
/// application log directory are considered.
pub fn cleanup_old_logs(days: u32) -> anyhow::Result<usize> {
    cleanup_logs_in(&super::log_dir(), days)
}

fn cleanup_logs_in(log_dir: &Path, days: u32) -> anyhow::Result<usize> {
    use std::time::{Duration, SystemTime};

    if !log_dir.exists() {
        return Ok(0);
    }

    let threshold = SystemTime::now() - Duration::from_secs(days as u64 * 24 * 60 * 60);
    let mut deleted = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.extension().map_or(false, |ext| ext == "log") {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if let Ok(modified) = modified {
            if modified < threshold && std::fs::remove_file(&path).is_ok() {
                deleted += 1;
                tracing::debug!("Deleted old log: {:?}", path);
            }
        }
    }

    tracing::info!("Cleaned up {} old log files", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_old_log_files() {
        let dir = std::env::temp_dir().join(format!("gallery_log_cleanup_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(dir.join("old.log"), b"log").unwrap();
        std::fs::write(dir.join("notes.txt"), b"keep").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        // days = 0 makes every existing file "old"
        let deleted = cleanup_logs_in(&dir, 0).unwrap();
        assert_eq!(deleted, 1);
        assert!(!dir.join("old.log").exists());
        assert!(dir.join("notes.txt").exists());

        std::fs::write(dir.join("fresh.log"), b"log").unwrap();
        let deleted = cleanup_logs_in(&dir, 7).unwrap();
        assert_eq!(deleted, 0);
        assert!(dir.join("fresh.log").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = std::env::temp_dir().join(format!("gallery_log_missing_{}", std::process::id()));
        assert_eq!(cleanup_logs_in(&dir, 7).unwrap(), 0);
    }
}
