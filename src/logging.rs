//! Tracing setup shared by the binaries.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a stderr subscriber and, when enabled, a daily-rolling file
/// `<directory>/<file_prefix>.YYYY-MM-DD`.
///
/// `RUST_LOG` overrides `config.default_filter`. The returned guard must be
/// held for as long as file output should be flushed.
pub fn init(config: &LoggingConfig, file_prefix: &str) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = if config.file_enabled
        && std::fs::create_dir_all(&config.directory).is_ok()
    {
        let appender = tracing_appender::rolling::daily(&config.directory, file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter());
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
