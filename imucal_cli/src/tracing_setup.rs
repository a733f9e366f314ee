//! Tracing subscriber assembly: stderr console output plus an optional
//! rotating JSON-lines file sink per the `[logging]` config.

use crate::cli::FILE_GUARD;
use std::path::Path;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer as _, SubscriberExt},
    util::SubscriberInitExt,
};

fn filter_or_info(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing(console_level: &str, logging: &imucal_config::Logging) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter_or_info(console_level));

    // each sink carries its own filter so the console level never caps the
    // file sink
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = logging.file.as_deref().map(|path| {
        let p = Path::new(path);
        let dir = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = p
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("imucal.log"));
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        // the file sink keeps its own level so a quiet console can coexist
        // with a verbose on-disk record
        let sink_level = logging.level.as_deref().unwrap_or(console_level);
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(filter_or_info(sink_level))
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}
