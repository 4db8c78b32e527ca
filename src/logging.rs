use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "city_scrapers=info";

/// Initializes console output plus a daily-rotated JSON log under `logs/`.
///
/// The returned guard flushes the file writer when dropped, so hold it for the
/// lifetime of the program.
pub fn init_logging() -> WorkerGuard {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "city_scrapers.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_DIRECTIVE.parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
