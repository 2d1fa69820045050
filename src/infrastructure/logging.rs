//! Logger Setup
//!
//! Console output goes to stderr. Stdout, or the serial link, carries only
//! command responses.

use crate::domain::settings::LogSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target of every event emitted by this crate
const BEACON_TARGET: &str = "gps_beacon";

/// Level applied to dependencies when only a bare level is configured
const DEPENDENCY_LEVEL: &str = "warn";

/// Holds the file writer's worker; dropping it flushes pending records
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level.
pub fn init_logger(settings: &LogSettings) -> anyhow::Result<LoggingGuard> {
    let mut guards = Vec::new();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(&settings.level)))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives("info")));

    let console_layer = settings.console_logging_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(settings.show_file_line)
            .with_line_number(settings.show_file_line)
            .with_thread_ids(settings.show_thread_ids)
            .with_target(settings.show_target)
            .with_ansi(settings.ansi_colors)
    });

    let file_layer = if settings.file_logging_enabled {
        let appender = RollingFileAppender::new(
            rotation(&settings.rotation),
            &settings.log_dir,
            &settings.file_name_prefix,
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(settings.show_file_line)
                .with_line_number(settings.show_file_line)
                .with_thread_ids(settings.show_thread_ids)
                .with_target(settings.show_target),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;

    tracing::info!(
        "Logger ready (level {}, file logging {})",
        settings.level,
        if settings.file_logging_enabled { "on" } else { "off" }
    );

    Ok(LoggingGuard { _guards: guards })
}

/// Expand a bare level into per-target directives
///
/// The level applies to the beacon itself; tokio and the serial driver stay
/// at `warn`. Anything that already looks like a directive list is kept.
fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("{},{}={}", DEPENDENCY_LEVEL, BEACON_TARGET, level)
}

fn rotation(name: &str) -> Rotation {
    match name.to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}
