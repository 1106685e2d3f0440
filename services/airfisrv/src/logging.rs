//! Logging setup for airfisrv
//!
//! Console output looks like `2025-12-02T00:50:44.809000Z [INFO] message`,
//! or one JSON object per line when `log.json` is set.

use tracing::Level;
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::{AirfiError, Result};

/// Bracketed level tag: `[INFO]`, `[WARN]`, ...
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter producing `timestamp [LEVEL] message fields`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Console logging options
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// EnvFilter directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
    pub ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            ansi: true,
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn filter_directive(rust_log: Option<String>, configured: &str) -> String {
    match rust_log {
        Some(env) if !env.trim().is_empty() => env,
        _ => configured.to_string(),
    }
}

/// Install the global subscriber
pub fn init(options: &LoggingOptions) -> Result<()> {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), &options.level);
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| AirfiError::config(format!("Invalid log level '{}': {}", directive, e)))?;

    let console_layer = if options.json {
        fmt::layer()
            .json()
            .with_level(true)
            .with_target(true)
            .with_span_events(FmtSpan::NONE)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(options.ansi)
            .event_format(BracketedLevelFormat)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| AirfiError::config(format!("Failed to install logger: {}", e)))?;

    tracing::debug!("Logging initialized with filter '{}'", directive);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_takes_precedence() {
        assert_eq!(
            filter_directive(Some("airfisrv=trace".to_string()), "info"),
            "airfisrv=trace"
        );
        assert_eq!(filter_directive(None, "debug"), "debug");
        assert_eq!(filter_directive(Some("  ".to_string()), "warn"), "warn");
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
    }
}
