//! Logging configuration for the CLI: one explicit value, built by the
//! entry point, that installs a `tracing` subscriber printing
//! `LEVEL - message` lines to stderr.
use std::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::error::{Error, Result};

/// Formats events as `LEVEL - message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMessageFormat;

impl<S, N> FormatEvent<S, N> for LevelMessageFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} - ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Most verbose level emitted for this crate
    pub level: Level,
    /// Target prefix `level` applies to; everything else logs at WARN
    pub target: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            target: env!("CARGO_CRATE_NAME").to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::new(format!(
            "warn,{}={}",
            self.target,
            self.level.as_str().to_ascii_lowercase()
        ))
    }

    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(&self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .event_format(LevelMessageFormat)
            .try_init()
            .map_err(Error::external)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(config: &LoggingConfig, emit: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(config.filter())
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .event_format(LevelMessageFormat)
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn lines_are_level_dash_message() {
        let out = capture(&LoggingConfig::default(), || {
            tracing::info!("Available projects: A, B");
            tracing::debug!("connected");
        });
        assert_eq!(out, "INFO - Available projects: A, B\nDEBUG - connected\n");
    }

    #[test]
    fn default_is_debug_for_this_crate_only() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::DEBUG);
        let out = capture(&config, || {
            tracing::debug!(target: "ureq::unit", "noise");
            tracing::warn!(target: "ureq::unit", "problem");
        });
        assert_eq!(out, "WARN - problem\n");
    }
}
