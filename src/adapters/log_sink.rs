//! Log-based event sink adapters.
//!
//! [`LogEventSink`] forwards every [`OtaEvent`] to the `log` facade, which
//! `esp_idf_logger` routes to UART / USB-CDC in production. [`LineSink`]
//! hands the rendered line to any closure instead (a display, a test
//! recorder, a secondary console).

use log::log;

use crate::app::events::OtaEvent;
use crate::app::ports::EventSink;

/// Prefix on every line, so update traffic is easy to grep on a shared console.
pub const LOG_PREFIX: &str = "[ota] ";

/// Adapter that logs every [`OtaEvent`] at the event's own level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &OtaEvent<'_>) {
        log!(event.level(), "{LOG_PREFIX}{event}");
    }
}

/// Adapter that renders each event and passes the prefixed line to `F`.
pub struct LineSink<F> {
    write_line: F,
}

impl<F: FnMut(&str)> LineSink<F> {
    pub fn new(write_line: F) -> Self {
        Self { write_line }
    }
}

impl<F: FnMut(&str)> EventSink for LineSink<F> {
    fn emit(&mut self, event: &OtaEvent<'_>) {
        let line = format!("{LOG_PREFIX}{event}");
        (self.write_line)(&line);
    }
}
