//! Clean-stdout formatter for the diagnostics layer.
//!
//! `main::init_logging` mirrors every diagnostic event (connection setup,
//! pool fill/drain, server-error rate-limiting) to stdout through this
//! formatter, colored by severity and stripped of timestamps/targets, so an
//! operator watching a terminal sees plain colored lines rather than the
//! detailed file/stderr sink's structured output. It is suppressed entirely
//! whenever the benchmark report itself owns stdout (`-q`/`--csv`).

use std::fmt;

use colored::{ColoredString, Colorize};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

pub struct DiagnosticsFormatter;

impl<S, N> FormatEvent<S, N> for DiagnosticsFormatter
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
        let mut line = String::new();
        ctx.format_fields(Writer::new(&mut line), event)?;
        writeln!(writer, "{}", colorize(*event.metadata().level(), &line))
    }
}

fn colorize(level: Level, line: &str) -> ColoredString {
    match level {
        Level::ERROR => line.red(),
        Level::WARN => line.yellow(),
        Level::INFO => line.white(),
        Level::DEBUG | Level::TRACE => line.blue(),
    }
}
