//! A small `log` backend for the simulator binary: one coloured line per
//! record on stderr.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Environment variable holding the level name.
pub const LEVEL_VAR: &str = "MLFQ_LOG";

#[derive(Debug, Clone, Copy)]
enum Color {
    Red = 31,
    Yellow = 93,
    Magenta = 35,
    Green = 32,
    Blue = 34,
}

impl Color {
    fn of(level: Level) -> Color {
        match level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Magenta,
            Level::Debug => Color::Green,
            Level::Trace => Color::Blue,
        }
    }
}

struct SimLogger {
    level: LevelFilter,
}

impl Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = Color::of(record.level()) as u8;
        let mut stderr = std::io::stderr().lock();
        // nowhere to report a failed write to stderr
        let _ = writeln!(
            stderr,
            "\x1B[{}m[{}] [mlfq] {}\x1B[0m",
            color,
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parse a level name, `off` and `error`..`trace`, case-insensitive.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// The level named by `MLFQ_LOG`, `info` if unset or unreadable.
pub fn level_from_env() -> LevelFilter {
    std::env::var(LEVEL_VAR)
        .ok()
        .and_then(|name| parse_level(&name))
        .unwrap_or(LevelFilter::Info)
}

/// Install the logger. Fails if another logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(SimLogger { level }))?;
    log::set_max_level(level);
    Ok(())
}
