//! Line logger for the binaries.
//!
//! Every connection runs on its own thread, so each line carries the thread
//! name next to the emitting module. Output goes to stderr; stdout is left
//! to the machine-readable reports.

use std::env;
use std::io::Write;
use std::thread;

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable holding the log level filter.
pub const LOG_ENV: &str = "ARMADA_LOG";

struct ThreadLogger;

impl Log for ThreadLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let current = thread::current();
        let name = current.name().unwrap_or("worker");
        let target = record.target().trim_start_matches("armada::");
        let _ = writeln!(
            std::io::stderr().lock(),
            "{:<5} [{}] {}: {}",
            record.level(),
            name,
            target,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: ThreadLogger = ThreadLogger;

/// Install the logger at the level named by `ARMADA_LOG`, or `info`.
pub fn init_logging() {
    init_logging_with(LevelFilter::Info);
}

/// Same as [`init_logging`] with a caller-chosen fallback level. Calling it
/// again once a logger is installed has no effect.
pub fn init_logging_with(default: LevelFilter) {
    let level = env::var(LOG_ENV)
        .ok()
        .and_then(|lvl| lvl.parse().ok())
        .unwrap_or(default);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
