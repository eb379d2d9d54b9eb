//! Stderr logger for the `ets-assert` binary.

use log::{LevelFilter, Log, Metadata, Record};

use crate::cli::VerbosityLevel;

/// Writes `log` records to stderr, one line each
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            level: verbosity.log_level(),
        }
    }

    /// Install as the global logger. Later calls are ignored.
    pub fn init(verbosity: VerbosityLevel) {
        let logger = Self::new(verbosity);
        let level = logger.level;
        if log::set_boxed_logger(Box::new(logger)).is_ok() {
            log::set_max_level(level);
        }
    }

    fn format(record: &Record<'_>) -> String {
        format!(
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Self::format(record));
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_level_follows_verbosity() {
        let quiet = StderrLogger::new(VerbosityLevel::Quiet);
        let debug = StderrLogger::new(VerbosityLevel::Debug);
        let warn = Metadata::builder().level(Level::Warn).build();

        assert!(!quiet.enabled(&warn));
        assert!(debug.enabled(&warn));
        assert!(!debug.enabled(&Metadata::builder().level(Level::Trace).build()));
    }

    #[test]
    fn test_record_format() {
        assert_eq!(
            StderrLogger::format(
                &Record::builder()
                    .level(Level::Debug)
                    .target("ets_core::resolver")
                    .args(format_args!("Wrote {} bytes", 42))
                    .build()
            ),
            "[DEBUG ets_core::resolver] Wrote 42 bytes"
        );
    }
}
