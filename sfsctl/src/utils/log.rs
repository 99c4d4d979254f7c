// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

impl LogLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => LogLevel::Quiet,
            (true, false) => LogLevel::Verbose,
            _ => LogLevel::Normal,
        }
    }

    /// Default `env_logger` filter for library records when `RUST_LOG` is unset.
    pub fn filter(self) -> ::log::LevelFilter {
        match self {
            LogLevel::Quiet => ::log::LevelFilter::Error,
            LogLevel::Normal => ::log::LevelFilter::Warn,
            LogLevel::Verbose => ::log::LevelFilter::Debug,
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        2 => LogLevel::Verbose,
        _ => LogLevel::Normal,
    }
}

/// Sets the console level and installs `env_logger` for the library's `log` records.
pub fn init(level: LogLevel) {
    set_log_level(level);
    env_logger::Builder::new()
        .filter_level(level.filter())
        .parse_default_env()
        .format_target(false)
        .init();
}

/// Status lines go to stderr; stdout carries command output only.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::utils::log_level() != $crate::utils::LogLevel::Quiet {
            eprintln!("[sfsctl] {}", format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($($arg:tt)*) => {
        if $crate::utils::log_level() == $crate::utils::LogLevel::Verbose {
            eprintln!("[sfsctl] {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_to_level() {
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
        assert_eq!(LogLevel::from_flags(true, false), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
        assert_eq!(LogLevel::Verbose.filter(), ::log::LevelFilter::Debug);
    }
}
