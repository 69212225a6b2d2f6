//! Per-module debug logging controlled by the `DEBUG` environment variable.
//!
//! Each logger has a name; `DEBUG=engine` enables the `engine` logger at
//! level 1, `DEBUG=engine=2` raises its verbosity, `DEBUG=engine,charset`
//! enables several, and `DEBUG=*` enables every logger. A disabled logger
//! costs one branch per call site when used through the macros.

use std::env;
use std::sync::OnceLock;

struct Config {
    /// Level granted to every logger by a `*` entry.
    all: u8,
    /// Levels granted to named loggers.
    named: Vec<(String, u8)>,
}

fn config() -> &'static Config {
    static CONFIG: OnceLock<Config> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let raw = env::var("DEBUG").unwrap_or_default();
        let mut all = 0;
        let mut named = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, level) = match entry.split_once('=') {
                Some((name, level)) => (name.trim(), level.trim().parse().unwrap_or(1)),
                None => (entry, 1),
            };
            match name {
                "*" | "all" | "1" | "true" => all = all.max(level),
                _ => named.push((name.to_string(), level)),
            }
        }
        Config { all, named }
    })
}

/// A named logger writing to stderr. The `DEBUG` lookup happens once, at
/// construction.
pub struct Logger {
    name: &'static str,
    level: u8,
}

impl Logger {
    pub fn new(name: &'static str) -> Self {
        let config = config();
        let level = config
            .named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, level)| *level)
            .unwrap_or(config.all);
        Self { name, level }
    }

    /// Whether messages at `level` are emitted.
    #[inline]
    pub fn enabled(&self, level: u8) -> bool {
        self.level >= level
    }

    pub fn write(&self, msg: &str) {
        eprintln!("[{}] {}", self.name, msg);
    }
}

/// Log at level 1. The message is only formatted when the logger is enabled.
#[macro_export]
macro_rules! logln {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled(1) {
            $logger.write(&format!($($arg)*));
        }
    };
}

/// Log at level 2, for per-step detail.
#[macro_export]
macro_rules! logln2 {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled(2) {
            $logger.write(&format!($($arg)*));
        }
    };
}
