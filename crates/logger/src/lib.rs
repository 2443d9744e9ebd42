//! Lightweight logger with a runtime level, a runtime verbose flag and an
//! optional file sink.
//!
//! - `error!` and `warn!` go to stderr, `info!` and `debug!` to stdout.
//! - `verbose!` is a plain printer with no tags, gated by the verbose flag.
//! - When file logging is initialized, leveled messages are also appended
//!   to the file (verbose output is not).

use std::fmt::Arguments;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

/// Logging levels, ordered by severity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Error-level messages.
    Error = 1,
    /// Warning-level messages.
    Warn = 2,
    /// Informational messages.
    Info = 3,
    /// Debug-level messages.
    Debug = 4,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);
static VERBOSE_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Set the global log level.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Get the current global log level.
#[must_use]
pub fn level() -> Level {
    match LOG_LEVEL.load(Ordering::SeqCst) {
        1 => Level::Error,
        2 => Level::Warn,
        4 => Level::Debug,
        _ => Level::Info,
    }
}

/// Parse and set the level from a string (case-insensitive).
/// Returns `true` on success.
#[must_use]
pub fn set_level_from_str(level: &str) -> bool {
    match level.to_ascii_lowercase().as_str() {
        "error" | "err" => {
            set_level(Level::Error);
            true
        }
        "warn" | "warning" => {
            set_level(Level::Warn);
            true
        }
        "info" => {
            set_level(Level::Info);
            true
        }
        "debug" => {
            set_level(Level::Debug);
            true
        }
        _ => false,
    }
}

/// Enable plain verbose output.
pub fn enable_verbose() {
    VERBOSE_ENABLED.store(true, Ordering::SeqCst);
}

/// Disable plain verbose output.
pub fn disable_verbose() {
    VERBOSE_ENABLED.store(false, Ordering::SeqCst);
}

/// Returns whether verbose output is enabled.
#[must_use]
pub fn is_verbose_enabled() -> bool {
    VERBOSE_ENABLED.load(Ordering::SeqCst)
}

/// Open (append) a log file and route subsequent leveled messages to it.
/// Returns `true` when the file could be opened.
pub fn init_file_logging<P: AsRef<Path>>(path: P) -> bool {
    let opened = OpenOptions::new().create(true).append(true).open(path);
    match opened {
        Ok(file) => {
            if let Ok(mut slot) = LOG_FILE.lock() {
                *slot = Some(file);
                return true;
            }
            false
        }
        Err(_) => false,
    }
}

/// Close the log file, if any.
pub fn shutdown_file_logging() {
    if let Ok(mut slot) = LOG_FILE.lock() {
        *slot = None;
    }
}

#[doc(hidden)]
pub fn __log(message_level: Level, args: Arguments<'_>) {
    if (message_level as u8) > LOG_LEVEL.load(Ordering::SeqCst) {
        return;
    }
    let line = format!("[{}] {args}", message_level.tag());
    match message_level {
        Level::Error | Level::Warn => eprintln!("{line}"),
        Level::Info | Level::Debug => println!("{line}"),
    }
    if let Ok(mut slot) = LOG_FILE.lock() {
        if let Some(file) = slot.as_mut() {
            let _ = writeln!(file, "{line}");
        }
    }
}

#[doc(hidden)]
pub fn __verbose(args: Arguments<'_>) {
    if VERBOSE_ENABLED.load(Ordering::SeqCst) {
        println!("{args}");
    }
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__log($crate::Level::Error, format_args!($($arg)*)) };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__log($crate::Level::Warn, format_args!($($arg)*)) };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__log($crate::Level::Info, format_args!($($arg)*)) };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__log($crate::Level::Debug, format_args!($($arg)*)) };
}

/// Print an untagged message when verbose output is enabled.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => { $crate::__verbose(format_args!($($arg)*)) };
}
