use std::sync::atomic::{AtomicU8, Ordering};

use crate::Error;

static LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

fn enabled(level: Level) -> bool {
    level as u8 <= LEVEL.load(Ordering::Relaxed)
}

/// Writes one structured line per event. A real deployment would fan these
/// out to a subscriber (journald, OTLP, a ring buffer); here they go to
/// stderr, matching the teacher's policy of never letting a logging backend
/// become a hard dependency of business logic.
#[doc(hidden)]
pub fn emit(level: Level, event: &str, message: &str, details: Option<&str>) {
    if !enabled(level) {
        return;
    }
    let level_name = match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
    };
    match details {
        Some(details) => eprintln!("[{level_name}] {event}: {message} ({details})"),
        None => eprintln!("[{level_name}] {event}: {message}"),
    }
}

#[doc(hidden)]
pub fn emit_error(err: &Error) {
    emit(
        Level::Error,
        &format!("{:?}", err.event),
        &err.message,
        err.details.as_deref(),
    );
}

/// `trc::error!(err)` logs an [`Error`] at error level without consuming it.
#[macro_export]
macro_rules! error {
    ($err:expr) => {
        $crate::log::emit_error(&$err)
    };
}

/// `trc::warn!("event", "message")`
#[macro_export]
macro_rules! warn {
    ($event:expr, $msg:expr) => {
        $crate::log::emit($crate::Level::Warn, $event, $msg, None)
    };
}

/// `trc::info!("event", "message")`
#[macro_export]
macro_rules! info {
    ($event:expr, $msg:expr) => {
        $crate::log::emit($crate::Level::Info, $event, $msg, None)
    };
}

/// `trc::debug!("event", "message")`
#[macro_export]
macro_rules! debug {
    ($event:expr, $msg:expr) => {
        $crate::log::emit($crate::Level::Debug, $event, $msg, None)
    };
}
