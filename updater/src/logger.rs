//! Logger handle used for update milestones.
//!
//! The updater reports its milestones (update starting, binary saved, backup
//! created) through a [`Logger`] held by the configuration. Diagnostics below
//! that level go to `tracing` directly.

use std::io::{self, Write};

/// Receives human-readable milestone messages from the updater.
pub trait Logger: Send + Sync {
    /// Record a single message.
    fn log(&self, message: &str);
}

/// Writes each message to stdout with an `updater: ` prefix.
///
/// Installed when no logger is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, message: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "updater: {}", message);
    }
}

/// Forwards messages to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(target: "updater", "{}", message);
    }
}

/// Discards all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _message: &str) {}
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}
