//! CLI error type.

use std::fmt;
use std::process;

use updater::publisher::PublishError;

/// Errors surfaced by `update-repo` commands.
#[derive(Debug)]
pub enum CliError {
    /// Logging could not be initialized.
    Logging(String),
    /// Publishing the binary failed.
    Publish(PublishError),
}

impl CliError {
    /// Print the error to stderr and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("error: {}", self);
        process::exit(1);
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Logging(msg) => write!(f, "could not initialize logging: {}", msg),
            CliError::Publish(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Publish(e) => Some(e),
            CliError::Logging(_) => None,
        }
    }
}

impl From<PublishError> for CliError {
    fn from(e: PublishError) -> Self {
        CliError::Publish(e)
    }
}
