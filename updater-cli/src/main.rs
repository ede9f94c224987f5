//! update-repo - manage release repositories for the updater library.
//!
//! Adds a binary to a repository tree that updater clients can fetch from:
//!
//! ```text
//! update-repo ./app --version 1.2.0 --os linux --arch amd64 --repo /srv/releases
//! ```

mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::publish::PublishArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "update-repo")]
#[command(about = "The update repository manager", long_about = None)]
struct Cli {
    #[command(flatten)]
    publish: PublishArgs,

    /// Log level e.g. trace, debug, info, warn, error
    #[arg(long, default_value = "warn")]
    log: tracing::Level,
}

fn init_logging(level: tracing::Level) -> Result<(), CliError> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .map_err(|e| CliError::Logging(e.to_string()))
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log) {
        e.exit();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "update-repo starting");

    if let Err(e) = commands::publish::run(cli.publish) {
        e.exit();
    }
}
