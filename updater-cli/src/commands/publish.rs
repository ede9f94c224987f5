//! Add a binary to a release repository.

use std::path::PathBuf;

use clap::Args;
use updater::publisher::{publish_binary, PublishOptions, PublishedRelease};

use crate::error::CliError;

/// Arguments for adding a binary to the repository.
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// The binary to add to the repository
    pub binary: PathBuf,

    /// The version this binary represents
    #[arg(long)]
    pub version: String,

    /// The architecture to add the binary to
    #[arg(long)]
    pub arch: String,

    /// The operating system to add the binary to
    #[arg(long)]
    pub os: String,

    /// The path to the repository
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

impl From<PublishArgs> for PublishOptions {
    fn from(args: PublishArgs) -> Self {
        PublishOptions {
            binary: args.binary,
            version: args.version,
            os: args.os,
            arch: args.arch,
            repo: args.repo,
            force: args.force,
        }
    }
}

/// Publish the binary and print where it went.
pub fn run(args: PublishArgs) -> Result<PublishedRelease, CliError> {
    let options = PublishOptions::from(args);
    let published = publish_binary(&options)?;

    println!("{}", summary(&options, &published));
    Ok(published)
}

fn summary(options: &PublishOptions, published: &PublishedRelease) -> String {
    format!(
        "Copied {} to {}",
        options.binary.display(),
        published.artifact_path.display()
    )
}
