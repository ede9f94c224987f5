//! Self-update for executables distributed from a simple release repository.
//!
//! A repository is a tree of `<version>/<os>/<arch>/` directories, each
//! holding a `release.json` manifest and a bzip2-compressed binary. The
//! [`Updater`] fetches the manifest for a requested version, downloads and
//! decompresses the binary next to the running executable, verifies its
//! SHA-256 checksum, backs up the live file and swaps the new one in with a
//! rename. A failed swap is rolled back from the backup.
//!
//! # Example
//!
//! ```no_run
//! use updater::{Config, Updater};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let updater = Updater::new();
//! let result = updater.apply(
//!     Config::builder()
//!         .source_repo("https://releases.example.net/app")
//!         .version("1.2.0")
//!         .current_version(env!("CARGO_PKG_VERSION")),
//! );
//!
//! if let Err(err) = result {
//!     if let Some(rollback) = updater::rollback_error(&err) {
//!         eprintln!("update failed and could not be rolled back: {}", rollback);
//!     }
//!     return Err(err.into());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Repositories are produced with [`publisher::publish_binary`], or the
//! `update-repo` command built on it.

mod config;
pub mod download;
mod error;
mod logger;
mod manifest;
pub mod publisher;
mod swap;
mod updater;

pub use config::{host_arch, host_os, versions_match, Config, ConfigBuilder};
pub use download::{Downloader, HttpDownloader, LocalDownloader};
pub use error::{rollback_error, UpdateError, UpdateResult};
pub use logger::{Logger, NullLogger, StdoutLogger, TracingLogger};
pub use manifest::{ReleaseManifest, MANIFEST_FILENAME};
pub use swap::{backup_target, swap_new};
pub use updater::Updater;
