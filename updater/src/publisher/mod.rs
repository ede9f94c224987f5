//! Release publisher for file-based update repositories.
//!
//! Adds a built binary to a repository tree that [`HttpDownloader`] and
//! [`LocalDownloader`] can serve:
//!
//! 1. Validate the binary and the repository root
//! 2. Copy the binary to `<root>/<version>/<os>/<arch>/<name>-<os>-<arch>-<version>`
//! 3. Verify the copy against the source checksum
//! 4. Compress the copy to `.bz2` and drop the uncompressed file
//! 5. Write `release.json` next to the artifact
//!
//! # Example
//!
//! ```ignore
//! use updater::publisher::{publish_binary, PublishOptions};
//!
//! let published = publish_binary(&PublishOptions {
//!     binary: "target/release/app".into(),
//!     version: "1.2.0".into(),
//!     os: "linux".into(),
//!     arch: "amd64".into(),
//!     repo: "/srv/releases".into(),
//!     force: false,
//! })?;
//! println!("{}", published.artifact_path.display());
//! ```
//!
//! [`HttpDownloader`]: crate::HttpDownloader
//! [`LocalDownloader`]: crate::LocalDownloader

mod error;
mod release;

pub use error::{PublishError, PublishResult};
pub use release::{artifact_name, publish_binary, PublishOptions, PublishedRelease};
