//! Retrieval of release manifests and binaries.
//!
//! The updater is agnostic to how releases are fetched. Anything that can
//! resolve a manifest for a (version, OS, architecture) coordinate and
//! materialize its binary implements [`Downloader`]:
//!
//! ```text
//! Updater (orchestrator)
//!         │
//!         └── Downloader (trait)
//!                 ├── HttpDownloader   (plain GET against a web server)
//!                 └── LocalDownloader  (repository on a local filesystem)
//! ```
//!
//! Both implementations share the same repository layout:
//!
//! ```text
//! <root>/<version>/<os>/<arch>/release.json
//! <root>/<version>/<os>/<arch>/<binary>.bz2
//! ```

mod checksum;
mod http;
mod local;
mod stage;

use std::path::Path;

use crate::config::Config;
use crate::error::UpdateResult;
use crate::manifest::ReleaseManifest;

pub use checksum::{calculate_file_checksum, sha256_hex, verify_checksum};
pub use http::HttpDownloader;
pub use local::LocalDownloader;

/// Fetches release manifests and binaries from a repository.
pub trait Downloader: Send + Sync {
    /// Prepare the downloader for the given configuration.
    ///
    /// Runs once, after the configuration is validated. The default accepts
    /// any configuration.
    fn configure(&self, config: &Config) -> UpdateResult<()> {
        let _ = config;
        Ok(())
    }

    /// Fetch the manifest for the configured version, OS and architecture.
    ///
    /// The returned manifest has [`ReleaseManifest::binary_uri`] populated.
    fn fetch_manifest(&self, config: &Config) -> UpdateResult<ReleaseManifest>;

    /// Fetch the binary described by `manifest` and place it at `dest`.
    ///
    /// The artifact is decompressed on the fly. `dest` receives the
    /// permission mode of the configured target file and only appears once
    /// the download is complete.
    fn fetch_binary(
        &self,
        config: &Config,
        manifest: &ReleaseManifest,
        dest: &Path,
    ) -> UpdateResult<()>;
}
