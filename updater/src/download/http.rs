//! HTTP-based release downloader.
//!
//! Releases are served by any plain web server using the repository layout:
//!
//! ```text
//! root/<version>/<os>/<arch>/release.json
//! root/<version>/<os>/<arch>/<binary>.bz2
//! ```

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};

use super::stage::{install_decompressed, target_permissions};
use super::Downloader;
use crate::config::Config;
use crate::error::{UpdateError, UpdateResult};
use crate::manifest::{ReleaseManifest, MANIFEST_FILENAME};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Downloads releases from an HTTP(S) server.
///
/// Each request either succeeds or fails once; there are no retries. A
/// deadline for the whole request is set with [`with_timeout`](Self::with_timeout).
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    pub(crate) timeout: Duration,
}

impl HttpDownloader {
    /// Create a new HTTP downloader with default settings.
    pub fn new() -> UpdateResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new HTTP downloader with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> UpdateResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                UpdateError::InvalidConfig(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }

    /// Issue a GET and require a 200 response.
    fn get(&self, url: &str) -> UpdateResult<Response> {
        let response = self.client.get(url).send().map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                e.to_string()
            };
            UpdateError::Http {
                url: url.to_string(),
                reason,
            }
        })?;

        if response.status() != StatusCode::OK {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: response.status().to_string(),
            });
        }

        Ok(response)
    }
}

impl Downloader for HttpDownloader {
    fn configure(&self, config: &Config) -> UpdateResult<()> {
        let url = Url::parse(config.source_repo()).map_err(|e| {
            UpdateError::InvalidConfig(format!(
                "source repo {} is not a valid URL: {}",
                config.source_repo(),
                e
            ))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(UpdateError::InvalidConfig(format!(
                "source repo {} uses unsupported scheme {}, expected http or https",
                config.source_repo(),
                scheme
            ))),
        }
    }

    fn fetch_manifest(&self, config: &Config) -> UpdateResult<ReleaseManifest> {
        let location = config.release_location();
        let manifest_url = format!("{}/{}", location, MANIFEST_FILENAME);

        tracing::debug!(url = %manifest_url, "fetching release manifest");

        let body = self
            .get(&manifest_url)?
            .bytes()
            .map_err(|e| UpdateError::Http {
                url: manifest_url.clone(),
                reason: format!("could not read response: {}", e),
            })?;

        let mut manifest =
            ReleaseManifest::from_json(&body).map_err(|e| UpdateError::ManifestParse {
                location: manifest_url.clone(),
                reason: e.to_string(),
            })?;

        let binary_url = format!("{}/{}", location, manifest.binary_path);
        Url::parse(&binary_url)
            .map_err(|e| UpdateError::InvalidBinaryLocation(format!("{}: {}", binary_url, e)))?;
        manifest.binary_uri = Some(binary_url);

        Ok(manifest)
    }

    fn fetch_binary(
        &self,
        config: &Config,
        manifest: &ReleaseManifest,
        dest: &Path,
    ) -> UpdateResult<()> {
        let permissions = target_permissions(config.target_file())?;

        let url = manifest.binary_uri.as_deref().ok_or_else(|| {
            UpdateError::InvalidBinaryLocation(format!(
                "manifest for {} has no location",
                manifest.binary_path
            ))
        })?;

        config.logger().log(&format!("Fetching {}", url));

        let response = self.get(url)?;
        let written = install_decompressed(response, url, dest, permissions)?;

        config
            .logger()
            .log(&format!("Fetched {} bytes from {}", written, url));

        Ok(())
    }
}
