//! Configuration for a single update attempt.
//!
//! A [`Config`] is assembled with [`ConfigBuilder`], validated once, and is
//! read-only afterwards. Each call to [`Updater::check`](crate::Updater::check)
//! or [`Updater::apply`](crate::Updater::apply) builds its own configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::download::{Downloader, HttpDownloader};
use crate::error::{UpdateError, UpdateResult};
use crate::logger::{Logger, StdoutLogger};
use crate::manifest::release_dir;

/// Validated settings for one update attempt.
pub struct Config {
    target_file: PathBuf,
    source_repo: String,
    version: String,
    current_version: Option<String>,
    public_key: Option<Vec<u8>>,
    os: String,
    arch: String,
    downloader: Box<dyn Downloader>,
    logger: Arc<dyn Logger>,
}

impl Config {
    /// Start building a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Absolute path of the file being updated.
    pub fn target_file(&self) -> &Path {
        &self.target_file
    }

    /// Root address of the release repository.
    pub fn source_repo(&self) -> &str {
        &self.source_repo
    }

    /// Version to install.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Version currently running, if known.
    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    /// Public key bytes. Carried only; nothing verifies signatures with it.
    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    /// Operating system coordinate of the release.
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Architecture coordinate of the release.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Retrieval capability used to fetch manifests and binaries.
    pub fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }

    /// Logger receiving update milestones.
    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Location of the release directory: `<repo>/<version>/<os>/<arch>`.
    ///
    /// A trailing `/` on the repository address is ignored.
    pub fn release_location(&self) -> String {
        format!(
            "{}/{}",
            self.source_repo.trim_end_matches('/'),
            release_dir(&self.version, &self.os, &self.arch)
        )
    }

    /// Path the candidate binary is downloaded to: `<target>.new`.
    pub fn new_path(&self) -> PathBuf {
        sibling_path(&self.target_file, "new")
    }

    /// Path the live target is moved to during the swap: `<target>.old`.
    pub fn old_path(&self) -> PathBuf {
        sibling_path(&self.target_file, "old")
    }

    /// Path of the backup copy of the live target: `<target>.backup`.
    pub fn backup_path(&self) -> PathBuf {
        sibling_path(&self.target_file, "backup")
    }

    /// Whether the running version already is the requested version.
    ///
    /// Always `false` when no current version was configured.
    pub fn is_current(&self) -> bool {
        self.current_version
            .as_deref()
            .is_some_and(|current| versions_match(current, &self.version))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("target_file", &self.target_file)
            .field("source_repo", &self.source_repo)
            .field("version", &self.version)
            .field("current_version", &self.current_version)
            .field("public_key", &self.public_key.as_ref().map(|k| k.len()))
            .field("os", &self.os)
            .field("arch", &self.arch)
            .finish_non_exhaustive()
    }
}

/// Fails on the first missing required field.
fn validate(target_file: &Path, source_repo: &str, version: &str) -> UpdateResult<()> {
    if target_file.as_os_str().is_empty() {
        return Err(missing("no target file specified, please use target_file()"));
    }

    if source_repo.is_empty() {
        return Err(missing("no source repo given, please use source_repo()"));
    }

    if version.is_empty() {
        return Err(missing("no version given, please use version()"));
    }

    Ok(())
}

fn missing(message: &str) -> UpdateError {
    UpdateError::InvalidConfig(message.to_string())
}

/// `<file>.<suffix>`, keeping any existing extension of `file`.
pub(crate) fn sibling_path(file: &Path, suffix: &str) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Builder for [`Config`].
///
/// Unset values fall back to defaults in [`build`](Self::build): the running
/// executable as target, the host OS and architecture, a stdout logger and an
/// HTTP downloader.
#[derive(Default)]
pub struct ConfigBuilder {
    target_file: Option<PathBuf>,
    source_repo: Option<String>,
    version: Option<String>,
    current_version: Option<String>,
    public_key: Option<Vec<u8>>,
    os: Option<String>,
    arch: Option<String>,
    downloader: Option<Box<dyn Downloader>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ConfigBuilder {
    /// Set the file to update. Relative paths are resolved at build time.
    pub fn target_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_file = Some(path.into());
        self
    }

    /// Set the repository the releases are found in.
    pub fn source_repo(mut self, repo: impl Into<String>) -> Self {
        self.source_repo = Some(repo.into());
        self
    }

    /// Set the version to deploy.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the running version, allowing an early exit when no update is needed.
    pub fn current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    /// Set the public key. Not used for verification.
    pub fn public_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    /// Override the operating system to update to.
    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Override the architecture to update to.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Use a specific retrieval capability.
    pub fn downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Some(Box::new(downloader));
        self
    }

    /// Set the logger for update milestones.
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Set a logger that is shared with other owners.
    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Apply defaults, validate, and configure the retrieval capability.
    ///
    /// Validation runs before the downloader is created or configured, so a
    /// configuration error never results in network access.
    pub fn build(self) -> UpdateResult<Config> {
        let target_file = match self.target_file {
            Some(path) => absolute(path)?,
            None => std::env::current_exe().map_err(|e| {
                UpdateError::InvalidConfig(format!(
                    "could not determine the running executable: {}",
                    e
                ))
            })?,
        };

        let source_repo = self.source_repo.unwrap_or_default();
        let version = self.version.unwrap_or_default();
        validate(&target_file, &source_repo, &version)?;

        let downloader = match self.downloader {
            Some(downloader) => downloader,
            None => Box::new(HttpDownloader::new()?),
        };

        let config = Config {
            target_file,
            source_repo,
            version,
            current_version: self.current_version.filter(|v| !v.is_empty()),
            public_key: self.public_key,
            os: self.os.unwrap_or_else(|| host_os().to_string()),
            arch: self.arch.unwrap_or_else(|| host_arch().to_string()),
            downloader,
            logger: self
                .logger
                .unwrap_or_else(|| Arc::new(StdoutLogger) as Arc<dyn Logger>),
        };
        config.downloader.configure(&config)?;

        if config.public_key.is_some() {
            tracing::debug!("public key configured; release signatures are not verified");
        }

        Ok(config)
    }
}

fn absolute(path: PathBuf) -> UpdateResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Ok(path);
    }

    std::path::absolute(&path).map_err(|e| {
        UpdateError::InvalidConfig(format!(
            "could not resolve target file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Host operating system in repository naming (`linux`, `darwin`, `windows`, ...).
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Host architecture in repository naming (`amd64`, `arm64`, `386`, ...).
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        "s390x" => "s390x",
        "riscv64" => "riscv64",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// Compare two version strings, ignoring a leading `v`.
///
/// Semver-equal when both parse as semver, string-equal otherwise.
pub fn versions_match(a: &str, b: &str) -> bool {
    let a = a.trim().trim_start_matches('v');
    let b = b.trim().trim_start_matches('v');

    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NullLogger;
    use crate::manifest::ReleaseManifest;

    /// Downloader that records nothing and fails everything.
    struct Inert;

    impl Downloader for Inert {
        fn fetch_manifest(&self, _config: &Config) -> UpdateResult<ReleaseManifest> {
            Err(UpdateError::InvalidBinaryLocation("inert".into()))
        }

        fn fetch_binary(
            &self,
            _config: &Config,
            _manifest: &ReleaseManifest,
            _dest: &Path,
        ) -> UpdateResult<()> {
            Err(UpdateError::InvalidBinaryLocation("inert".into()))
        }
    }

    /// Downloader whose configure step always fails.
    struct Rejecting;

    impl Downloader for Rejecting {
        fn configure(&self, config: &Config) -> UpdateResult<()> {
            Err(UpdateError::InvalidConfig(format!(
                "cannot use {}",
                config.source_repo()
            )))
        }

        fn fetch_manifest(&self, _config: &Config) -> UpdateResult<ReleaseManifest> {
            unreachable!()
        }

        fn fetch_binary(
            &self,
            _config: &Config,
            _manifest: &ReleaseManifest,
            _dest: &Path,
        ) -> UpdateResult<()> {
            unreachable!()
        }
    }

    fn base() -> ConfigBuilder {
        Config::builder()
            .target_file("/opt/app/bin/app")
            .source_repo("https://releases.example.net")
            .version("0.7.0")
            .downloader(Inert)
            .logger(NullLogger)
    }

    #[test]
    fn test_defaults_to_host_platform_and_running_executable() {
        let config = Config::builder()
            .source_repo("https://releases.example.net")
            .version("1.0.0")
            .downloader(Inert)
            .build()
            .unwrap();

        assert_eq!(config.os(), host_os());
        assert_eq!(config.arch(), host_arch());
        assert_eq!(config.target_file(), std::env::current_exe().unwrap());
    }

    #[test]
    fn test_missing_source_repo() {
        let err = Config::builder()
            .version("1.0.0")
            .downloader(Inert)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid updater configuration: no source repo given, please use source_repo()"
        );
    }

    #[test]
    fn test_missing_version() {
        let err = Config::builder()
            .source_repo("https://releases.example.net")
            .downloader(Inert)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid updater configuration: no version given, please use version()"
        );
    }

    #[test]
    fn test_empty_target_file() {
        let err = base().target_file("").build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid updater configuration: no target file specified, please use target_file()"
        );
    }

    #[test]
    fn test_relative_target_is_made_absolute() {
        let config = base().target_file("bin/app").build().unwrap();
        assert!(config.target_file().is_absolute());
        assert!(config.target_file().ends_with("bin/app"));
    }

    #[test]
    fn test_downloader_configure_failure_is_reported() {
        let err = base().downloader(Rejecting).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid updater configuration: cannot use https://releases.example.net"
        );
    }

    #[test]
    fn test_validation_runs_before_downloader_configure() {
        let err = Config::builder()
            .target_file("/opt/app/bin/app")
            .source_repo("https://releases.example.net")
            .downloader(Rejecting)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid updater configuration: no version given, please use version()"
        );
    }

    #[test]
    fn test_default_http_downloader_rejects_non_http_repo() {
        let err = Config::builder()
            .target_file("/opt/app/bin/app")
            .source_repo("ftp://releases.example.net")
            .version("0.7.0")
            .build()
            .unwrap_err();
        assert!(matches!(err, UpdateError::InvalidConfig(_)));
    }

    #[test]
    fn test_derived_paths() {
        let config = base().os("linux").arch("amd64").build().unwrap();

        assert_eq!(
            config.release_location(),
            "https://releases.example.net/0.7.0/linux/amd64"
        );
        assert_eq!(config.new_path(), PathBuf::from("/opt/app/bin/app.new"));
        assert_eq!(config.old_path(), PathBuf::from("/opt/app/bin/app.old"));
        assert_eq!(
            config.backup_path(),
            PathBuf::from("/opt/app/bin/app.backup")
        );
    }

    #[test]
    fn test_release_location_ignores_trailing_slash() {
        let config = base()
            .source_repo("https://releases.example.net/")
            .os("linux")
            .arch("arm64")
            .build()
            .unwrap();
        assert_eq!(
            config.release_location(),
            "https://releases.example.net/0.7.0/linux/arm64"
        );
    }

    #[test]
    fn test_sibling_path_keeps_extension() {
        assert_eq!(
            sibling_path(Path::new("/opt/app.exe"), "backup"),
            PathBuf::from("/opt/app.exe.backup")
        );
    }

    #[test]
    fn test_is_current() {
        assert!(!base().build().unwrap().is_current());
        assert!(base().current_version("v0.7.0").build().unwrap().is_current());
        assert!(!base().current_version("0.6.9").build().unwrap().is_current());
        assert!(!base().current_version("").build().unwrap().is_current());
    }

    #[test]
    fn test_versions_match() {
        assert!(versions_match("1.2.3", "v1.2.3"));
        assert!(versions_match("nightly", "nightly"));
        assert!(!versions_match("1.2.3", "1.2.4"));
        assert!(!versions_match("1.2.3-rc.1", "1.2.3"));
    }

    #[test]
    fn test_public_key_is_carried() {
        let config = base().public_key(vec![1u8, 2, 3]).build().unwrap();
        assert_eq!(config.public_key(), Some(&[1u8, 2, 3][..]));
    }
}
