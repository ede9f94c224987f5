//! Update orchestration: fetch, verify, back up, swap.
//!
//! An [`Updater`] serializes every check and apply it runs, so at most one
//! update attempt is in flight per instance. Share one instance (for example
//! behind an `Arc`) across the threads of a process.
//!
//! ```text
//! start ─► manifest fetched ─► binary fetched ─► checksum ok ─► backed up ─► swapped
//!   │             │                  │                │             │           │
//!   └─────────────┴──────────────────┴────────────────┴─────────────┴──► failed │
//!                                                                       ▲       │
//!                                              rolled back / rollback failed ◄──┘
//! ```

use std::fs;

use parking_lot::Mutex;

use crate::config::{Config, ConfigBuilder};
use crate::download::verify_checksum;
use crate::error::{UpdateError, UpdateResult};
use crate::manifest::ReleaseManifest;
use crate::swap::{backup_target, swap_new};

/// Checks for and applies updates to an executable.
#[derive(Debug, Default)]
pub struct Updater {
    lock: Mutex<()>,
}

impl Updater {
    /// Create a new updater.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the manifest of the configured release without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidConfig`] if the configuration is
    /// incomplete, or [`UpdateError::ReleaseNotFound`] if the manifest could
    /// not be retrieved.
    pub fn check(&self, builder: ConfigBuilder) -> UpdateResult<ReleaseManifest> {
        let _guard = self.lock.lock();

        let config = builder.build()?;
        fetch_manifest(&config)
    }

    /// Download, verify and install the configured release over the target.
    ///
    /// The live target is only touched once the new binary is downloaded and
    /// its checksum verified. If moving the new binary into place fails, the
    /// target is restored from `<target>.backup`; call
    /// [`rollback_error`](crate::rollback_error) on the returned error to find
    /// out whether that restore failed too.
    ///
    /// When a current version is configured and equals the requested version
    /// this returns immediately without any network or file access.
    pub fn apply(&self, builder: ConfigBuilder) -> UpdateResult<()> {
        let _guard = self.lock.lock();

        let config = builder.build()?;
        let log = config.logger();

        if config.is_current() {
            log.log(&format!(
                "already running {}, nothing to do",
                config.version()
            ));
            return Ok(());
        }

        let manifest = fetch_manifest(&config)?;

        log.log(&format!(
            "Starting update process to {} from {}",
            config.version(),
            config.source_repo()
        ));

        let new_path = config.new_path();
        config
            .downloader()
            .fetch_binary(&config, &manifest, &new_path)
            .map_err(|e| UpdateError::Download(Box::new(e)))?;

        log.log(&format!(
            "Saved downloaded binary to {}",
            new_path.display()
        ));

        if let Err(e) = verify_checksum(&new_path, &manifest.sha256) {
            let _ = fs::remove_file(&new_path);
            return Err(e);
        }
        tracing::debug!(sha256 = %manifest.sha256, "checksum verified");

        let backup = backup_target(config.target_file())
            .map_err(|e| UpdateError::Backup(Box::new(e)))?;

        log.log(&format!(
            "Created backup of current binary to {}",
            backup.display()
        ));

        swap_new(&new_path, &backup, config.target_file())?;

        log.log(&format!(
            "Updated {} to {}",
            config.target_file().display(),
            config.version()
        ));

        Ok(())
    }
}

fn fetch_manifest(config: &Config) -> UpdateResult<ReleaseManifest> {
    let manifest = config
        .downloader()
        .fetch_manifest(config)
        .map_err(|e| UpdateError::ReleaseNotFound {
            version: config.version().to_string(),
            source: Box::new(e),
        })?;

    tracing::info!(
        version = config.version(),
        binary = %manifest.binary_path,
        "found release"
    );

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{sha256_hex, Downloader};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves a fixed payload as the release binary, without compression.
    struct StaticDownloader {
        payload: Vec<u8>,
        hash: String,
        manifest_calls: Arc<AtomicUsize>,
        fail_manifest: bool,
        fail_binary: bool,
    }

    impl StaticDownloader {
        fn new(payload: &[u8]) -> Self {
            Self {
                payload: payload.to_vec(),
                hash: sha256_hex(payload),
                manifest_calls: Arc::new(AtomicUsize::new(0)),
                fail_manifest: false,
                fail_binary: false,
            }
        }
    }

    impl Downloader for StaticDownloader {
        fn fetch_manifest(&self, config: &Config) -> UpdateResult<ReleaseManifest> {
            self.manifest_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_manifest {
                return Err(UpdateError::HttpStatus {
                    url: config.release_location(),
                    status: "404 Not Found".to_string(),
                });
            }
            let mut manifest = ReleaseManifest::new("app.bz2", self.hash.clone());
            manifest.binary_uri = Some(format!("{}/app.bz2", config.release_location()));
            Ok(manifest)
        }

        fn fetch_binary(
            &self,
            _config: &Config,
            manifest: &ReleaseManifest,
            dest: &Path,
        ) -> UpdateResult<()> {
            if self.fail_binary {
                return Err(UpdateError::HttpStatus {
                    url: manifest.binary_uri.clone().unwrap_or_default(),
                    status: "500 Internal Server Error".to_string(),
                });
            }
            fs::write(dest, &self.payload).map_err(|e| UpdateError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })
        }
    }

    fn builder(target: &Path, downloader: StaticDownloader) -> ConfigBuilder {
        Config::builder()
            .target_file(target)
            .source_repo("https://releases.example.net")
            .version("1.0.0")
            .os("linux")
            .arch("amd64")
            .downloader(downloader)
            .logger(crate::NullLogger)
    }

    fn target(temp: &TempDir) -> PathBuf {
        let target = temp.path().join("app");
        fs::write(&target, b"target file").unwrap();
        target
    }

    #[test]
    fn test_check_returns_manifest() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);

        let manifest = Updater::new()
            .check(builder(&target, StaticDownloader::new(b"v1")))
            .unwrap();

        assert_eq!(manifest.binary_path, "app.bz2");
        assert_eq!(manifest.sha256, sha256_hex(b"v1"));
    }

    #[test]
    fn test_check_wraps_fetch_errors() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let mut downloader = StaticDownloader::new(b"v1");
        downloader.fail_manifest = true;

        let err = Updater::new()
            .check(builder(&target, downloader))
            .unwrap_err();

        assert!(err.to_string().starts_with("release 1.0.0 not found: "));
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[test]
    fn test_apply_replaces_target_and_keeps_backup() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);

        Updater::new()
            .apply(builder(&target, StaticDownloader::new(b"testing\n")))
            .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"testing\n");
        assert_eq!(
            fs::read(temp.path().join("app.backup")).unwrap(),
            b"target file"
        );
        assert!(!temp.path().join("app.new").exists());
        assert!(!temp.path().join("app.old").exists());
    }

    #[test]
    fn test_apply_logs_milestones() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let messages = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&messages);

        Updater::new()
            .apply(
                builder(&target, StaticDownloader::new(b"testing\n"))
                    .logger(move |m: &str| sink.lock().unwrap().push(m.to_string())),
            )
            .unwrap();

        let messages = messages.lock().unwrap();
        assert!(messages[0].starts_with("Starting update process to 1.0.0"));
        assert!(messages.iter().any(|m| m.starts_with("Saved downloaded binary")));
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Created backup of current binary")));
    }

    #[test]
    fn test_apply_rejects_bad_checksum_without_touching_target() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let mut downloader = StaticDownloader::new(b"testing\n");
        downloader.hash = sha256_hex(b"something else");

        let err = Updater::new()
            .apply(builder(&target, downloader))
            .unwrap_err();

        assert!(matches!(err, UpdateError::InvalidChecksum { .. }));
        assert!(crate::rollback_error(&err).is_none());
        assert_eq!(fs::read(&target).unwrap(), b"target file");
        assert!(!temp.path().join("app.new").exists());
        assert!(!temp.path().join("app.backup").exists());
    }

    #[test]
    fn test_apply_wraps_download_errors() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let mut downloader = StaticDownloader::new(b"testing\n");
        downloader.fail_binary = true;

        let err = Updater::new()
            .apply(builder(&target, downloader))
            .unwrap_err();

        assert!(err.to_string().starts_with("download failed: "));
        assert_eq!(fs::read(&target).unwrap(), b"target file");
    }

    #[test]
    fn test_apply_reports_missing_target_as_backup_failure() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");

        let err = Updater::new()
            .apply(builder(&missing, StaticDownloader::new(b"testing\n")))
            .unwrap_err();

        // StaticDownloader does not need the target; the backup step does.
        assert!(err.to_string().starts_with("could not create backup: "));
        assert!(!missing.exists());
    }

    #[test]
    fn test_apply_exits_early_when_current() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let downloader = StaticDownloader::new(b"testing\n");
        let calls = Arc::clone(&downloader.manifest_calls);

        Updater::new()
            .apply(builder(&target, downloader).current_version("v1.0.0"))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(fs::read(&target).unwrap(), b"target file");
    }

    #[test]
    fn test_apply_reports_config_errors_first() {
        let downloader = StaticDownloader::new(b"testing\n");
        let calls = Arc::clone(&downloader.manifest_calls);

        let err = Updater::new()
            .apply(Config::builder().version("1.0.0").downloader(downloader))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid updater configuration: no source repo given, please use source_repo()"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Logger that sabotages the swap right after the backup is written.
    fn remove_on_backup(paths: Vec<PathBuf>) -> impl Fn(&str) + Send + Sync {
        move |message: &str| {
            if message.starts_with("Created backup of current binary") {
                for path in &paths {
                    fs::remove_file(path).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_apply_restores_target_when_swap_fails() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let new_path = temp.path().join("app.new");

        let err = Updater::new()
            .apply(
                builder(&target, StaticDownloader::new(b"testing\n"))
                    .logger(remove_on_backup(vec![new_path])),
            )
            .unwrap_err();

        assert!(matches!(err, UpdateError::Swap { rollback: None, .. }));
        assert!(crate::rollback_error(&err).is_none());
        assert_eq!(fs::read(&target).unwrap(), b"target file");
        assert!(!temp.path().join("app.old").exists());
    }

    #[test]
    fn test_apply_reports_failed_rollback() {
        let temp = TempDir::new().unwrap();
        let target = target(&temp);
        let new_path = temp.path().join("app.new");
        let backup = temp.path().join("app.backup");

        let err = Updater::new()
            .apply(
                builder(&target, StaticDownloader::new(b"testing\n"))
                    .logger(remove_on_backup(vec![new_path, backup])),
            )
            .unwrap_err();

        let rollback = crate::rollback_error(&err).expect("rollback error");
        let primary = match &err {
            UpdateError::Swap { primary, .. } => primary.to_string(),
            other => panic!("expected swap error, got {:?}", other),
        };
        assert_ne!(rollback.to_string(), primary);
        assert!(err.requires_intervention());
        assert!(!target.exists());
    }

    /// Tracks how many manifest fetches overlap.
    struct OverlapDownloader {
        inner: StaticDownloader,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl Downloader for OverlapDownloader {
        fn fetch_manifest(&self, config: &Config) -> UpdateResult<ReleaseManifest> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.fetch_manifest(config)
        }

        fn fetch_binary(
            &self,
            config: &Config,
            manifest: &ReleaseManifest,
            dest: &Path,
        ) -> UpdateResult<()> {
            self.inner.fetch_binary(config, manifest, dest)
        }
    }

    #[test]
    fn test_checks_and_applies_never_overlap() {
        let temp = TempDir::new().unwrap();
        let updater = Arc::new(Updater::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let path = temp.path().join(format!("app{}", i));
                fs::write(&path, b"target file").unwrap();
                let downloader = OverlapDownloader {
                    inner: StaticDownloader::new(b"testing\n"),
                    in_flight: Arc::clone(&in_flight),
                    max_in_flight: Arc::clone(&max_in_flight),
                };
                let updater = Arc::clone(&updater);
                std::thread::spawn(move || {
                    let config = builder(&path, StaticDownloader::new(b"unused"))
                        .downloader(downloader);
                    if i % 2 == 0 {
                        updater.check(config).map(|_| ())
                    } else {
                        updater.apply(config)
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_applies_all_complete() {
        let temp = TempDir::new().unwrap();
        let updater = Arc::new(Updater::new());
        let targets: Vec<_> = (0..4)
            .map(|i| {
                let path = temp.path().join(format!("app{}", i));
                fs::write(&path, b"target file").unwrap();
                path
            })
            .collect();

        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|path| {
                let updater = Arc::clone(&updater);
                std::thread::spawn(move || {
                    updater.apply(builder(&path, StaticDownloader::new(b"testing\n")))
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        for path in targets {
            assert_eq!(fs::read(path).unwrap(), b"testing\n");
        }
    }
}
