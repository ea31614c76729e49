//! Resolution entry point

use std::path::{Path, PathBuf};
use std::time::Instant;
use wsb_errors::{Error, ScanError};
use wsb_events::{EventEmitter, EventSender, ResolverEvent};
use wsb_types::{Manifest, Package};

use crate::graph::PackageMap;
use crate::resolution::{Resolution, SkippedPackage};
use crate::scanner::{scan_roots, ScanOutput};
use crate::watch;

/// Workspace resolver
///
/// Holds only settings; every pass builds a fresh [`Resolution`].
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    /// Forced marker file name; `None` picks the default or legacy marker
    marker_name: Option<String>,
    tx: Option<EventSender>,
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_marker_name(mut self, marker_name: Option<String>) -> Self {
        self.marker_name = marker_name;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Scan `roots` and resolve every watched package
    ///
    /// The walk and manifest reads run on the blocking pool.
    ///
    /// # Errors
    ///
    /// Only fails if the blocking task panics or is cancelled. Unreadable
    /// manifests and missing roots are reported, not returned.
    pub async fn prepare(&self, roots: &[PathBuf]) -> Result<Resolution, Error> {
        let this = self.clone();
        let roots = roots.to_vec();
        tokio::task::spawn_blocking(move || this.prepare_blocking(&roots))
            .await
            .map_err(|e| Error::internal(format!("resolution task failed: {e}")))
    }

    /// Synchronous form of [`Resolver::prepare`]
    #[must_use]
    pub fn prepare_blocking(&self, roots: &[PathBuf]) -> Resolution {
        let start = Instant::now();
        self.emit_resolver(ResolverEvent::ScanStarted {
            roots: roots.to_vec(),
        });

        let scan = scan_roots(roots, self.marker_name.as_deref(), self.tx.as_ref());
        let marker = scan.marker_name(self.marker_name.as_deref());
        let (packages, skipped_packages) = self.load_packages(&scan, &marker);

        self.emit_resolver(ResolverEvent::ScanCompleted {
            manifests: scan.manifests.len(),
            packages: packages.len(),
            watched: packages.watched().count(),
            marker: marker.clone(),
        });

        let mut resolution = Resolution::resolve(packages, marker);
        resolution.skipped_packages = skipped_packages;

        for skip in &resolution.skipped {
            self.emit_resolver(ResolverEvent::DependencySkipped {
                package: skip.declared_by.clone(),
                dependency: skip.name.clone(),
                range: skip.range.clone(),
                reason: skip.reason.to_string(),
            });
        }

        self.emit_resolver(ResolverEvent::ResolutionCompleted {
            projects: resolution.projects.len(),
            tasks: resolution.tasks.len(),
            watch_paths: resolution.watch_paths.len(),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        });

        resolution
    }

    /// Write the marker for the package at `path`
    ///
    /// `marker` is the name in effect for the workspace, usually
    /// [`Resolution::marker`] of the latest pass.
    ///
    /// # Errors
    ///
    /// See [`crate::mark_watched`].
    pub async fn mark_watched(&self, path: &Path, marker: &str) -> Result<PathBuf, Error> {
        match watch::mark_watched(path, marker).await {
            Ok(marker_path) => {
                self.emit_resolver(ResolverEvent::PackageWatched {
                    manifest: marker_path.with_file_name(wsb_types::paths::PACKAGE_JSON),
                    marker: marker_path.clone(),
                });
                Ok(marker_path)
            }
            Err(e) => {
                self.emit_warning(e.to_string());
                Err(e)
            }
        }
    }

    fn load_packages(&self, scan: &ScanOutput, marker: &str) -> (PackageMap, Vec<SkippedPackage>) {
        let mut packages = PackageMap::new();
        let mut skipped = Vec::new();

        for manifest_path in &scan.manifests {
            let watched = scan.is_watched(manifest_path, marker);
            let result = read_package(manifest_path, watched)
                .and_then(|pkg| packages.insert(pkg));

            if let Err(e) = result {
                tracing::warn!(manifest = %manifest_path.display(), error = %e, "skipping manifest");
                self.emit_resolver(ResolverEvent::PackageSkipped {
                    path: manifest_path.clone(),
                    reason: e.to_string(),
                });
                skipped.push(SkippedPackage {
                    manifest: manifest_path.clone(),
                    reason: e.to_string(),
                });
            }
        }

        (packages, skipped)
    }
}

fn read_package(path: &Path, watched: bool) -> Result<Package, ScanError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ScanError::ManifestUnreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let manifest = Manifest::from_json(path, &contents)?;
    Package::from_manifest(path, &manifest, watched)
}

impl EventEmitter for Resolver {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}
