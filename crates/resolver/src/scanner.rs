//! Filesystem walk collecting manifests and watch markers

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use wsb_errors::ScanError;
use wsb_events::{EventEmitter, EventSender};
use wsb_types::paths::{is_ignored_dir, LEGACY_MARKER, MARKER, PACKAGE_JSON};

/// Everything found under the scan roots
#[derive(Debug, Default)]
pub(crate) struct ScanOutput {
    /// Manifest paths in walk order (roots in order, entries sorted by name)
    pub manifests: Vec<PathBuf>,
    /// Paths of every marker file found, current or legacy
    pub markers: HashSet<PathBuf>,
    pub legacy_found: bool,
}

impl ScanOutput {
    /// Marker name in effect: a forced name wins, then legacy markers if any exist
    pub fn marker_name(&self, forced: Option<&str>) -> String {
        match forced {
            Some(name) => name.to_string(),
            None if self.legacy_found => LEGACY_MARKER.to_string(),
            None => MARKER.to_string(),
        }
    }

    /// Whether the manifest at `manifest` has `marker` next to it
    pub fn is_watched(&self, manifest: &Path, marker: &str) -> bool {
        manifest
            .parent()
            .is_some_and(|dir| self.markers.contains(&dir.join(marker)))
    }
}

/// Walk `roots` without following symlinks or entering ignored directories
///
/// Markers named `forced_marker` are collected along with the default and
/// legacy ones. A root that does not exist contributes nothing. Unreadable
/// entries are reported and skipped.
pub(crate) fn scan_roots(
    roots: &[PathBuf],
    forced_marker: Option<&str>,
    events: Option<&EventSender>,
) -> ScanOutput {
    let mut out = ScanOutput::default();
    let mut seen = HashSet::new();

    for root in roots {
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "scan root missing, skipping");
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !e.file_name().to_str().is_some_and(is_ignored_dir)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let err = ScanError::WalkFailed {
                        path: e
                            .path()
                            .map_or_else(|| root.display().to_string(), |p| p.display().to_string()),
                        message: e.to_string(),
                    };
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    if let Some(tx) = events {
                        tx.emit_warning(err.to_string());
                    }
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name();
            if name == PACKAGE_JSON {
                // Overlapping roots would otherwise list a manifest twice
                if seen.insert(entry.path().to_path_buf()) {
                    out.manifests.push(entry.into_path());
                }
            } else if name == LEGACY_MARKER {
                out.legacy_found = true;
                out.markers.insert(entry.into_path());
            } else if name == MARKER || forced_marker.is_some_and(|m| name == m) {
                out.markers.insert(entry.into_path());
            }
        }
    }

    out
}
