//! Watch designation: writing the marker next to a manifest

use std::path::{Component, Path, PathBuf};
use wsb_errors::{Error, ScanError};
use wsb_types::paths::{NODE_MODULES, PACKAGE_JSON};
use wsb_types::Package;

/// Mark the package at `path` as watched
///
/// `path` is a manifest or a directory directly containing one. Returns the
/// marker file written.
///
/// # Errors
///
/// Returns `ScanError::NotAPackage` for paths inside a dependency install
/// directory or directories without a manifest, and an I/O error if the
/// marker cannot be written.
pub async fn mark_watched(path: &Path, marker: &str) -> Result<PathBuf, Error> {
    let not_a_package = |reason: &str| ScanError::NotAPackage {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    if path
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == NODE_MODULES))
    {
        return Err(not_a_package("inside a dependency install folder").into());
    }

    let dir = if Package::is_manifest(path) {
        path.parent()
            .ok_or_else(|| not_a_package("manifest has no parent directory"))?
    } else {
        path
    };

    if !tokio::fs::try_exists(dir.join(PACKAGE_JSON))
        .await
        .unwrap_or(false)
    {
        return Err(not_a_package("no package.json").into());
    }

    let marker_path = dir.join(marker);
    tokio::fs::write(&marker_path, b"")
        .await
        .map_err(|e| Error::io_with_path(&e, &marker_path))?;
    Ok(marker_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mark_by_manifest_and_directory() {
        let tmp = TempDir::new().unwrap();
        let app = tmp.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join(PACKAGE_JSON), "{}").unwrap();

        let marker = mark_watched(&app.join(PACKAGE_JSON), ".nodewebproject")
            .await
            .unwrap();
        assert_eq!(marker, app.join(".nodewebproject"));
        assert!(marker.is_file());

        let again = mark_watched(&app, ".nodewebproject").await.unwrap();
        assert_eq!(again, marker);
    }

    #[tokio::test]
    async fn test_rejects_non_packages() {
        let tmp = TempDir::new().unwrap();
        let err = mark_watched(tmp.path(), ".nodewebproject").await.unwrap_err();
        assert!(matches!(err, Error::Scan(ScanError::NotAPackage { .. })));

        let dep = tmp.path().join("app/node_modules/lib");
        std::fs::create_dir_all(&dep).unwrap();
        std::fs::write(dep.join(PACKAGE_JSON), "{}").unwrap();
        let err = mark_watched(&dep, ".nodewebproject").await.unwrap_err();
        assert!(matches!(err, Error::Scan(ScanError::NotAPackage { .. })));
    }
}
