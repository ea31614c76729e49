//! Package-related type definitions

use crate::paths::{NODE_MODULES, PACKAGE_JSON};
use crate::{Manifest, Version, VersionRange};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use wsb_errors::ScanError;

/// Where a dependency constraint was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepKind {
    Runtime,
    Dev,
}

/// A dependency constraint declared by a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    pub range: VersionRange,
    pub kind: DepKind,
}

impl Dependency {
    /// Create a dependency from manifest text
    pub fn new(name: impl Into<String>, range: &str, kind: DepKind) -> Self {
        Self {
            name: name.into(),
            range: VersionRange::lenient(range),
            kind,
        }
    }

    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn satisfied_by(&self, version: &Version) -> bool {
        self.range.satisfies(version)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.range)
    }
}

/// One discovered local package
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub name: String,
    /// `None` when the manifest has no version or an unparsable one; such a
    /// package can still consume dependencies but never satisfies one.
    pub version: Option<Version>,
    pub files: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub dev_dependencies: Vec<Dependency>,
    pub watched: bool,
    pub manifest_path: PathBuf,
}

impl Package {
    /// Build a package from a parsed manifest
    ///
    /// # Errors
    ///
    /// Returns `ScanError::ManifestInvalid` if the manifest has no name.
    pub fn from_manifest(
        manifest_path: impl Into<PathBuf>,
        manifest: &Manifest,
        watched: bool,
    ) -> Result<Self, ScanError> {
        let manifest_path = manifest_path.into();
        let name = manifest
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ScanError::ManifestInvalid {
                path: manifest_path.display().to_string(),
                message: "missing package name".to_string(),
            })?
            .to_string();

        let version = manifest
            .version
            .as_deref()
            .and_then(|v| Version::parse(v.trim().trim_start_matches('v')).ok());

        Ok(Self {
            name,
            version,
            files: manifest.files.clone().unwrap_or_default(),
            dependencies: manifest
                .runtime_dependencies()
                .into_iter()
                .map(|(n, r)| Dependency::new(n, &r, DepKind::Runtime))
                .collect(),
            dev_dependencies: manifest
                .dev_dependencies()
                .into_iter()
                .map(|(n, r)| Dependency::new(n, &r, DepKind::Dev))
                .collect(),
            watched,
            manifest_path,
        })
    }

    /// The package directory (the manifest's containing folder)
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.manifest_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// The package's own dependency install directory
    #[must_use]
    pub fn dependency_dir(&self) -> PathBuf {
        self.directory().join(NODE_MODULES)
    }

    /// Whether this package's version satisfies `dep`
    #[must_use]
    pub fn satisfies(&self, dep: &Dependency) -> bool {
        self.version.as_ref().is_some_and(|v| dep.satisfied_by(v))
    }

    /// Runtime constraints followed by development constraints
    pub fn all_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }

    /// Whether a path names a manifest file
    #[must_use]
    pub fn is_manifest(path: &Path) -> bool {
        path.file_name().is_some_and(|n| n == PACKAGE_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Manifest {
        Manifest::from_json(Path::new("/ws/lib/package.json"), json).unwrap()
    }

    #[test]
    fn test_package_from_manifest() {
        let m = manifest(
            r#"{"name":"lib","version":"1.2.0","files":["dist/"],
                "dependencies":{"util":"^2.0.0"},"devDependencies":{"tool":"1.x"}}"#,
        );
        let pkg = Package::from_manifest("/ws/lib/package.json", &m, true).unwrap();
        assert_eq!(pkg.name, "lib");
        assert_eq!(pkg.version, Some(Version::new(1, 2, 0)));
        assert_eq!(pkg.directory(), Path::new("/ws/lib"));
        assert_eq!(pkg.dependency_dir(), PathBuf::from("/ws/lib/node_modules"));
        assert_eq!(pkg.all_dependencies().count(), 2);
        assert!(pkg.watched);
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let m = manifest(r#"{"version":"1.0.0"}"#);
        assert!(Package::from_manifest("/ws/lib/package.json", &m, false).is_err());
    }

    #[test]
    fn test_unversioned_package_satisfies_nothing() {
        let m = manifest(r#"{"name":"app","private":true}"#);
        let pkg = Package::from_manifest("/ws/app/package.json", &m, true).unwrap();
        assert!(!pkg.satisfies(&Dependency::new("app", "*", DepKind::Runtime)));
    }
}
