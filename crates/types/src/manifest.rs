//! Package manifest (`package.json`) model
//!
//! Only the fields the linker reads are modelled; everything else in the
//! file is ignored. Dependency maps keep their declaration order, which
//! decides which constraint wins when two packages in the same resolution
//! level name the same dependency.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use wsb_errors::ScanError;

/// Fields of a package manifest relevant to linking
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub dependencies: Option<Map<String, Value>>,
    #[serde(default)]
    pub dev_dependencies: Option<Map<String, Value>>,
}

impl Manifest {
    /// Parse manifest JSON read from `path`
    ///
    /// # Errors
    ///
    /// Returns `ScanError::ManifestInvalid` when the text is not a JSON
    /// object with the expected field types.
    pub fn from_json(path: &Path, contents: &str) -> Result<Self, ScanError> {
        serde_json::from_str(contents).map_err(|e| ScanError::ManifestInvalid {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Runtime dependencies as `(name, range)` pairs in declaration order
    #[must_use]
    pub fn runtime_dependencies(&self) -> Vec<(String, String)> {
        string_pairs(self.dependencies.as_ref())
    }

    /// Development dependencies as `(name, range)` pairs in declaration order
    #[must_use]
    pub fn dev_dependencies(&self) -> Vec<(String, String)> {
        string_pairs(self.dev_dependencies.as_ref())
    }
}

// Non-string values (objects from broken tooling) are dropped.
fn string_pairs(map: Option<&Map<String, Value>>) -> Vec<(String, String)> {
    map.map(|m| {
        m.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_dependency_order() {
        let json = r#"{
            "name": "app",
            "version": "1.0.0",
            "files": ["dist/"],
            "dependencies": { "zeta": "^1.0.0", "alpha": "~2.0.0", "broken": {} },
            "devDependencies": { "lib": "*" }
        }"#;
        let manifest = Manifest::from_json(Path::new("/ws/app/package.json"), json).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("app"));
        let names: Vec<_> = manifest
            .runtime_dependencies()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(manifest.dev_dependencies().len(), 1);
    }

    #[test]
    fn test_invalid_json() {
        let err = Manifest::from_json(Path::new("/ws/x/package.json"), "{ nope").unwrap_err();
        assert!(matches!(err, ScanError::ManifestInvalid { .. }));
    }

    #[test]
    fn test_wrong_field_type() {
        let err = Manifest::from_json(Path::new("/ws/x/package.json"), r#"{"files": "dist"}"#)
            .unwrap_err();
        assert!(matches!(err, ScanError::ManifestInvalid { .. }));
    }
}
