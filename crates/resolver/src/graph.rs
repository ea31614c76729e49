//! Package map: local packages by name, in discovery order

use std::collections::HashMap;
use wsb_errors::ScanError;
use wsb_types::Package;

/// Local packages keyed by unique name
///
/// Iteration follows insertion order so resolution output is stable for a
/// given workspace layout.
#[derive(Debug, Clone, Default)]
pub struct PackageMap {
    packages: Vec<Package>,
    by_name: HashMap<String, usize>,
}

impl PackageMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package; the first package registered under a name keeps it
    ///
    /// # Errors
    ///
    /// Returns `ScanError::DuplicateName` when the name is taken. The map is
    /// unchanged in that case.
    pub fn insert(&mut self, package: Package) -> Result<(), ScanError> {
        if let Some(&idx) = self.by_name.get(&package.name) {
            return Err(ScanError::DuplicateName {
                name: package.name.clone(),
                first: self.packages[idx].manifest_path.display().to_string(),
                second: package.manifest_path.display().to_string(),
            });
        }
        self.by_name.insert(package.name.clone(), self.packages.len());
        self.packages.push(package);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).map(|&idx| &self.packages[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn watched(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter().filter(|p| p.watched)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
