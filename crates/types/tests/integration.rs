//! Integration tests for types

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use wsb_types::*;

    fn package(dir: &str, json: &str) -> Package {
        let path = PathBuf::from(dir).join("package.json");
        let manifest = Manifest::from_json(&path, json).unwrap();
        Package::from_manifest(path, &manifest, false).unwrap()
    }

    #[test]
    fn test_manifest_to_package_keeps_declaration_order() {
        let pkg = package(
            "/ws/app",
            r#"{
                "name": "app",
                "version": "v2.1.0",
                "dependencies": {"zeta": "^1.0.0", "alpha": "~2.3.0", "mid": "file:../mid"},
                "devDependencies": {"tooling": "*"}
            }"#,
        );

        assert_eq!(pkg.name, "app");
        assert_eq!(pkg.version, Some(Version::new(2, 1, 0)));
        assert_eq!(pkg.directory(), Path::new("/ws/app"));
        assert_eq!(pkg.dependency_dir(), PathBuf::from("/ws/app/node_modules"));

        let names: Vec<&str> = pkg.all_dependencies().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid", "tooling"]);
        assert_eq!(pkg.dev_dependencies[0].kind, DepKind::Dev);
        assert!(pkg.dependencies[2].range.is_non_semver());
    }

    #[test]
    fn test_package_satisfies_dependency() {
        let lib = package("/ws/lib", r#"{"name":"lib","version":"1.4.2"}"#);

        assert!(lib.satisfies(&Dependency::new("lib", "^1.0.0", DepKind::Runtime)));
        assert!(lib.satisfies(&Dependency::new("lib", "0.9.0 || ^1.4.0", DepKind::Runtime)));
        assert!(!lib.satisfies(&Dependency::new("lib", "^2.0.0", DepKind::Runtime)));
        assert!(!lib.satisfies(&Dependency::new("lib", "file:../lib", DepKind::Runtime)));
    }

    #[test]
    fn test_unversioned_package_never_satisfies() {
        let lib = package("/ws/lib", r#"{"name":"lib"}"#);
        assert_eq!(lib.version, None);
        assert!(!lib.satisfies(&Dependency::new("lib", "*", DepKind::Runtime)));
    }

    #[test]
    fn test_nameless_manifest_is_rejected() {
        let path = Path::new("/ws/anon/package.json");
        let manifest = Manifest::from_json(path, r#"{"version":"1.0.0"}"#).unwrap();
        assert!(Package::from_manifest(path, &manifest, true).is_err());
    }

    #[test]
    fn test_copy_task_paths_for_package_outputs() {
        let lib = package(
            "/ws/lib",
            r#"{"name":"lib","version":"1.0.0","files":["./dist/", "README.md"]}"#,
        );
        let task = CopyTask::new(
            "/ws/app/node_modules/lib",
            lib.directory(),
            lib.files.clone(),
        )
        .unwrap();

        assert_eq!(task.source_of("./dist/"), PathBuf::from("/ws/lib/dist"));
        assert_eq!(
            task.target_of("README.md"),
            PathBuf::from("/ws/app/node_modules/lib/README.md")
        );
        assert_eq!(task.consumer_dir(), Some(Path::new("/ws/app")));
    }

    #[test]
    fn test_copy_task_without_files_is_none() {
        assert!(CopyTask::new("/ws/app/node_modules/lib", "/ws/lib", vec![" ".into()]).is_none());
    }

    #[test]
    fn test_color_choice_serialization() {
        let json = serde_json::to_string(&ColorChoice::Never).unwrap();
        assert_eq!(json, r#""never""#);

        let deserialized: ColorChoice = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ColorChoice::Never);
        assert_eq!(ColorChoice::default(), ColorChoice::Auto);
    }
}
