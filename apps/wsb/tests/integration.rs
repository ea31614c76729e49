//! Integration tests for wsb CLI

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_package(root: &Path, dir: &str, json: &str, watched: bool) {
    let pkg = root.join(dir);
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("package.json"), json).unwrap();
    if watched {
        fs::write(pkg.join(".nodewebproject"), "").unwrap();
    }
}

/// Workspace with a watched app depending on a watched lib
fn app_and_lib(config: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_package(
        tmp.path(),
        "app",
        r#"{"name":"app","version":"1.0.0","dependencies":{"lib":"^1.0.0"}}"#,
        true,
    );
    write_package(
        tmp.path(),
        "lib",
        r#"{"name":"lib","version":"1.2.0","files":["dist/"]}"#,
        true,
    );
    fs::write(tmp.path().join("wsb.toml"), config).unwrap();
    tmp
}

fn wsb(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wsb"))
        .arg("--config")
        .arg(workspace.join("wsb.toml"))
        .args(args)
        .current_dir(workspace)
        .env_remove("RUST_LOG")
        .env_remove("WSB_CONCURRENCY")
        .env_remove("WSB_BUILD_WITHOUT_INSTALL")
        .output()
        .expect("Failed to execute wsb")
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_wsb"))
        .arg("--version")
        .output()
        .expect("Failed to execute wsb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("wsb"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_wsb"))
        .arg("--help")
        .output()
        .expect("Failed to execute wsb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Build local npm packages"));
    assert!(stdout.contains("scan"));
    assert!(stdout.contains("build-project"));
    assert!(stdout.contains("changed"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_wsb"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute wsb");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_watch_requires_paths() {
    let output = Command::new(env!("CARGO_BIN_EXE_wsb"))
        .arg("watch")
        .output()
        .expect("Failed to execute wsb");

    assert!(!output.status.success());
}

#[test]
fn test_scan_json_output() {
    let tmp = app_and_lib("");
    let root = fs::canonicalize(tmp.path()).unwrap();

    let output = wsb(tmp.path(), &["--json", "scan"]);
    assert!(output.status.success(), "{output:?}");

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["kind"], "scan");
    let result = &value["result"];
    assert_eq!(result["marker"], ".nodewebproject");
    assert_eq!(result["projects"].as_array().unwrap().len(), 2);

    let tasks = result["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0]["destination"],
        root.join("app/node_modules/lib").display().to_string()
    );
    assert_eq!(tasks[0]["module_path"], root.join("lib").display().to_string());
    assert_eq!(tasks[0]["files"][0], "dist/");
}

#[test]
fn test_scan_human_output() {
    let tmp = app_and_lib("");

    let output = wsb(tmp.path(), &["--color", "never", "scan"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Watched projects: 2"));
    assert!(stdout.contains("Consumer"));
}

#[test]
fn test_invalid_config_fails() {
    let tmp = app_and_lib("[build\nconcurrency = ");

    let output = wsb(tmp.path(), &["scan"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_build_project_rejects_unwatched_dirs() {
    let tmp = app_and_lib("");
    let other = tmp.path().join("other");
    fs::create_dir_all(&other).unwrap();

    let output = wsb(
        tmp.path(),
        &["--color", "never", "build-project", other.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a watched project"));
}

#[test]
fn test_changed_without_auto_build_reports_affected_tasks() {
    let tmp = app_and_lib("[build]\nauto_build_on_save = false\n");
    let saved = tmp.path().join("lib/src/index.ts");
    fs::create_dir_all(saved.parent().unwrap()).unwrap();
    fs::write(&saved, "export {}").unwrap();

    let output = wsb(tmp.path(), &["changed", saved.to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 copy task(s) affected"));
}

#[test]
fn test_changed_outside_modules_is_ignored() {
    let tmp = app_and_lib("");
    let saved = tmp.path().join("app/src/main.ts");
    fs::create_dir_all(saved.parent().unwrap()).unwrap();
    fs::write(&saved, "").unwrap();

    let output = wsb(tmp.path(), &["--json", "changed", saved.to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["kind"], "message");
}

#[test]
fn test_changed_manifest_without_auto_build_reports_reresolve() {
    let tmp = app_and_lib("[build]\nauto_build_on_save = false\n");
    let manifest = tmp.path().join("lib/package.json");

    let output = wsb(tmp.path(), &["changed", manifest.to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Manifest changed"));
    assert!(stdout.contains("auto_build_on_save is off"));
}

#[test]
fn test_changed_manifest_builds_under_default_settings() {
    let tmp = app_and_lib("");
    let manifest = tmp.path().join("app/package.json");

    // The install of the first step fails, which proves a build was started
    let output = wsb(
        tmp.path(),
        &[
            "--color",
            "never",
            "--package-manager",
            "wsb-test-missing-package-manager",
            "changed",
            manifest.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Manifest changed"));
}

#[test]
fn test_changed_workspace_folder_respects_folders_setting() {
    let tmp = app_and_lib("");

    let output = wsb(tmp.path(), &["changed", tmp.path().to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Workspace folder changed"));
    assert!(stdout.contains("auto_build_on_folders_changed is off"));
}
