//! End-to-end runs of the `eden` binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn eden(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_eden"))
        .args(args)
        .current_dir(dir)
        .env_clear()
        .env("HOME", dir)
        .env("EDEN_CONFIG", dir.join("config"))
        .output()
        .unwrap()
}

fn broken_registry() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config"), "service_instances: [ {id: ").unwrap();
    dir
}

#[test]
fn test_catalog_does_not_read_registry() {
    let dir = broken_registry();

    let output = eden(dir.path(), &["catalog"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("Broker URL is required"), "stderr: {stderr}");
    assert!(!stderr.contains("Could not load registry"), "stderr: {stderr}");
}

#[test]
fn test_services_reports_unreadable_registry() {
    let dir = broken_registry();

    let output = eden(dir.path(), &["services"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("Could not load registry"), "stderr: {stderr}");
}
