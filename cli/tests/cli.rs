//! Command-line behaviour of the `treewatch` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn treewatch() -> Command {
    Command::cargo_bin("treewatch").unwrap()
}

#[test]
fn test_missing_arguments() {
    treewatch()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_negative_depth_rejected() {
    let temp_dir = TempDir::new().unwrap();
    treewatch()
        .arg(temp_dir.path())
        .arg("-1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("depth must be a non-negative integer"));
}

#[test]
fn test_non_numeric_depth_rejected() {
    let temp_dir = TempDir::new().unwrap();
    treewatch()
        .arg(temp_dir.path())
        .arg("deep")
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative integer"));
}

#[test]
fn test_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    treewatch()
        .arg(temp_dir.path().join("missing"))
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("directory not found"));
}

#[test]
fn test_path_is_a_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();

    treewatch()
        .arg(&file)
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_bad_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("treewatch.toml");
    fs::write(&config, "max_path_len = \"long\"\n").unwrap();

    treewatch()
        .arg(temp_dir.path())
        .arg("0")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config file"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_exits_cleanly_when_root_removed() {
    use std::io::{BufRead, BufReader, Read};
    use std::process::Stdio;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");
    fs::create_dir_all(root.join("sub")).unwrap();

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("treewatch"))
        .arg(&root)
        .arg("1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // The banner is printed only after every watch is in place.
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut banner = String::new();
    stdout.read_line(&mut banner).unwrap();
    assert!(banner.starts_with("Watching directory:"), "{banner}");

    fs::write(root.join("notes.txt"), "x").unwrap();
    fs::remove_dir_all(&root).unwrap();

    let status = child.wait().unwrap();
    assert!(status.success());

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();
    assert!(rest.contains(&format!("File created: {}", root.join("notes.txt").display())));
    assert!(rest.contains(&format!("Remove watch on directory: {}", root.join("sub").display())));
    assert!(rest.contains(&format!("Remove watch on directory: {}", root.display())));
}
