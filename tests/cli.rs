//! End-to-end tests of the `remake` binary

mod common;

use std::path::Path;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;

/// `remake` running in `root`, isolated from the user's config files
fn remake(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("remake").expect("binary should build");
    cmd.current_dir(root)
        .env("HOME", root)
        .env("XDG_CONFIG_HOME", root.join(".config"))
        .env_remove("REMAKE_LOG")
        .env_remove("REMAKE_FILE");
    cmd
}

fn sample_project() -> (tempfile::TempDir, std::path::PathBuf) {
    create_project(&[
        ("remake.toml", SAMPLE_DEFINITIONS),
        ("src/a.txt", "alpha"),
        ("src/b.txt", "beta"),
    ])
}

#[test]
fn test_default_target_builds() {
    let (_dir, root) = sample_project();

    remake(&root).assert().success();

    assert_eq!(std::fs::read_to_string(root.join("out/a.txt")).unwrap(), "alpha");
    assert_eq!(std::fs::read_to_string(root.join("out/b.txt")).unwrap(), "beta");
    assert!(root.join(".make").exists());
}

#[test]
fn test_second_run_skips_rules() {
    let (_dir, root) = sample_project();

    remake(&root).arg("build").assert().success();
    remake(&root)
        .args(["-v", "build"])
        .assert()
        .success()
        .stderr(predicate::str::contains("skip"))
        .stderr(predicate::str::contains("cp src/a.txt").not());
}

#[test]
fn test_help_lists_described_targets() {
    let (_dir, root) = sample_project();

    remake(&root)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Targets:"))
        .stdout(predicate::str::contains("Copy every source into out/"))
        .stdout(predicate::str::contains("--serial"));
}

#[test]
fn test_failing_command_exits_nonzero() {
    let (_dir, root) = sample_project();

    remake(&root)
        .arg("broken")
        .assert()
        .failure()
        .stderr(predicate::str::contains("going down"))
        .stderr(predicate::str::contains("returned error code 3"));
}

#[test]
fn test_unknown_target_is_reported() {
    let (_dir, root) = sample_project();

    remake(&root)
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot resolve target 'deploy'"));
}

#[test]
fn test_silent_suppresses_logs() {
    let (_dir, root) = sample_project();

    remake(&root)
        .args(["-s", "build"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_alternate_definitions_file() {
    let (_dir, root) = create_project(&[(
        "other.toml",
        r#"
        [[task]]
        name = "hello"
        run = [["sh", "-c", "echo hi > greeting.txt"]]
        "#,
    )]);

    remake(&root).args(["-f", "other.toml", "hello"]).assert().success();

    assert_eq!(std::fs::read_to_string(root.join("greeting.txt")).unwrap(), "hi\n");
}

#[test]
fn test_invalid_definitions_file() {
    let (_dir, root) = create_project(&[("remake.toml", "[[task]]\nname = 3\n")]);

    remake(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid definitions"));
}
