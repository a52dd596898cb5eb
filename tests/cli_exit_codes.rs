use std::process::{Command, Output};

use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rusty-face-test"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

#[test]
fn no_arguments_prints_help() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--input"));
}

#[test]
fn help_and_version_succeed() {
    assert_eq!(run(&["--help"]).status.code(), Some(0));
    assert_eq!(run(&["--version"]).status.code(), Some(0));
}

#[test]
fn missing_required_flags_exit_one() {
    assert_eq!(run(&["--input", "a.png"]).status.code(), Some(1));
    assert_eq!(run(&["--bogus"]).status.code(), Some(1));
}

#[test]
fn missing_session_flags_exit_one() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let output = run(&[
        "-i",
        "a.png",
        "-o",
        out.to_str().unwrap(),
        "-m",
        "models.json",
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn boilerplate_exits_zero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    let output = run(&["--boilerplate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    assert!(path.exists());
}
