use std::fs;
use std::io::Cursor;
use std::process::{Command, Output};

use assert_cmd::prelude::*;
use checksums::Sha1;
use control::ControlFile;

fn binary_output(name: &str, args: &[&str]) -> Output {
    #[allow(deprecated)]
    let mut command =
        Command::cargo_bin(name).unwrap_or_else(|error| panic!("failed to locate {name}: {error}"));
    command.args(args);
    command
        .output()
        .unwrap_or_else(|error| panic!("failed to run {name}: {error}"))
}

#[test]
fn builder_help_lists_usage() {
    let output = binary_output("oc-zsyncmake", &["--help"]);
    assert!(output.status.success(), "oc-zsyncmake --help should succeed");
    assert!(
        output.stderr.is_empty(),
        "help output should not write to stderr"
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("oc-zsyncmake"));
}

#[test]
fn applier_help_lists_usage() {
    let output = binary_output("oc-zsync", &["--help"]);
    assert!(output.status.success(), "oc-zsync --help should succeed");
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("oc-zsync"));
}

#[test]
fn builder_without_operands_shows_usage() {
    let output = binary_output("oc-zsyncmake", &[]);
    assert!(
        !output.status.success(),
        "running without operands should fail so the caller sees the usage"
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("Usage:"));
}

#[test]
fn applier_without_operands_shows_usage() {
    let output = binary_output("oc-zsync", &[]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn builder_writes_a_valid_control_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("payload.bin");
    let output_path = dir.path().join("payload.bin.zsync");
    let data: Vec<u8> = (0..7000u32).map(|i| (i * 31 % 251) as u8).collect();
    fs::write(&input, &data).expect("write input");

    let output = binary_output(
        "oc-zsyncmake",
        &[input.to_str().unwrap(), output_path.to_str().unwrap()],
    );
    assert!(output.status.success(), "builder should exit zero");

    let bytes = fs::read(&output_path).expect("control file exists");
    let parsed = ControlFile::read(&mut Cursor::new(&bytes)).expect("control file parses");
    assert_eq!(parsed.header.length, data.len() as u64);
    assert_eq!(parsed.header.blocksize, 2048);
    assert_eq!(parsed.sums.len(), 4);

    let mut sha = Sha1::new();
    sha.update(&data);
    assert_eq!(parsed.header.sha1_hex, sha.finalize_hex());
}

#[test]
fn builder_reports_missing_input_on_one_line() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = binary_output(
        "oc-zsyncmake",
        &[
            dir.path().join("absent.bin").to_str().unwrap(),
            dir.path().join("absent.bin.zsync").to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert_eq!(stderr.lines().count(), 1, "exactly one diagnostic line");
}

#[test]
fn applier_rejects_control_without_zsync_suffix() {
    let output = binary_output(
        "oc-zsync",
        &[
            "/nonexistent/control.bin",
            "/nonexistent/seed",
            "http://localhost:1",
            "remote.bin",
            "user",
            "pass",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains(".zsync"));
}
