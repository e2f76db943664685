// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runs the `cryobox` binary the way an operator would and checks its exit
//! status, so config errors returned from `main` surface as a failed process.

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const SESSION: &str = "\
[GLOBAL]
SCIPION_ACQUISITION_PATTERN = GRID_??/DATA/*.tiff
SPH_AB = 2.7
VOL_KV = 300
SAMPLING = 1.1
INV_CONTR = True
[ALIGNMENT]
FRAMES = 3-0
[RESOURCES]
MOTIONCOR2_GPU = 2,3
[PROJECT]
PROJECT_NAME = cli_check
";

fn config_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".conf")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn cryobox(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cryobox"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run cryobox")
}

#[test]
fn test_check_prints_the_workflow() {
    let file = config_file(SESSION);
    let output = cryobox(&["check", file.path().to_str().unwrap()]);

    assert!(
        output.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cli_check"));
    assert!(stdout.contains("protocols in the summary"));
}

#[test]
fn test_missing_mandatory_key_exits_non_zero() {
    let without_sph_ab: String = SESSION
        .lines()
        .filter(|line| !line.starts_with("SPH_AB"))
        .map(|line| format!("{line}\n"))
        .collect();
    let file = config_file(&without_sph_ab);
    let output = cryobox(&["check", file.path().to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Missing mandatory parameter: SPH_AB"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_override_supplies_the_missing_key() {
    let without_sph_ab: String = SESSION
        .lines()
        .filter(|line| !line.starts_with("SPH_AB"))
        .map(|line| format!("{line}\n"))
        .collect();
    let file = config_file(&without_sph_ab);
    let output = cryobox(&["check", file.path().to_str().unwrap(), "--set", "SPH_AB=2.7"]);

    assert!(
        output.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_missing_config_file_exits_non_zero() {
    let output = cryobox(&["check", "/definitely/not/here.conf"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "unexpected stderr: {stderr}");
}
