use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

fn slip_run(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_slip-run"))
        .current_dir(cwd)
        .env_remove("DATA_PATH")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("run slip-run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8")
}

const ROOT: &str = "tohoku/okada-fault-random";

#[test]
fn sample_then_build_in_current_directory() {
    let dir = tempdir().expect("tempdir");
    let sampled = slip_run(dir.path(), &["sample", "--runs", "4", "--dims", "2", "--seed", "9"]);
    assert!(sampled.status.success(), "sample failed: {sampled:?}");
    let table = fs::read_to_string(dir.path().join("random_sample.txt")).expect("table");
    assert_eq!(table.lines().count(), 4);

    let built = slip_run(dir.path(), &["build"]);
    assert!(built.status.success(), "build failed: {built:?}");
    let text = stdout(&built);
    assert!(text.contains("prepared 4 of 4 runs, 0 failed"));
    assert!(text.contains("submitted 4 runs"));

    let root = dir.path().join(ROOT);
    let log = fs::read_to_string(root.join("run_log.txt")).expect("run log");
    let numbers: Vec<&str> = log
        .lines()
        .map(|line| line.split(' ').next().expect("run number"))
        .collect();
    assert_eq!(numbers, vec!["0", "1", "2", "3"]);
    for run in 0..4 {
        assert!(root.join(format!("run_{run}")).join("dtopo.tt3").exists());
        assert!(root.join(format!("run_{run}")).join("fault_slip.svg").exists());
    }

    let manifest: Value =
        serde_json::from_slice(&fs::read(root.join("ensemble.json")).expect("manifest"))
            .expect("json");
    assert_eq!(manifest["total_runs"], 4);
    assert_eq!(manifest["name"], "fidelity-test");
}

#[test]
fn data_path_environment_sets_the_base_directory() {
    let dir = tempdir().expect("tempdir");
    let base = dir.path().join("data");
    fs::write(dir.path().join("table.csv"), "10.0, 20.0\n30.0, 40.0\n").expect("table");
    let output = Command::new(env!("CARGO_BIN_EXE_slip-run"))
        .current_dir(dir.path())
        .env("DATA_PATH", &base)
        .env("RUST_LOG", "warn")
        .args(["build", "--table", "table.csv"])
        .output()
        .expect("run slip-run");
    assert!(output.status.success(), "build failed: {output:?}");
    assert!(base.join(ROOT).join("run_log.txt").exists());
    assert!(!dir.path().join(ROOT).exists());
}

#[test]
fn malformed_table_fails_before_the_run_log() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("random_sample.txt"), "1.0 2.0\n3.0\n").expect("table");
    let output = slip_run(dir.path(), &["build"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("table-dimension"));
    assert!(!dir.path().join(ROOT).join("run_log.txt").exists());
}

#[test]
fn missing_table_is_reported() {
    let dir = tempdir().expect("tempdir");
    let output = slip_run(dir.path(), &["build", "--table", "absent.txt"]);
    assert!(!output.status.success());
    assert!(!dir.path().join(ROOT).exists());
}

#[test]
fn failed_row_is_listed_in_the_report() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("random_sample.txt"), "10.0\nNaN\n30.0\n").expect("table");
    let output = slip_run(dir.path(), &["build"]);
    assert!(output.status.success(), "build failed: {output:?}");
    let text = stdout(&output);
    assert!(text.contains("prepared 2 of 3 runs, 1 failed"));
    assert!(text.contains("run 1:"));
    assert!(text.contains("submitted 2 runs"));
    let log = fs::read_to_string(dir.path().join(ROOT).join("run_log.txt")).expect("log");
    assert_eq!(log, "0 10.0\n1 NaN\n2 30.0\n");
}

#[test]
fn empty_table_creates_an_empty_log() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("random_sample.txt"), "").expect("table");
    let output = slip_run(dir.path(), &["build"]);
    assert!(output.status.success(), "build failed: {output:?}");
    let log = dir.path().join(ROOT).join("run_log.txt");
    assert_eq!(fs::metadata(log).expect("log").len(), 0);
    assert!(stdout(&output).contains("prepared 0 of 0 runs"));
}

#[test]
fn replay_restores_a_lost_surface() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("random_sample.txt"), "5.0 6.0\n7.0 8.0\n").expect("table");
    assert!(slip_run(dir.path(), &["build"]).status.success());
    let surface = dir.path().join(ROOT).join("run_1").join("dtopo.tt3");
    let original = fs::read(&surface).expect("surface");
    fs::remove_file(&surface).expect("remove");

    let output = slip_run(dir.path(), &["replay", "--run", "1"]);
    assert!(output.status.success(), "replay failed: {output:?}");
    assert_eq!(fs::read(&surface).expect("surface"), original);
    assert!(stdout(&output).contains("prepared 1 of 2 runs"));
}

#[test]
fn inspect_reports_logged_runs_as_json() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("random_sample.txt"), "10.0\n20.0\n30.0\n").expect("table");
    assert!(slip_run(dir.path(), &["build"]).status.success());

    let output = slip_run(dir.path(), &["inspect", "--json"]);
    assert!(output.status.success(), "inspect failed: {output:?}");
    let body: Value = serde_json::from_str(&stdout(&output)).expect("json");
    let runs = body["runs"].as_array().expect("runs");
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[2]["prefix"], "run_2");
    assert_eq!(body["statistics"]["dimensions"][0]["min"], 10.0);
    assert_eq!(body["statistics"]["dimensions"][0]["max"], 30.0);
}

#[cfg(unix)]
#[test]
fn execute_runs_the_configured_executable() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("random_sample.txt"), "10.0\n20.0\n").expect("table");
    fs::write(dir.path().join("ensemble.yaml"), "executable: \"true\"\nparallelism: 2\n")
        .expect("config");
    let output = slip_run(
        dir.path(),
        &["build", "--config", "ensemble.yaml", "--execute", "--wait", "--plot"],
    );
    assert!(output.status.success(), "build failed: {output:?}");
    let text = stdout(&output);
    assert!(text.contains("2 completed, 0 failed"));
    assert!(dir
        .path()
        .join(ROOT)
        .join("run_0")
        .join("run_0_log.txt")
        .exists());
}
