use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run linesh over a script written into `dir`
fn run_linesh(dir: &Path, script: &str) -> Output {
    let input = dir.join("script.lsh");
    fs::write(&input, script).unwrap();
    Command::new(env!("CARGO_BIN_EXE_linesh"))
        .arg(&input)
        .current_dir(dir)
        .env_remove("LINESH_ERROR_FORMAT")
        .output()
        .expect("Failed to execute linesh")
}

#[test]
fn test_pipe_translates_case() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "echo hi | tr a-z A-Z\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "HI\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_pipe_with_file_input() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("data.txt"), "hello\nworld\nrust\n").unwrap();

    let output = run_linesh(temp.path(), "cat data.txt | grep rust\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "rust\n");
}

#[test]
fn test_large_output_does_not_deadlock() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "seq 1 100000 | wc -l\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "100000");
}

#[test]
fn test_consumer_sees_end_of_input() {
    let temp = TempDir::new().unwrap();
    // sort only writes once its input is closed
    let output = run_linesh(temp.path(), "printf \"c\\nb\\na\\n\" | sort\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a\nb\nc\n");
}

#[test]
fn test_pipe_output_keeps_statement_order() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(
        temp.path(),
        "echo first\necho second | tr a-z A-Z\necho third\n",
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "first\nSECOND\nthird\n"
    );
}

#[test]
fn test_failing_consumer_does_not_abort_run() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "echo hi | grep nomatch\necho after\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "after\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_unknown_producer_aborts_before_spawning() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "no-such-producer | cat\necho after\n");
    assert_eq!(output.status.code(), Some(127));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-producer: command not found"));
}

#[test]
fn test_unknown_consumer_aborts_before_spawning() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "echo hi | no-such-consumer\n");
    assert_eq!(output.status.code(), Some(127));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_three_stage_pipeline_is_rejected() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "echo a | cat | cat\necho after\n");
    assert_eq!(output.status.code(), Some(6));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("only one '|'"));
}

#[test]
fn test_pipe_then_redirect_writes_file_only() {
    let temp = TempDir::new().unwrap();
    let output = run_linesh(temp.path(), "echo hello | tr a-z A-Z > upper.txt\n");
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(temp.path().join("upper.txt")).unwrap(),
        "HELLO\n"
    );
}
