use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn make_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Run `script` through linesh from inside `dir`, adjusting its environment first.
fn run_in(dir: &Path, script: &str, setup: impl FnOnce(&mut Command)) -> Output {
    let input = dir.join("input.lsh");
    fs::write(&input, script).unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linesh"));
    cmd.arg(&input).current_dir(dir).env_remove("LINESH_ERROR_FORMAT");
    setup(&mut cmd);
    cmd.output().unwrap()
}

#[test]
fn test_bare_name_is_searched_in_path() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    fs::create_dir(&bin).unwrap();
    make_tool(&bin, "greet", "echo greet $1");

    let output = run_in(temp.path(), "greet world\n", |cmd| {
        cmd.env("PATH", &bin);
    });
    assert_eq!(String::from_utf8_lossy(&output.stdout), "greet world\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_relative_name_uses_working_directory() {
    let temp = TempDir::new().unwrap();
    make_tool(temp.path(), "local", "echo local");

    // Nothing on the search path could match.
    let output = run_in(temp.path(), "./local\n", |cmd| {
        cmd.env("PATH", "/nonexistent");
    });
    assert_eq!(String::from_utf8_lossy(&output.stdout), "local\n");
}

#[test]
fn test_absolute_name_ignores_path() {
    let temp = TempDir::new().unwrap();
    let tool = make_tool(temp.path(), "abs", "echo absolute");

    let output = run_in(temp.path(), &format!("{}\n", tool.display()), |cmd| {
        cmd.env_remove("PATH");
    });
    assert_eq!(String::from_utf8_lossy(&output.stdout), "absolute\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_missing_search_path_is_reported() {
    let temp = TempDir::new().unwrap();
    let output = run_in(temp.path(), "ls\n", |cmd| {
        cmd.env_remove("PATH");
    });
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(127));
    assert!(stderr.contains("PATH is not set"), "stderr: {}", stderr);
}

#[test]
fn test_custom_search_path_variable() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("tools");
    fs::create_dir(&bin).unwrap();
    make_tool(&bin, "special", "echo special");

    let output = run_in(temp.path(), "special\n", |cmd| {
        cmd.env("LINESH_PATH_VAR", "TOOL_PATH")
            .env("TOOL_PATH", &bin)
            .env("PATH", "/nonexistent");
    });
    assert_eq!(String::from_utf8_lossy(&output.stdout), "special\n");
}

#[test]
fn test_unknown_command_aborts_the_run() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("marker");

    let script = format!(
        "no-such-command-anywhere\n/bin/sh -c \"touch {}\"\n",
        marker.display()
    );
    let output = run_in(temp.path(), &script, |_| {});
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(127));
    assert!(stderr.contains("line 1: no-such-command-anywhere: command not found"));
    assert!(!marker.exists());
}

#[test]
fn test_non_executable_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    fs::create_dir(&first).unwrap();
    fs::create_dir(&second).unwrap();
    fs::write(first.join("tool"), "#!/bin/sh\necho wrong\n").unwrap();
    make_tool(&second, "tool", "echo right");

    let joined = std::env::join_paths([&first, &second]).unwrap();
    let output = run_in(temp.path(), "tool\n", |cmd| {
        cmd.env("PATH", &joined);
    });
    assert_eq!(String::from_utf8_lossy(&output.stdout), "right\n");
}
