//! Tests for the action executor against a temporary workspace

use std::fs;

use autocoder_agent::{Action, ExecutionResult, Executor};
use tempfile::TempDir;

fn workspace() -> (TempDir, Executor) {
    let dir = TempDir::new().unwrap();
    let executor = Executor::new(dir.path());
    (dir, executor)
}

#[tokio::test]
async fn test_write_nested_file() {
    let (dir, executor) = workspace();

    let result = executor.write_file("a/b/c.txt", "hello").await;

    assert_eq!(
        result,
        ExecutionResult::Written {
            path: "a/b/c.txt".to_string(),
            bytes: 5
        }
    );
    assert!(dir.path().join("a").is_dir());
    assert!(dir.path().join("a/b").is_dir());
    assert_eq!(fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(), "hello");
}

#[tokio::test]
async fn test_second_write_replaces_content() {
    let (dir, executor) = workspace();

    executor.write_file("main.py", "print('one')").await;
    executor.write_file("main.py", "print('two')").await;

    assert_eq!(
        fs::read_to_string(dir.path().join("main.py")).unwrap(),
        "print('two')"
    );
}

#[tokio::test]
async fn test_traversal_is_rejected_without_writing() {
    let dir = TempDir::new().unwrap();
    let workspace = dir.path().join("workspace");
    let executor = Executor::new(&workspace);

    let result = executor.write_file("../evil.sh", "rm -rf /").await;

    assert!(matches!(result, ExecutionResult::Rejected { ref path, .. } if path == "../evil.sh"));
    assert!(!dir.path().join("evil.sh").exists());
    // rejection happens before any filesystem access
    assert!(!workspace.exists());
}

#[tokio::test]
async fn test_absolute_and_odd_names_are_rejected() {
    let (_dir, executor) = workspace();

    for name in ["/etc/passwd", "", "a b.txt", "dir/", "a//b", "x;rm.sh"] {
        let result = executor.write_file(name, "x").await;
        assert!(
            matches!(result, ExecutionResult::Rejected { .. }),
            "{name:?} should be rejected, got {result:?}"
        );
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_directory_escape_is_rejected() {
    let dir = TempDir::new().unwrap();
    let workspace = dir.path().join("workspace");
    let outside = dir.path().join("outside");
    fs::create_dir_all(&workspace).unwrap();
    fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, workspace.join("out")).unwrap();

    let executor = Executor::new(&workspace);
    let result = executor.write_file("out/payload.sh", "echo pwned").await;

    assert!(matches!(result, ExecutionResult::Rejected { .. }));
    assert!(!outside.join("payload.sh").exists());
}

#[tokio::test]
async fn test_write_over_directory_reports_failure() {
    let (dir, executor) = workspace();
    fs::create_dir_all(dir.path().join("src/inner")).unwrap();

    let result = executor.write_file("src", "not a dir").await;

    assert!(matches!(result, ExecutionResult::WriteFailed { .. }));
    assert!(result.transcript_line().starts_with("[!] Failed to write src"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_shell_captures_stdout_then_stderr() {
    let (_dir, executor) = workspace();

    let result = executor.run_shell("echo out; echo err >&2").await;

    match result {
        ExecutionResult::Shell {
            output,
            exit_code,
            timed_out,
        } => {
            assert_eq!(output, "out\nerr\n");
            assert_eq!(exit_code, Some(0));
            assert!(!timed_out);
        }
        other => panic!("expected shell result, got {:?}", other),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_shell_in_workspace() {
    let (dir, executor) = workspace();
    executor.write_file("hello.txt", "hi there").await;

    let result = executor.run_shell("cat hello.txt").await;
    assert_eq!(result.shell_output(), Some("hi there"));

    let pwd = executor.run_shell("pwd -P").await;
    let canonical = dir.path().canonicalize().unwrap();
    assert_eq!(
        pwd.shell_output().map(str::trim),
        Some(canonical.to_str().unwrap())
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_zero_exit_still_returns_output() {
    let (_dir, executor) = workspace();

    let result = executor.run_shell("echo failing; exit 3").await;

    assert!(matches!(
        result,
        ExecutionResult::Shell { exit_code: Some(3), .. }
    ));
    assert_eq!(result.shell_output(), Some("failing\n"));
}

#[tokio::test]
async fn test_execute_dispatches_each_kind() {
    let (dir, executor) = workspace();

    let written = executor
        .execute(&Action::WriteFile {
            path: "x.txt".to_string(),
            content: "1".to_string(),
        })
        .await;
    assert!(matches!(written, ExecutionResult::Written { bytes: 1, .. }));
    assert!(dir.path().join("x.txt").exists());

    let message = executor
        .execute(&Action::Emit {
            message: "thinking".to_string(),
        })
        .await;
    assert_eq!(message, ExecutionResult::Informational("thinking".to_string()));
}
