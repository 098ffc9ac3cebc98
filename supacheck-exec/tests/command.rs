#![cfg(unix)]

use supacheck_exec::command::{CommandError, CommandRunner, ShellCommandRunner};
use tempfile::TempDir;

#[tokio::test]
async fn captures_stdout_on_success() {
    let out = ShellCommandRunner.run("echo hello", None).await.unwrap();
    assert!(out.success);
    assert_eq!(out.status_code, Some(0));
    assert_eq!(out.stdout, "hello\n");
    assert!(out.stderr.is_empty());
}

#[tokio::test]
async fn non_zero_exit_is_failure() {
    let out = ShellCommandRunner
        .run("echo partial; echo broken >&2; exit 3", None)
        .await
        .unwrap();
    assert!(!out.success);
    assert_eq!(out.status_code, Some(3));
    assert_eq!(out.stdout, "partial\n");
    assert_eq!(out.stderr, "broken\n");
}

#[tokio::test]
async fn stderr_alone_does_not_fail() {
    let out = ShellCommandRunner.run("echo warn >&2", None).await.unwrap();
    assert!(out.success);
    assert_eq!(out.stderr, "warn\n");
}

#[tokio::test]
async fn runs_in_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
    let out = ShellCommandRunner.run("ls", Some(dir.path())).await.unwrap();
    assert!(out.stdout.contains("marker.txt"));
}

#[tokio::test]
async fn missing_working_directory_is_a_spawn_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = ShellCommandRunner.run("true", Some(&missing)).await.unwrap_err();
    assert!(matches!(err, CommandError::Spawn { ref command, .. } if command == "true"));
}
