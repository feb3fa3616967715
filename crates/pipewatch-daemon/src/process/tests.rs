use super::*;
use crate::config::PipelineCommand;
use pipewatch_types::SupervisorError;
use std::path::Path;
use std::time::Duration;

fn sh(script: &str) -> PipelineCommand {
    PipelineCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script.into(), "pipeline".into()],
        ..Default::default()
    }
}

fn fake_git(dir: &Path, body: &str) -> EmergencyCommit {
    let path = dir.join("fake-git.sh");
    std::fs::write(&path, format!("{}\n", body)).unwrap();
    EmergencyCommit::with_command(dir, "sh", vec![path.to_string_lossy().into_owned()])
}

#[tokio::test]
async fn test_start_and_wait_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = ProcessManager::new(dir.path(), sh("exit 3"));

    let pid = manager.start(false, None).unwrap().pid();
    assert!(pid.is_some());
    assert_eq!(manager.wait().await, Some(Some(3)));
    assert!(!manager.is_running());
    assert_eq!(manager.wait().await, None);
}

#[tokio::test]
async fn test_resume_and_feature_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = ProcessManager::new(dir.path(), sh("echo \"$@\" > args.txt"));

    let handle = manager.start(true, Some("deals")).unwrap();
    assert!(handle.command_line().ends_with("--resume --feature deals"));
    manager.wait().await;

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert_eq!(args.trim(), "--resume --feature deals");
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = ProcessManager::new(dir.path(), sh("sleep 5"));

    let pid = manager.start(false, None).unwrap().pid().unwrap();
    assert!(matches!(
        manager.start(false, None),
        Err(SupervisorError::AlreadyRunning(_))
    ));

    terminate(pid).unwrap();
    assert_eq!(manager.wait().await, Some(None));
}

#[tokio::test]
async fn test_reap_clears_finished_child() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = ProcessManager::new(dir.path(), sh("exit 0"));
    manager.start(false, None).unwrap();

    let mut reaped = None;
    for _ in 0..100 {
        if let Some(status) = manager.reap() {
            reaped = Some(status);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(reaped, Some(Some(0)));
    assert_eq!(manager.active_pid(), None);
    assert!(manager.start(false, None).is_ok());
}

#[tokio::test]
async fn test_spawn_failure() {
    let dir = tempfile::tempdir().unwrap();
    let command = PipelineCommand {
        program: "/nonexistent/pipeline-binary".into(),
        ..Default::default()
    };
    let mut manager = ProcessManager::new(dir.path(), command);
    assert!(matches!(
        manager.start(false, None),
        Err(SupervisorError::ProcessSpawn(_))
    ));
    assert!(!manager.is_running());
}

#[test]
fn test_terminate_refuses_reserved_pids() {
    assert!(matches!(terminate(0), Err(SupervisorError::Signal(_))));
    assert!(matches!(terminate(1), Err(SupervisorError::Signal(_))));
}

#[tokio::test]
async fn test_emergency_commit_runs_all_steps() {
    let dir = tempfile::tempdir().unwrap();
    fake_git(dir.path(), "echo \"$1\" >> calls.txt")
        .run()
        .await
        .unwrap();

    let calls = std::fs::read_to_string(dir.path().join("calls.txt")).unwrap();
    assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["add", "commit", "push"]);
}

#[tokio::test]
async fn test_emergency_commit_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let result = fake_git(dir.path(), "echo \"$1\" >> calls.txt\n[ \"$1\" != commit ]")
        .run()
        .await;
    assert!(matches!(result, Err(SupervisorError::Vcs(_))));

    let calls = std::fs::read_to_string(dir.path().join("calls.txt")).unwrap();
    assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["add", "commit"]);
}
