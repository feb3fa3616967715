use super::*;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use pipewatch_types::{PipelineStatus, StatusRecord, SupervisorError};
use std::time::Duration;

const STALL: Duration = Duration::from_secs(30 * 60);

fn record(status: PipelineStatus, exit_code: Option<i32>) -> StatusRecord {
    let mut record = StatusRecord::with_status(status);
    record.exit_code = exit_code;
    record
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_completed() {
    assert_eq!(classify(&record(PipelineStatus::Completed, Some(75)), now(), STALL), Action::Completed);
}

#[test]
fn test_exit_code_overrides_label() {
    assert_eq!(classify(&record(PipelineStatus::Failed, Some(75)), now(), STALL), Action::TokenExhausted);
    assert_eq!(classify(&record(PipelineStatus::Failed, Some(76)), now(), STALL), Action::ToolFailure);
    assert_eq!(classify(&record(PipelineStatus::Failed, Some(99)), now(), STALL), Action::Fatal);
    assert_eq!(classify(&record(PipelineStatus::Fatal, Some(75)), now(), STALL), Action::TokenExhausted);
    assert_eq!(classify(&record(PipelineStatus::ToolFailure, Some(99)), now(), STALL), Action::ToolFailure);
}

#[test]
fn test_label_used_without_known_exit_code() {
    assert_eq!(classify(&record(PipelineStatus::TokenExhausted, None), now(), STALL), Action::TokenExhausted);
    assert_eq!(classify(&record(PipelineStatus::ToolFailure, Some(1)), now(), STALL), Action::ToolFailure);
    assert_eq!(classify(&record(PipelineStatus::Fatal, None), now(), STALL), Action::Fatal);
    assert_eq!(classify(&record(PipelineStatus::Failed, Some(1)), now(), STALL), Action::GenericFailure);
    assert_eq!(classify(&record(PipelineStatus::Failed, None), now(), STALL), Action::GenericFailure);
}

#[test]
fn test_running_and_stale() {
    let mut running = record(PipelineStatus::Running, None);
    running.last_update = Some(now() - ChronoDuration::minutes(5));
    assert_eq!(classify(&running, now(), STALL), Action::Running);

    running.last_update = Some(now() - ChronoDuration::minutes(31));
    assert_eq!(classify(&running, now(), STALL), Action::StaleRunning);
}

#[test]
fn test_stale_falls_back_to_started_at() {
    let mut running = record(PipelineStatus::Running, None);
    running.started_at = Some(now() - ChronoDuration::hours(2));
    assert_eq!(classify(&running, now(), STALL), Action::StaleRunning);

    let bare = record(PipelineStatus::Running, None);
    assert_eq!(classify(&bare, now(), STALL), Action::Running);
}

#[test]
fn test_future_timestamp_is_not_stale() {
    let mut running = record(PipelineStatus::Running, None);
    running.last_update = Some(now() + ChronoDuration::hours(1));
    assert_eq!(classify(&running, now(), STALL), Action::Running);
}

#[test]
fn test_unrecognized_and_absent() {
    let paused = record(PipelineStatus::Unrecognized("paused".into()), Some(99));
    assert_eq!(classify(&paused, now(), STALL), Action::Unrecognized);
    assert_eq!(classify_snapshot(None, now(), STALL), Action::NoOp);
}

#[test]
fn test_level_triggered_actions() {
    assert!(Action::Running.is_level_triggered());
    assert!(Action::StaleRunning.is_level_triggered());
    assert!(!Action::Completed.is_level_triggered());
    assert!(!Action::Fatal.is_level_triggered());
}

#[test]
fn test_reader_absent_record() {
    let dir = tempfile::tempdir().unwrap();
    let reader = StatusReader::new(dir.path().join("pipeline-state.json"));
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn test_reader_parses_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline-state.json");
    std::fs::write(&path, r#"{"status":"failed","exit_code":76,"current_step":"QA"}"#).unwrap();

    let record = StatusReader::new(&path).read().unwrap().unwrap();
    assert_eq!(record.status, PipelineStatus::Failed);
    assert_eq!(classify(&record, now(), STALL), Action::ToolFailure);
}

#[test]
fn test_reader_corrupt_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline-state.json");
    std::fs::write(&path, "{\"status\": \"runn").unwrap();

    assert!(matches!(StatusReader::new(&path).read(), Err(SupervisorError::Parse(_))));
}

#[test]
fn test_reader_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(StatusReader::new(dir.path()).read(), Err(SupervisorError::Io(_))));
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn stall_window_boundary(age_secs in 0i64..7200, timeout_secs in 1u64..3600) {
            let mut running = record(PipelineStatus::Running, None);
            running.last_update = Some(now() - ChronoDuration::seconds(age_secs));

            let expected = if age_secs as u64 > timeout_secs {
                Action::StaleRunning
            } else {
                Action::Running
            };
            prop_assert_eq!(classify(&running, now(), Duration::from_secs(timeout_secs)), expected);
        }

        #[test]
        fn failure_exit_code_wins(status in prop_oneof![
            Just(PipelineStatus::Failed),
            Just(PipelineStatus::TokenExhausted),
            Just(PipelineStatus::ToolFailure),
            Just(PipelineStatus::Fatal),
        ]) {
            prop_assert_eq!(classify(&record(status.clone(), Some(75)), now(), STALL), Action::TokenExhausted);
            if status != PipelineStatus::TokenExhausted {
                prop_assert_eq!(classify(&record(status.clone(), Some(76)), now(), STALL), Action::ToolFailure);
            }
        }
    }
}
