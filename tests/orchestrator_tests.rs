// Integration tests for the interview runner
//
// Each test drives a real `InterviewRunner` against fake gateway and capture
// backends on a paused tokio clock, observing it only through the published
// `SessionView`, the way a presentation layer would.

mod common;

use anyhow::Result;
use common::{session, test_config, FakeCaptureBackend, FakeGateway, RecorderMode};
use interview_runner::error::{ConflictCode, ErrorKind, SessionError};
use interview_runner::orchestrator::{InterviewHandle, InterviewRunner, SessionView, StageKind};
use interview_runner::presence::DisabledDetector;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

fn spawn(
    gateway: &Arc<FakeGateway>,
    backend: &Arc<FakeCaptureBackend>,
) -> (InterviewHandle, JoinHandle<()>) {
    InterviewRunner::spawn(
        "token-abc",
        test_config(),
        gateway.clone(),
        backend.clone(),
        Arc::new(DisabledDetector),
    )
}

async fn wait_stage(handle: &InterviewHandle, stage: StageKind) -> Result<SessionView> {
    handle.wait_for(|v| v.stage == stage).await
}

async fn wait_question(
    handle: &InterviewHandle,
    stage: StageKind,
    index: usize,
) -> Result<SessionView> {
    handle
        .wait_for(|v| v.stage == stage && v.question_index == Some(index))
        .await
}

async fn wait_capturing(handle: &InterviewHandle, index: usize) -> Result<SessionView> {
    handle
        .wait_for(|v| v.is_recording && v.question_index == Some(index))
        .await
}

#[tokio::test(start_paused = true)]
async fn test_two_question_interview_end_to_end() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(2)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, runner) = spawn(&gateway, &backend);

    let view = wait_stage(&handle, StageKind::Instructions).await?;
    assert_eq!(view.campaign_title.as_deref(), Some("Customer Support Lead"));
    assert_eq!(view.question_count, 2);
    assert_eq!(backend.live(), 1);

    handle.start()?;

    let view = wait_question(&handle, StageKind::Preparation, 0).await?;
    assert_eq!(view.remaining_seconds, 5);
    assert_eq!(view.question_text.as_deref(), Some("Question 1"));
    assert!(view.is_preparing);
    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 1);

    let view = wait_capturing(&handle, 0).await?;
    assert_eq!(view.remaining_seconds, 10);
    assert_eq!(view.remaining_display, "00:10");

    // Stop early with 7 seconds left
    handle.wait_for(|v| v.remaining_seconds == 7).await?;
    handle.stop()?;

    let view = wait_question(&handle, StageKind::Preparation, 1).await?;
    assert_eq!(view.submitted_answers, 1);
    assert_eq!(view.progress_percent, 50);

    // Second answer runs until the response limit
    wait_capturing(&handle, 1).await?;
    let view = wait_stage(&handle, StageKind::Completed).await?;
    assert_eq!(view.submitted_answers, 2);
    assert_eq!(view.progress_percent, 100);

    let submitted = gateway.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].question_id, 101);
    assert_eq!(submitted[1].question_id, 102);

    assert_eq!(submitted[0].preparation_secs(), 5);
    assert!((2_900..=3_100).contains(&submitted[0].recording_ms_used));
    assert_eq!(submitted[0].recording_secs(), 3);
    assert_eq!(submitted[1].recording_secs(), 10);
    assert!(submitted.iter().all(|a| !a.media.is_empty()));

    assert_eq!(backend.live(), 0);
    assert_eq!(backend.max_live(), 1);

    handle.leave()?;
    runner.await?;

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_repeated_stop_submits_once() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;
    wait_capturing(&handle, 0).await?;
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    handle.stop()?;
    handle.stop()?;
    handle.stop()?;

    wait_stage(&handle, StageKind::Completed).await?;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(gateway.submit_calls(), 1);
    assert_eq!(gateway.submitted().len(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_starts_once() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;
    handle.start()?;

    wait_question(&handle, StageKind::Preparation, 0).await?;
    handle.start()?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_halts_the_flow() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(2)).failing_submit_at(0));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;
    wait_capturing(&handle, 0).await?;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    handle.stop()?;

    let view = wait_stage(&handle, StageKind::Error).await?;
    let error = view.error.clone().expect("error view is set");
    assert_eq!(error.kind, ErrorKind::NetworkFailure);
    assert!(view.question_index.is_none());

    // Preview for loading plus the recording grab; question 2 never acquired
    assert_eq!(backend.acquisitions(), 2);
    assert_eq!(backend.live(), 0);

    // No automatic progress after an error
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.view(), view);
    assert_eq!(gateway.submit_calls(), 1);
    assert!(gateway.submitted().is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_then_retry() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new().denying(1));
    let (handle, _runner) = spawn(&gateway, &backend);

    let view = wait_stage(&handle, StageKind::Error).await?;
    let error = view.error.expect("error view is set");
    assert_eq!(error.kind, ErrorKind::PermissionDenied);
    assert_eq!(gateway.resolve_calls.load(Ordering::SeqCst), 0);

    handle.retry()?;

    let view = wait_stage(&handle, StageKind::Instructions).await?;
    assert!(view.error.is_none());
    assert_eq!(backend.live(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_video_track_is_device_unavailable() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new().with_video_tracks(0));
    let (handle, _runner) = spawn(&gateway, &backend);

    let view = wait_stage(&handle, StageKind::Error).await?;
    assert_eq!(view.error.map(|e| e.kind), Some(ErrorKind::DeviceUnavailable));
    assert_eq!(backend.live(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_resolve_retries_network_failures() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)).with_resolve_failures(2));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    assert_eq!(gateway.resolve_calls.load(Ordering::SeqCst), 3);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_resolve_gives_up_after_configured_attempts() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)).with_resolve_failures(5));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    let view = wait_stage(&handle, StageKind::Error).await?;
    assert_eq!(view.error.map(|e| e.kind), Some(ErrorKind::NetworkFailure));
    assert_eq!(gateway.resolve_calls.load(Ordering::SeqCst), 3);
    assert_eq!(backend.live(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_used_session_is_a_conflict() -> Result<()> {
    let mut used = session(1);
    used.is_used = true;

    let gateway = Arc::new(FakeGateway::new(used));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    let view = wait_stage(&handle, StageKind::Error).await?;
    let error = view.error.expect("error view is set");
    assert_eq!(error.kind, ErrorKind::SessionConflict);
    assert_eq!(
        error.message,
        SessionError::conflict(ConflictCode::SessionAlreadyUsed, "").user_message()
    );
    assert_eq!(gateway.start_calls.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_start_rejected_by_server() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)).with_start_error(
        SessionError::conflict(ConflictCode::SessionAlreadyStarted, "started elsewhere"),
    ));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;

    let view = wait_stage(&handle, StageKind::Error).await?;
    assert_eq!(view.error.map(|e| e.kind), Some(ErrorKind::SessionConflict));
    assert_eq!(backend.live(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_recorder_failure_mid_answer() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(2)));
    let backend = Arc::new(FakeCaptureBackend::new().with_recorder(RecorderMode::FailAfter(5)));
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;

    let view = wait_stage(&handle, StageKind::Error).await?;
    assert_eq!(view.error.map(|e| e.kind), Some(ErrorKind::RecorderFailure));
    assert_eq!(backend.live(), 0);
    assert_eq!(gateway.submit_calls(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_empty_recording_is_not_submitted() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new().with_recorder(RecorderMode::Empty));
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;
    wait_capturing(&handle, 0).await?;
    handle.stop()?;

    let view = wait_stage(&handle, StageKind::Error).await?;
    assert_eq!(view.error.map(|e| e.kind), Some(ErrorKind::RecorderFailure));
    assert_eq!(gateway.submit_calls(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_leave_mid_recording_releases_everything() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(2)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;
    wait_capturing(&handle, 0).await?;
    assert_eq!(backend.live(), 1);

    handle.leave()?;
    runner.await?;

    assert_eq!(backend.live(), 0);
    assert_eq!(gateway.submit_calls(), 0);

    let view = handle.view();
    assert_eq!(view.stage, StageKind::Closed);
    assert!(!view.is_recording);
    assert!(!view.is_preparing);
    assert!(!view.is_busy);
    assert!(view.question_index.is_none());
    assert_eq!(view.remaining_seconds, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_leave_during_slow_upload_does_not_advance() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(2)).with_submit_delay(Duration::from_secs(20)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;
    wait_capturing(&handle, 0).await?;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    handle.stop()?;

    // Upload of question 1 is still in flight
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(gateway.submit_calls(), 1);
    assert!(handle.view().is_busy);

    let left_at = tokio::time::Instant::now();
    handle.leave()?;
    runner.await?;
    assert!(left_at.elapsed() < Duration::from_secs(1));

    // Preview plus the first recording grab; question 2 never reacquires
    assert_eq!(backend.acquisitions(), 2);
    assert_eq!(backend.live(), 0);
    assert!(gateway.submitted().is_empty());
    assert_eq!(handle.view().stage, StageKind::Closed);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_leaves_the_flow() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    assert_eq!(backend.live(), 1);

    let views = handle.subscribe();
    drop(handle);
    runner.await?;

    assert_eq!(backend.live(), 0);
    assert_eq!(views.borrow().stage, StageKind::Closed);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_countdown_is_visible_during_preparation() -> Result<()> {
    let gateway = Arc::new(FakeGateway::new(session(1)));
    let backend = Arc::new(FakeCaptureBackend::new());
    let (handle, _runner) = spawn(&gateway, &backend);

    wait_stage(&handle, StageKind::Instructions).await?;
    handle.start()?;

    let mut views = handle.subscribe();
    let mut seen = Vec::new();
    while seen.last() != Some(&1) {
        views.changed().await?;
        let view = views.borrow_and_update().clone();
        if view.is_preparing && !seen.contains(&view.remaining_seconds) {
            seen.push(view.remaining_seconds);
        }
    }

    assert_eq!(seen, vec![5, 4, 3, 2, 1]);

    Ok(())
}
