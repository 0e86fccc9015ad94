// Shared fakes for integration tests
//
// `FakeGateway` stands in for the session access API and records every call.
// `FakeCaptureBackend` stands in for the camera and counts live streams so
// tests can assert that devices are always released.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use interview_runner::config::Config;
use interview_runner::device::{
    CaptureBackend, CaptureHandle, FrameSource, MediaConstraints, RecorderControl, RecorderEvent,
    RecorderSession, VideoFrame,
};
use interview_runner::error::SessionError;
use interview_runner::gateway::SessionGateway;
use interview_runner::recording::RecordingArtifact;
use interview_runner::session::{
    Campaign, Question, SessionDescriptor, SessionStatus, StartReceipt,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

// ============================================================================
// Session fixtures
// ============================================================================

/// Session with `count` questions, 5s preparation and 10s response each
pub fn session(count: u32) -> SessionDescriptor {
    SessionDescriptor {
        id: "session-1".to_string(),
        status: SessionStatus::Invited,
        campaign: Campaign {
            title: "Customer Support Lead".to_string(),
            description: "Two short questions".to_string(),
        },
        questions: (1..=count)
            .map(|order| Question {
                id: 100 + order as u64,
                order,
                text: format!("Question {}", order),
                preparation_time: 5,
                response_time_limit: 10,
            })
            .collect(),
        is_used: false,
    }
}

/// Defaults with fast resolve retries
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.gateway.resolve_backoff_ms = 10;
    cfg
}

// ============================================================================
// Gateway
// ============================================================================

pub struct FakeGateway {
    descriptor: SessionDescriptor,
    /// Network failures returned before resolve succeeds
    resolve_failures: AtomicUsize,
    start_error: Option<SessionError>,
    /// Zero-based submit call that fails with a network error
    fail_submit_at: Option<usize>,
    /// Time each upload takes before it lands
    submit_delay: Option<Duration>,
    pub resolve_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    submitted: Mutex<Vec<RecordingArtifact>>,
}

impl FakeGateway {
    pub fn new(descriptor: SessionDescriptor) -> Self {
        Self {
            descriptor,
            resolve_failures: AtomicUsize::new(0),
            start_error: None,
            fail_submit_at: None,
            submit_delay: None,
            resolve_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_resolve_failures(self, failures: usize) -> Self {
        self.resolve_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_start_error(mut self, error: SessionError) -> Self {
        self.start_error = Some(error);
        self
    }

    pub fn failing_submit_at(mut self, call: usize) -> Self {
        self.fail_submit_at = Some(call);
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn submitted(&self) -> Vec<RecordingArtifact> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionGateway for FakeGateway {
    async fn resolve(&self, _access_token: &str) -> Result<SessionDescriptor, SessionError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.resolve_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.resolve_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SessionError::NetworkFailure("connection refused".to_string()));
        }

        Ok(self.descriptor.clone())
    }

    async fn start(&self, _access_token: &str) -> Result<StartReceipt, SessionError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }

        Ok(StartReceipt {
            session_id: self.descriptor.id.clone(),
            status: SessionStatus::InProgress,
            started_at: Utc::now(),
        })
    }

    async fn submit(
        &self,
        _session_id: &str,
        artifact: &RecordingArtifact,
    ) -> Result<(), SessionError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_submit_at == Some(call) {
            return Err(SessionError::NetworkFailure("upload interrupted".to_string()));
        }

        self.submitted.lock().unwrap().push(artifact.clone());
        Ok(())
    }
}

// ============================================================================
// Capture backend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderMode {
    /// One 16-byte chunk per timeslice
    Normal,
    /// Only empty chunks
    Empty,
    /// Error event after this many chunks
    FailAfter(usize),
}

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
    acquisitions: AtomicUsize,
    denials_left: AtomicUsize,
}

pub struct FakeCaptureBackend {
    counters: Arc<Counters>,
    video_tracks: usize,
    recorder: RecorderMode,
    frames: Option<Arc<dyn FrameSource>>,
}

impl FakeCaptureBackend {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            video_tracks: 1,
            recorder: RecorderMode::Normal,
            frames: None,
        }
    }

    /// Refuse the next `times` acquisitions
    pub fn denying(self, times: usize) -> Self {
        self.counters.denials_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn with_video_tracks(mut self, tracks: usize) -> Self {
        self.video_tracks = tracks;
        self
    }

    pub fn with_recorder(mut self, mode: RecorderMode) -> Self {
        self.recorder = mode;
        self
    }

    pub fn with_frames(mut self, frames: Arc<dyn FrameSource>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    pub fn acquisitions(&self) -> usize {
        self.counters.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureBackend for FakeCaptureBackend {
    async fn acquire(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<Box<dyn CaptureHandle>, SessionError> {
        let denials = self.counters.denials_left.load(Ordering::SeqCst);
        if denials > 0 {
            self.counters.denials_left.store(denials - 1, Ordering::SeqCst);
            return Err(SessionError::PermissionDenied("user dismissed prompt".to_string()));
        }

        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeHandle {
            counters: Arc::clone(&self.counters),
            video_tracks: self.video_tracks,
            recorder: self.recorder,
            frames: self.frames.clone(),
            recorder_task: None,
            stopped: false,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeHandle {
    counters: Arc<Counters>,
    video_tracks: usize,
    recorder: RecorderMode,
    frames: Option<Arc<dyn FrameSource>>,
    recorder_task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl CaptureHandle for FakeHandle {
    fn video_tracks(&self) -> usize {
        self.video_tracks
    }

    fn frame_source(&self) -> Option<Arc<dyn FrameSource>> {
        self.frames.clone()
    }

    fn open_recorder(&mut self, timeslice: Duration) -> Result<RecorderSession, SessionError> {
        let (tx, rx) = mpsc::channel(64);
        let stop = Arc::new(Notify::new());
        let stop_rx = Arc::clone(&stop);
        let mode = self.recorder;

        self.recorder_task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + timeslice, timeslice);
            let mut sent = 0usize;

            loop {
                tokio::select! {
                    _ = stop_rx.notified() => break,
                    _ = ticker.tick() => {
                        let event = match mode {
                            RecorderMode::Normal => RecorderEvent::Data(vec![sent as u8; 16]),
                            RecorderMode::Empty => RecorderEvent::Data(Vec::new()),
                            RecorderMode::FailAfter(n) if sent >= n => {
                                let _ = tx.send(RecorderEvent::Error("encoder crashed".to_string())).await;
                                break;
                            }
                            RecorderMode::FailAfter(_) => RecorderEvent::Data(vec![sent as u8; 16]),
                        };
                        sent += 1;
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }));

        Ok(RecorderSession {
            events: rx,
            control: Box::new(FakeControl(stop)),
        })
    }

    fn stop(&mut self) {
        if let Some(task) = self.recorder_task.take() {
            task.abort();
        }
        if !self.stopped {
            self.stopped = true;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct FakeControl(Arc<Notify>);

impl RecorderControl for FakeControl {
    fn request_stop(&self) {
        self.0.notify_one();
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Frame source that always returns the same blank 640x480 frame
pub struct StillFrames;

impl FrameSource for StillFrames {
    fn grab_frame(&self) -> Option<VideoFrame> {
        Some(VideoFrame {
            width: 640,
            height: 480,
            pixels: Arc::from(vec![0u8; 16]),
            captured_at: Utc::now(),
        })
    }
}
