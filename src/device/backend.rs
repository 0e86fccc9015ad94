use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Which constraint set a stream was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureProfile {
    /// Low-cost preview used for the permission check and preparation
    Preview,
    /// Capture-quality stream used while an answer is recorded
    Recording,
}

/// Requested camera and microphone settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Ideal video width in pixels
    pub width: u32,
    /// Ideal video height in pixels
    pub height: u32,
    /// Ideal frame rate, if the profile cares
    pub frame_rate: Option<u32>,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Audio sample rate in Hz, if the profile cares
    pub audio_sample_rate: Option<u32>,
}

impl MediaConstraints {
    pub fn preview() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: None,
            echo_cancellation: false,
            noise_suppression: false,
            audio_sample_rate: None,
        }
    }

    pub fn recording() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: Some(30),
            echo_cancellation: true,
            noise_suppression: true,
            audio_sample_rate: Some(44100),
        }
    }
}

/// A decoded video frame handed to face detection
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB pixels, row-major
    pub pixels: Arc<[u8]>,
    pub captured_at: DateTime<Utc>,
}

impl VideoFrame {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Event emitted by a running recorder
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// One encoded chunk (may be empty when the encoder had nothing to flush)
    Data(Vec<u8>),
    /// Asynchronous hardware or codec failure; no further data follows
    Error(String),
}

/// Stop control for a running recorder
///
/// After `request_stop` the recorder flushes what it has and closes its event
/// channel.
pub trait RecorderControl: Send + Sync {
    fn request_stop(&self);
}

/// A recorder attached to a live capture handle
pub struct RecorderSession {
    pub events: mpsc::Receiver<RecorderEvent>,
    pub control: Box<dyn RecorderControl>,
}

/// Pull-based access to the most recent video frame
pub trait FrameSource: Send + Sync {
    fn grab_frame(&self) -> Option<VideoFrame>;
}

/// One live camera+microphone grab
pub trait CaptureHandle: Send {
    /// Number of video tracks the device actually delivered
    fn video_tracks(&self) -> usize;

    /// Frame access for presence sampling, if the backend can decode frames
    fn frame_source(&self) -> Option<Arc<dyn FrameSource>>;

    /// Start chunked capture, one chunk per `timeslice`
    fn open_recorder(&mut self, timeslice: Duration) -> Result<RecorderSession, SessionError>;

    /// Stop every track; the handle is unusable afterwards
    fn stop(&mut self);
}

/// Camera/microphone capture backend trait
///
/// Platform-specific implementations:
/// - Browser/webview: getUserMedia + MediaRecorder bridged into Rust
/// - Native: platform camera framework
/// - Replay: pre-recorded media file (kiosk demos, tests)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request camera and microphone access
    ///
    /// Fails with `PermissionDenied` when access is refused and
    /// `DeviceUnavailable` when no device can satisfy the request.
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn CaptureHandle>, SessionError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
