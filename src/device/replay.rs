// File-backed capture backend
//
// Replays a pre-recorded media file as if it were a live camera: every
// timeslice the recorder emits the next slice of the file. Useful for kiosk
// demos and end-to-end runs on machines without a camera.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use super::backend::{
    CaptureBackend, CaptureHandle, FrameSource, MediaConstraints, RecorderControl, RecorderEvent,
    RecorderSession,
};
use crate::error::SessionError;

/// Capture backend that replays a media file
pub struct ReplayCaptureBackend {
    path: PathBuf,
    chunk_bytes: usize,
}

impl ReplayCaptureBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_bytes: 64 * 1024,
        }
    }

    /// Override how many bytes each timeslice emits
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ReplayCaptureBackend {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn CaptureHandle>, SessionError> {
        info!("Opening replay media: {}", self.path.display());

        let media = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            IoErrorKind::PermissionDenied => {
                SessionError::PermissionDenied(format!("{}: {}", self.path.display(), e))
            }
            _ => SessionError::DeviceUnavailable(format!("{}: {}", self.path.display(), e)),
        })?;

        if media.is_empty() {
            return Err(SessionError::DeviceUnavailable(format!(
                "{} contains no media",
                self.path.display()
            )));
        }

        info!(
            "Replay media loaded: {} bytes, requested {}x{}",
            media.len(),
            constraints.width,
            constraints.height
        );

        Ok(Box::new(ReplayHandle {
            media: Arc::from(media),
            chunk_bytes: self.chunk_bytes,
            stop_signal: None,
            task: None,
            stopped: false,
        }))
    }

    fn name(&self) -> &str {
        "file replay"
    }
}

struct ReplayHandle {
    media: Arc<[u8]>,
    chunk_bytes: usize,
    stop_signal: Option<Arc<Notify>>,
    task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl CaptureHandle for ReplayHandle {
    fn video_tracks(&self) -> usize {
        if self.stopped {
            0
        } else {
            1
        }
    }

    fn frame_source(&self) -> Option<Arc<dyn FrameSource>> {
        // Encoded media is not decoded into frames
        None
    }

    fn open_recorder(&mut self, timeslice: Duration) -> Result<RecorderSession, SessionError> {
        if self.stopped {
            return Err(SessionError::DeviceUnavailable(
                "replay stream already stopped".to_string(),
            ));
        }
        if self.task.is_some() {
            return Err(SessionError::RecorderFailure(
                "recorder already running on this stream".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let stop = Arc::new(Notify::new());
        let media = Arc::clone(&self.media);
        let chunk_bytes = self.chunk_bytes;
        let stop_rx = Arc::clone(&stop);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + timeslice, timeslice);
            let mut offset = 0usize;

            loop {
                tokio::select! {
                    _ = stop_rx.notified() => break,
                    _ = ticker.tick() => {
                        let end = (offset + chunk_bytes).min(media.len());
                        let chunk = media[offset..end].to_vec();
                        offset = end;

                        if tx.send(RecorderEvent::Data(chunk)).await.is_err() {
                            break;
                        }
                    }
                }
            }

            debug!("Replay recorder finished at byte {}", offset);
        });

        self.stop_signal = Some(Arc::clone(&stop));
        self.task = Some(task);

        Ok(RecorderSession {
            events: rx,
            control: Box::new(ReplayControl(stop)),
        })
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop_signal.take() {
            stop.notify_one();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.stopped = true;
    }
}

impl Drop for ReplayHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct ReplayControl(Arc<Notify>);

impl RecorderControl for ReplayControl {
    fn request_stop(&self) {
        self.0.notify_one();
    }
}
