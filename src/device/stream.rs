use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::backend::{
    CaptureBackend, CaptureHandle, CaptureProfile, FrameSource, MediaConstraints, RecorderSession,
};
use crate::error::SessionError;

/// Receiver side of the current stream's frame source
///
/// Holds `None` whenever no stream is live, so samplers never keep a released
/// stream alive across a stage boundary.
pub type FrameFeed = watch::Receiver<Option<Arc<dyn FrameSource>>>;

/// Exclusive owner of at most one live camera+microphone grab
pub struct DeviceStream {
    backend: Arc<dyn CaptureBackend>,
    handle: Option<Box<dyn CaptureHandle>>,
    profile: Option<CaptureProfile>,
    frames: watch::Sender<Option<Arc<dyn FrameSource>>>,
}

impl DeviceStream {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        let (frames, _) = watch::channel(None);

        Self {
            backend,
            handle: None,
            profile: None,
            frames,
        }
    }

    /// Acquire a fresh stream, releasing the previous one first
    pub async fn acquire(
        &mut self,
        profile: CaptureProfile,
        constraints: &MediaConstraints,
    ) -> Result<(), SessionError> {
        self.release();

        info!(
            "Acquiring {:?} stream from {} ({}x{})",
            profile,
            self.backend.name(),
            constraints.width,
            constraints.height
        );

        let mut handle = self.backend.acquire(constraints).await.map_err(|e| {
            warn!("Device acquisition failed: {}", e);
            e
        })?;

        if handle.video_tracks() == 0 {
            handle.stop();
            warn!("Device delivered no video track");
            return Err(SessionError::DeviceUnavailable(
                "no video track available".to_string(),
            ));
        }

        self.frames.send_replace(handle.frame_source());
        self.handle = Some(handle);
        self.profile = Some(profile);

        Ok(())
    }

    /// Stop all tracks and clear the handle; a no-op when nothing is live
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            self.frames.send_replace(None);
            handle.stop();
            info!("Released {:?} stream", self.profile);
        }
        self.profile = None;
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    pub fn profile(&self) -> Option<CaptureProfile> {
        self.profile
    }

    /// Attach a chunked recorder to the live stream
    pub fn open_recorder(&mut self, timeslice: Duration) -> Result<RecorderSession, SessionError> {
        match self.handle.as_mut() {
            Some(handle) => handle.open_recorder(timeslice),
            None => Err(SessionError::DeviceUnavailable(
                "no live stream to record from".to_string(),
            )),
        }
    }

    pub fn frame_feed(&self) -> FrameFeed {
        self.frames.subscribe()
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        self.release();
    }
}
