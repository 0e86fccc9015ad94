use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::detector::{count_faces, FrameDetector};
use super::hysteresis::PresenceHysteresis;
use crate::config::PresenceConfig;
use crate::device::FrameFeed;

/// One presence observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSample {
    pub face_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Background sampling loop feeding the hysteresis
///
/// Frames are read through the device stream's feed, so the loop simply skips
/// samples while no stream is live. Dropping the monitor stops sampling.
pub struct PresenceMonitor {
    task: JoinHandle<()>,
}

impl PresenceMonitor {
    pub fn spawn<F>(
        feed: FrameFeed,
        detector: Arc<dyn FrameDetector>,
        config: &PresenceConfig,
        on_change: F,
    ) -> Self
    where
        F: Fn(bool) + Send + 'static,
    {
        let sample_interval = config.sample_interval();
        let min_area_ratio = config.min_face_area_ratio;
        let mut hysteresis = PresenceHysteresis::new(config.raise_after, config.clear_after);

        info!(
            "Presence monitor started ({}, every {:?})",
            detector.name(),
            sample_interval
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval(sample_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let source = feed.borrow().clone();
                let Some(frame) = source.and_then(|source| source.grab_frame()) else {
                    continue;
                };

                let faces = match detector.detect(&frame) {
                    Ok(faces) => faces,
                    Err(e) => {
                        debug!("Face detection failed: {}", e);
                        continue;
                    }
                };

                let sample = PresenceSample {
                    face_count: count_faces(&faces, &frame, min_area_ratio),
                    timestamp: frame.captured_at,
                };

                if let Some(warning) = hysteresis.observe(sample.face_count) {
                    if warning {
                        warn!("Multiple faces in frame ({} detected)", sample.face_count);
                    } else {
                        info!("Multiple-faces warning cleared");
                    }
                    on_change(warning);
                }
            }
        });

        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
        info!("Presence monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PresenceMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
