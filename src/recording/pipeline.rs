use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::artifact::RecordingArtifact;
use crate::config::CaptureConfig;
use crate::device::{CaptureProfile, DeviceStream, RecorderControl, RecorderEvent, RecorderSession};
use crate::error::SessionError;

type Collector = JoinHandle<Result<Vec<Vec<u8>>, SessionError>>;

/// Chunked capture for a single question
///
/// Receives chunks from the recorder attached to the device stream and keeps
/// them in memory until `stop` assembles the artifact.
pub struct RecordingPipeline {
    question_id: u64,
    preparation_ms_used: u64,
    mime_type: String,
    finalize_timeout: Duration,
    started_at: Instant,
    control: Box<dyn RecorderControl>,
    collector: Mutex<Option<Collector>>,
    finalizing: AtomicBool,
}

impl RecordingPipeline {
    /// Re-acquire the stream with recording constraints and begin capture
    ///
    /// `on_failure` is called from the collector task if the recorder reports
    /// an asynchronous error before `stop`.
    pub async fn start<F>(
        stream: &mut DeviceStream,
        question_id: u64,
        preparation_ms_used: u64,
        config: &CaptureConfig,
        on_failure: F,
    ) -> Result<Self, SessionError>
    where
        F: Fn(SessionError) + Send + 'static,
    {
        stream
            .acquire(CaptureProfile::Recording, &config.recording)
            .await?;

        let RecorderSession {
            mut events,
            control,
        } = stream.open_recorder(config.timeslice())?;

        info!(
            "Recording question {} ({}ms timeslice)",
            question_id, config.timeslice_ms
        );

        let collector = tokio::spawn(async move {
            let mut chunks = Vec::new();

            while let Some(event) = events.recv().await {
                match event {
                    RecorderEvent::Data(chunk) if chunk.is_empty() => {}
                    RecorderEvent::Data(chunk) => chunks.push(chunk),
                    RecorderEvent::Error(message) => {
                        error!("Recorder error on question {}: {}", question_id, message);
                        let err = SessionError::RecorderFailure(message);
                        on_failure(err.clone());
                        return Err(err);
                    }
                }
            }

            debug!("Recorder channel closed after {} chunks", chunks.len());
            Ok(chunks)
        });

        Ok(Self {
            question_id,
            preparation_ms_used,
            mime_type: config.mime_type.clone(),
            finalize_timeout: config.finalize_timeout(),
            started_at: Instant::now(),
            control,
            collector: Mutex::new(Some(collector)),
            finalizing: AtomicBool::new(false),
        })
    }

    /// Stop capture and assemble the artifact
    ///
    /// Only the first call finalizes; any later or concurrent call returns
    /// `Ok(None)`.
    pub async fn stop(&self) -> Result<Option<RecordingArtifact>, SessionError> {
        if self.finalizing.swap(true, Ordering::SeqCst) {
            debug!("Stop already in flight for question {}", self.question_id);
            return Ok(None);
        }

        let recording_ms_used = self.started_at.elapsed().as_millis() as u64;
        self.control.request_stop();

        let Some(mut collector) = self.collector.lock().await.take() else {
            return Ok(None);
        };

        let chunks = match timeout(self.finalize_timeout, &mut collector).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(SessionError::RecorderFailure(format!(
                    "chunk collector failed: {}",
                    e
                )))
            }
            Err(_) => {
                collector.abort();
                warn!("Recorder did not finalize within {:?}", self.finalize_timeout);
                return Err(SessionError::RecorderFailure(
                    "recorder did not finalize in time".to_string(),
                ));
            }
        };

        if chunks.is_empty() {
            warn!("No data captured for question {}", self.question_id);
            return Err(SessionError::RecorderFailure(
                "no data was captured".to_string(),
            ));
        }

        let chunk_count = chunks.len();
        let media = chunks.concat();
        let extension = self
            .mime_type
            .split('/')
            .nth(1)
            .and_then(|subtype| subtype.split(';').next())
            .unwrap_or("bin");

        info!(
            "Question {} captured: {} chunks, {} bytes, {}ms",
            self.question_id,
            chunk_count,
            media.len(),
            recording_ms_used
        );

        Ok(Some(RecordingArtifact {
            question_id: self.question_id,
            media,
            mime_type: self.mime_type.clone(),
            file_name: format!("response_{}.{}", Uuid::new_v4(), extension),
            chunk_count,
            preparation_ms_used: self.preparation_ms_used,
            recording_ms_used,
            recorded_at: Utc::now(),
        }))
    }

    /// Drop capture without producing an artifact
    pub fn abort(&self) {
        self.finalizing.store(true, Ordering::SeqCst);
        self.control.request_stop();

        if let Ok(mut guard) = self.collector.try_lock() {
            if let Some(collector) = guard.take() {
                collector.abort();
                info!("Recording aborted for question {}", self.question_id);
            }
        }
    }

    pub fn question_id(&self) -> u64 {
        self.question_id
    }

    pub fn is_finalizing(&self) -> bool {
        self.finalizing.load(Ordering::SeqCst)
    }
}

impl Drop for RecordingPipeline {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.get_mut().take() {
            collector.abort();
        }
    }
}
