use chrono::{DateTime, Utc};
use std::fmt;

/// Finished recorded answer for one question, ready for submission
#[derive(Clone, PartialEq, Eq)]
pub struct RecordingArtifact {
    pub question_id: u64,

    /// Assembled media bytes (all chunks in capture order)
    pub media: Vec<u8>,

    pub mime_type: String,

    pub file_name: String,

    /// Number of non-empty chunks that went into `media`
    pub chunk_count: usize,

    /// Time spent in the preparation countdown before capture began
    pub preparation_ms_used: u64,

    /// Time between capture start and the stop request
    pub recording_ms_used: u64,

    pub recorded_at: DateTime<Utc>,
}

impl RecordingArtifact {
    pub fn preparation_secs(&self) -> u64 {
        (self.preparation_ms_used + 500) / 1000
    }

    /// Whole seconds recorded, never below one
    pub fn recording_secs(&self) -> u64 {
        ((self.recording_ms_used + 500) / 1000).max(1)
    }

    pub fn size_bytes(&self) -> usize {
        self.media.len()
    }
}

impl fmt::Debug for RecordingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingArtifact")
            .field("question_id", &self.question_id)
            .field("bytes", &self.media.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .field("chunk_count", &self.chunk_count)
            .field("preparation_ms_used", &self.preparation_ms_used)
            .field("recording_ms_used", &self.recording_ms_used)
            .finish()
    }
}
