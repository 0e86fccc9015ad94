use serde::Serialize;

use super::machine::{InterviewState, RecordingPhase, Stage, StageKind};
use crate::error::ErrorKind;

/// Terminal error as shown to the candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: String,
}

/// What the presentation layer renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub stage: StageKind,
    pub campaign_title: Option<String>,
    pub campaign_description: Option<String>,
    pub question_index: Option<usize>,
    pub question_count: usize,
    pub question_text: Option<String>,
    pub remaining_seconds: u32,
    /// `mm:ss`
    pub remaining_display: String,
    pub progress_percent: u8,
    pub is_preparing: bool,
    pub is_recording: bool,
    /// Starting the session, finalizing or uploading an answer
    pub is_busy: bool,
    pub presence_warning: bool,
    pub submitted_answers: usize,
    pub error: Option<ErrorView>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self::from(&InterviewState::default())
    }
}

impl From<&InterviewState> for SessionView {
    fn from(state: &InterviewState) -> Self {
        let session = state.session.as_deref();
        let question_count = session.map_or(0, |s| s.question_count());
        let question_index = state.stage.question_index();
        let question_text = question_index
            .and_then(|i| session.and_then(|s| s.question(i)))
            .map(|q| q.text.clone());

        let progress_percent = match (&state.stage, question_count) {
            (Stage::Completed, _) => 100,
            (_, 0) => 0,
            _ => (question_index.unwrap_or(0) * 100 / question_count) as u8,
        };

        let is_busy = matches!(
            state.stage,
            Stage::Instructions { starting: true }
                | Stage::Recording {
                    phase: RecordingPhase::Starting
                        | RecordingPhase::Finalizing
                        | RecordingPhase::Submitting,
                    ..
                }
        );

        let error = match &state.stage {
            Stage::Error(e) => Some(ErrorView {
                kind: e.kind(),
                message: e.user_message().to_string(),
                detail: e.to_string(),
            }),
            _ => None,
        };

        Self {
            stage: state.stage.kind(),
            campaign_title: session.map(|s| s.campaign.title.clone()),
            campaign_description: session.map(|s| s.campaign.description.clone()),
            question_index,
            question_count,
            question_text,
            remaining_seconds: state.remaining,
            remaining_display: format_clock(state.remaining),
            progress_percent,
            is_preparing: matches!(state.stage, Stage::Preparation { .. }),
            is_recording: matches!(
                state.stage,
                Stage::Recording {
                    phase: RecordingPhase::Capturing,
                    ..
                }
            ),
            is_busy,
            presence_warning: state.presence_warning,
            submitted_answers: state.submitted,
            error,
        }
    }
}

/// Format seconds as `mm:ss`
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
