// Interview state machine
//
// Pure transition function: (state, event) -> (next state, effects). All side
// effects (devices, timers, network) are described as `Effect`s and carried
// out by the runner, which feeds their outcomes back in as events. Every
// batch holds at most one effect that completes asynchronously, and it is
// always last.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::device::CaptureProfile;
use crate::error::SessionError;
use crate::recording::RecordingArtifact;
use crate::session::{SessionDescriptor, StartReceipt};

/// Stage names exposed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Loading,
    Instructions,
    Preparation,
    Recording,
    Completed,
    Error,
    /// The candidate left before finishing
    Closed,
}

/// Progress within a recording stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    /// Re-acquiring the device and attaching the recorder
    Starting,
    Capturing,
    /// Stop requested, waiting for the recorder to flush
    Finalizing,
    /// Artifact handed to the gateway
    Submitting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Loading { device_ready: bool },
    Instructions { starting: bool },
    Preparation { index: usize, ready: bool },
    Recording { index: usize, phase: RecordingPhase },
    Completed,
    Error(SessionError),
    Closed,
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Loading { .. } => StageKind::Loading,
            Self::Instructions { .. } => StageKind::Instructions,
            Self::Preparation { .. } => StageKind::Preparation,
            Self::Recording { .. } => StageKind::Recording,
            Self::Completed => StageKind::Completed,
            Self::Error(_) => StageKind::Error,
            Self::Closed => StageKind::Closed,
        }
    }

    pub fn question_index(&self) -> Option<usize> {
        match self {
            Self::Preparation { index, .. } | Self::Recording { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error(_) | Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    Preparation,
    Response,
}

/// Side effect requested by a transition
#[derive(Debug)]
pub enum Effect {
    /// Release any live stream, then acquire one -> `DeviceReady` or `Failed`
    AcquireDevice(CaptureProfile),
    ReleaseDevice,
    /// -> `Resolved` or `Failed`
    ResolveSession,
    /// -> `Started` or `Failed`
    StartSession,
    /// Cancel any running countdown, then start a new one
    StartTimer { seconds: u32, purpose: TimerPurpose },
    CancelTimer,
    /// Re-acquire with recording constraints and start capture -> `CaptureStarted` or `Failed`
    BeginCapture { index: usize },
    /// Stop capture -> `ArtifactReady` or `Failed`
    FinishCapture,
    /// -> `Submitted` or `Failed`
    Submit(RecordingArtifact),
    AbortCapture,
    StartPresence,
    StopPresence,
}

#[derive(Debug)]
pub enum Event {
    Begin,
    DeviceReady(CaptureProfile),
    Resolved(SessionDescriptor),
    StartRequested,
    Started(StartReceipt),
    Tick(u32),
    TimerElapsed,
    CaptureStarted,
    StopRequested,
    ArtifactReady(RecordingArtifact),
    Submitted,
    RecorderFailed { index: usize, error: SessionError },
    Failed(SessionError),
    PresenceChanged(bool),
    RetryRequested,
    Leave,
}

/// Everything the interview flow knows, in one place
#[derive(Debug, Clone)]
pub struct InterviewState {
    pub stage: Stage,
    pub session: Option<Arc<SessionDescriptor>>,
    pub remaining: u32,
    pub presence_warning: bool,
    pub submitted: usize,
}

impl Default for InterviewState {
    fn default() -> Self {
        Self {
            stage: Stage::Loading {
                device_ready: false,
            },
            session: None,
            remaining: 0,
            presence_warning: false,
            submitted: 0,
        }
    }
}

impl InterviewState {
    fn question_times(&self, index: usize) -> Option<(u32, u32)> {
        self.session
            .as_ref()
            .and_then(|s| s.question(index))
            .map(|q| (q.preparation_time, q.response_time_limit))
    }

    fn question_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.question_count())
    }
}

fn teardown() -> Vec<Effect> {
    vec![
        Effect::CancelTimer,
        Effect::StopPresence,
        Effect::AbortCapture,
        Effect::ReleaseDevice,
    ]
}

fn fail(mut state: InterviewState, error: SessionError) -> (InterviewState, Vec<Effect>) {
    state.stage = Stage::Error(error);
    state.presence_warning = false;
    (state, teardown())
}

fn enter_preparation(
    mut state: InterviewState,
    index: usize,
    ready: bool,
) -> (InterviewState, Vec<Effect>) {
    let Some((preparation, _)) = state.question_times(index) else {
        return fail(
            state,
            SessionError::RecorderFailure(format!("no question at index {}", index)),
        );
    };

    state.stage = Stage::Preparation { index, ready };
    state.remaining = preparation;

    let effects = if ready {
        vec![
            Effect::StartPresence,
            Effect::StartTimer {
                seconds: preparation,
                purpose: TimerPurpose::Preparation,
            },
        ]
    } else {
        vec![Effect::AcquireDevice(CaptureProfile::Preview)]
    };

    (state, effects)
}

/// Apply one event
pub fn transition(mut state: InterviewState, event: Event) -> (InterviewState, Vec<Effect>) {
    use RecordingPhase::*;

    match (state.stage.clone(), event) {
        (stage, Event::Leave) => {
            // Completed and Error keep their outcome; anything live is closed
            if !stage.is_terminal() {
                state.stage = Stage::Closed;
            }
            state.remaining = 0;
            state.presence_warning = false;
            (state, teardown())
        }

        (Stage::Error(_), Event::RetryRequested) => {
            let state = InterviewState::default();
            (state, vec![Effect::AcquireDevice(CaptureProfile::Preview)])
        }

        (stage, event) if stage.is_terminal() => {
            debug!("Ignoring {:?} in terminal stage {:?}", event, stage.kind());
            (state, Vec::new())
        }

        (_, Event::Failed(error)) => fail(state, error),

        (Stage::Loading { .. }, Event::Begin) => {
            state.stage = Stage::Loading {
                device_ready: false,
            };
            (state, vec![Effect::AcquireDevice(CaptureProfile::Preview)])
        }

        (
            Stage::Loading {
                device_ready: false,
            },
            Event::DeviceReady(CaptureProfile::Preview),
        ) => {
            state.stage = Stage::Loading { device_ready: true };
            (state, vec![Effect::ResolveSession])
        }

        (Stage::Loading { device_ready: true }, Event::Resolved(descriptor)) => {
            let checked = descriptor
                .validated()
                .and_then(|d| d.ensure_startable().map(|_| d));

            match checked {
                Ok(descriptor) => {
                    state.session = Some(Arc::new(descriptor));
                    state.stage = Stage::Instructions { starting: false };
                    (state, Vec::new())
                }
                Err(error) => fail(state, error),
            }
        }

        (Stage::Instructions { starting: false }, Event::StartRequested) => {
            state.stage = Stage::Instructions { starting: true };
            (state, vec![Effect::StartSession])
        }

        (Stage::Instructions { starting: true }, Event::Started(receipt)) => {
            if let Some(session) = state.session.as_mut() {
                let session = Arc::make_mut(session);
                session.id = receipt.session_id;
                session.status = receipt.status;
                session.is_used = true;
            }
            enter_preparation(state, 0, true)
        }

        (Stage::Preparation { index, ready: false }, Event::DeviceReady(CaptureProfile::Preview)) => {
            enter_preparation(state, index, true)
        }

        (Stage::Preparation { .. } | Stage::Recording { .. }, Event::Tick(remaining)) => {
            state.remaining = remaining;
            (state, Vec::new())
        }

        (Stage::Preparation { index, ready: true }, Event::TimerElapsed) => {
            let Some((_, limit)) = state.question_times(index) else {
                return fail(
                    state,
                    SessionError::RecorderFailure(format!("no question at index {}", index)),
                );
            };

            state.stage = Stage::Recording {
                index,
                phase: Starting,
            };
            state.remaining = limit;
            (
                state,
                vec![Effect::CancelTimer, Effect::BeginCapture { index }],
            )
        }

        (
            Stage::Recording {
                index,
                phase: Starting,
            },
            Event::CaptureStarted,
        ) => {
            state.stage = Stage::Recording {
                index,
                phase: Capturing,
            };
            let seconds = state.remaining;
            (
                state,
                vec![Effect::StartTimer {
                    seconds,
                    purpose: TimerPurpose::Response,
                }],
            )
        }

        (
            Stage::Recording {
                index,
                phase: Capturing,
            },
            Event::StopRequested | Event::TimerElapsed,
        ) => {
            state.stage = Stage::Recording {
                index,
                phase: Finalizing,
            };
            (state, vec![Effect::CancelTimer, Effect::FinishCapture])
        }

        (
            Stage::Recording {
                index,
                phase: Finalizing,
            },
            Event::ArtifactReady(artifact),
        ) => {
            state.stage = Stage::Recording {
                index,
                phase: Submitting,
            };
            (state, vec![Effect::ReleaseDevice, Effect::Submit(artifact)])
        }

        (
            Stage::Recording {
                index,
                phase: Submitting,
            },
            Event::Submitted,
        ) => {
            state.submitted += 1;
            let next = index + 1;

            if next < state.question_count() {
                enter_preparation(state, next, false)
            } else {
                state.stage = Stage::Completed;
                state.remaining = 0;
                state.presence_warning = false;
                (
                    state,
                    vec![
                        Effect::CancelTimer,
                        Effect::StopPresence,
                        Effect::ReleaseDevice,
                    ],
                )
            }
        }

        (Stage::Recording { index, phase }, Event::RecorderFailed { index: failed, error })
            if failed == index && phase != Submitting =>
        {
            fail(state, error)
        }

        (Stage::Preparation { .. } | Stage::Recording { .. }, Event::PresenceChanged(warning)) => {
            state.presence_warning = warning;
            (state, Vec::new())
        }

        (stage, event) => {
            debug!("Ignoring {:?} in {:?}", event, stage);
            (state, Vec::new())
        }
    }
}
