pub mod config;
pub mod device;
pub mod error;
pub mod gateway;
pub mod http;
pub mod orchestrator;
pub mod presence;
pub mod recording;
pub mod session;
pub mod timer;

pub use config::Config;
pub use device::{
    CaptureBackend, CaptureHandle, CaptureProfile, DeviceStream, FrameSource, MediaConstraints,
    RecorderEvent, RecorderSession, ReplayCaptureBackend, VideoFrame,
};
pub use error::{ConflictCode, ErrorKind, SessionError};
pub use gateway::{HttpSessionGateway, SessionGateway};
pub use http::{create_router, AppState};
pub use orchestrator::{
    Command, InterviewHandle, InterviewRunner, InterviewState, SessionView, Stage, StageKind,
};
pub use presence::{DisabledDetector, FaceBox, FrameDetector, PresenceHysteresis, PresenceMonitor};
pub use recording::{RecordingArtifact, RecordingPipeline};
pub use session::{Campaign, Question, SessionDescriptor, SessionStatus, StartReceipt};
pub use timer::{CountdownTimer, TimerState};
