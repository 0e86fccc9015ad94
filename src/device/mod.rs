pub mod backend;
pub mod replay;
pub mod stream;

pub use backend::{
    CaptureBackend, CaptureHandle, CaptureProfile, FrameSource, MediaConstraints,
    RecorderControl, RecorderEvent, RecorderSession, VideoFrame,
};
pub use replay::ReplayCaptureBackend;
pub use stream::{DeviceStream, FrameFeed};
