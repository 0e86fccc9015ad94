//! Presence monitoring
//!
//! Samples video frames on a fixed cadence, counts detected faces, and raises
//! an advisory "multiple people" warning with hysteresis so that transient
//! misdetections do not make the banner flicker.

mod detector;
mod hysteresis;
mod monitor;

pub use detector::{count_faces, DisabledDetector, FaceBox, FrameDetector};
pub use hysteresis::PresenceHysteresis;
pub use monitor::{PresenceMonitor, PresenceSample};
