//! Answer recording pipeline
//!
//! Turns a live capture stream into one deliverable artifact per question:
//! chunked capture, in-memory accumulation, and assembly on stop.

mod artifact;
mod pipeline;

pub use artifact::RecordingArtifact;
pub use pipeline::RecordingPipeline;
