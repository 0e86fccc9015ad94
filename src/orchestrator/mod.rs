//! Interview session orchestration
//!
//! `machine` holds the pure state machine, `runner` owns the resources and
//! executes the machine's effects on a single task, and `view` is what the
//! presentation layer sees.

pub mod machine;
pub mod runner;
pub mod view;

pub use machine::{
    transition, Effect, Event, InterviewState, RecordingPhase, Stage, StageKind, TimerPurpose,
};
pub use runner::{Command, InterviewHandle, InterviewRunner};
pub use view::{format_clock, ErrorView, SessionView};
