//! Session error taxonomy
//!
//! Every failure the interview flow can observe is one of these variants. All
//! of them are fatal for the current session: the orchestrator moves to the
//! error stage and stops automatic progress.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse error category exposed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Camera or microphone access was refused
    PermissionDenied,
    /// No usable video track
    DeviceUnavailable,
    /// Hardware/codec error mid-capture, or nothing was captured
    RecorderFailure,
    /// Resolve/start/submit could not reach the server
    NetworkFailure,
    /// Link expired, already used, already started, or terminated server-side
    SessionConflict,
}

/// Conflict codes reported by the session access gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCode {
    LinkExpired,
    LinkUsed,
    SessionUsed,
    SessionTerminated,
    SessionAlreadyStarted,
    SessionAlreadyUsed,
    SessionNotFound,
    DataPreparationError,
    #[serde(other)]
    Unknown,
}

impl ConflictCode {
    /// Parse a wire code, falling back to `Unknown`
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.to_string()))
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkExpired => "link_expired",
            Self::LinkUsed => "link_used",
            Self::SessionUsed => "session_used",
            Self::SessionTerminated => "session_terminated",
            Self::SessionAlreadyStarted => "session_already_started",
            Self::SessionAlreadyUsed => "session_already_used",
            Self::SessionNotFound => "session_not_found",
            Self::DataPreparationError => "data_preparation_error",
            Self::Unknown => "unknown",
        }
    }

    fn user_message(&self) -> &'static str {
        match self {
            Self::LinkExpired => "This access link has expired.",
            Self::LinkUsed => "This access link has already been used.",
            Self::SessionUsed | Self::SessionAlreadyUsed => {
                "This interview session has already been used."
            }
            Self::SessionTerminated => "This interview session was terminated or cancelled.",
            Self::SessionAlreadyStarted => {
                "This interview has already been started. Please use the same tab and browser."
            }
            Self::SessionNotFound => "This interview session could not be found.",
            Self::DataPreparationError => "The interview questions could not be loaded.",
            Self::Unknown => "The interview session is no longer available.",
        }
    }
}

impl fmt::Display for ConflictCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure that ends the current interview session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("camera or microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("no usable capture device: {0}")]
    DeviceUnavailable(String),

    #[error("recorder failure: {0}")]
    RecorderFailure(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("session conflict ({code}): {detail}")]
    SessionConflict { code: ConflictCode, detail: String },
}

impl SessionError {
    pub fn conflict(code: ConflictCode, detail: impl Into<String>) -> Self {
        Self::SessionConflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            Self::RecorderFailure(_) => ErrorKind::RecorderFailure,
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::SessionConflict { .. } => ErrorKind::SessionConflict,
        }
    }

    /// Message shown to the candidate
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => {
                "Camera and microphone access is required to continue."
            }
            Self::DeviceUnavailable(_) => {
                "No usable camera was found. Please check that a camera is connected."
            }
            Self::RecorderFailure(_) => {
                "Something went wrong while recording your answer."
            }
            Self::NetworkFailure(_) => {
                "The server could not be reached. Please check your internet connection."
            }
            Self::SessionConflict { code, .. } => code.user_message(),
        }
    }

    pub fn is_retryable_resolve(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}
