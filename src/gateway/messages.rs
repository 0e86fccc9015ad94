use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConflictCode, SessionError};
use crate::session::{Campaign, Question, SessionDescriptor, SessionStatus, StartReceipt};

/// Body of `GET session-access/{token}/`
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub is_used: bool,
    pub campaign: Campaign,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResolveResponse {
    pub fn into_descriptor(self) -> Result<SessionDescriptor, SessionError> {
        if self.success == Some(false) {
            return Err(SessionError::conflict(
                ConflictCode::Unknown,
                self.error
                    .unwrap_or_else(|| "session could not be loaded".to_string()),
            ));
        }

        let id = self.session_id.or(self.id).ok_or_else(|| {
            SessionError::conflict(
                ConflictCode::DataPreparationError,
                "session payload has no id",
            )
        })?;

        SessionDescriptor {
            id,
            status: self.status,
            campaign: self.campaign,
            questions: self.questions,
            is_used: self.is_used,
        }
        .validated()
    }
}

/// Body of the start call
#[derive(Debug, Serialize, Deserialize)]
pub struct StartRequest {
    pub action: String,
}

impl StartRequest {
    pub fn start_session() -> Self {
        Self {
            action: "start_session".to_string(),
        }
    }
}

/// Response to the start call
#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StartResponse {
    /// `fallback_id` is the id learned at resolve time
    pub fn into_receipt(self, fallback_id: Option<String>) -> Result<StartReceipt, SessionError> {
        if !self.success {
            return Err(SessionError::conflict(
                ConflictCode::SessionAlreadyStarted,
                self.error
                    .unwrap_or_else(|| "session could not be started".to_string()),
            ));
        }

        let session_id = self.session_id.or(fallback_id).ok_or_else(|| {
            SessionError::conflict(
                ConflictCode::DataPreparationError,
                "start response has no session id",
            )
        })?;

        Ok(StartReceipt {
            session_id,
            status: self.status.unwrap_or(SessionStatus::InProgress),
            started_at: self.started_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Error body returned with 4xx responses
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
