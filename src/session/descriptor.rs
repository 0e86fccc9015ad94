use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ConflictCode, SessionError};

/// Server-side lifecycle of an interview session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Invited,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A single interview question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,

    /// 1-based position within the session
    pub order: u32,

    pub text: String,

    /// Seconds the candidate may read and think before recording starts
    pub preparation_time: u32,

    /// Maximum recording length in seconds
    pub response_time_limit: u32,
}

/// A resolved interview session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub id: String,
    pub status: SessionStatus,
    pub campaign: Campaign,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub is_used: bool,
}

impl SessionDescriptor {
    /// Sort questions by order and reject descriptors the flow cannot run
    pub fn validated(mut self) -> Result<Self, SessionError> {
        if self.questions.is_empty() {
            return Err(SessionError::conflict(
                ConflictCode::DataPreparationError,
                "session has no questions",
            ));
        }

        self.questions.sort_by_key(|q| q.order);

        let mut seen = HashSet::new();
        for question in &self.questions {
            if question.order == 0 || !seen.insert(question.order) {
                return Err(SessionError::conflict(
                    ConflictCode::DataPreparationError,
                    format!("invalid or duplicate question order {}", question.order),
                ));
            }
            if question.preparation_time == 0 || question.response_time_limit == 0 {
                return Err(SessionError::conflict(
                    ConflictCode::DataPreparationError,
                    format!("question {} has a zero time limit", question.id),
                ));
            }
        }

        Ok(self)
    }

    /// Whether this session may still be started from this client
    pub fn ensure_startable(&self) -> Result<(), SessionError> {
        if self.is_used || self.status != SessionStatus::Invited {
            return Err(SessionError::conflict(
                ConflictCode::SessionAlreadyUsed,
                format!("session {} is {:?} (is_used={})", self.id, self.status, self.is_used),
            ));
        }
        Ok(())
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// Confirmation returned by the gateway when the interview starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReceipt {
    pub session_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64, order: u32) -> Question {
        Question {
            id,
            order,
            text: format!("Question {}", id),
            preparation_time: 30,
            response_time_limit: 120,
        }
    }

    fn descriptor(questions: Vec<Question>) -> SessionDescriptor {
        SessionDescriptor {
            id: "session-1".to_string(),
            status: SessionStatus::Invited,
            campaign: Campaign {
                title: "Backend Engineer".to_string(),
                description: String::new(),
            },
            questions,
            is_used: false,
        }
    }

    #[test]
    fn test_questions_are_sorted_by_order() {
        let session = descriptor(vec![question(20, 2), question(10, 1)])
            .validated()
            .unwrap();

        assert_eq!(session.questions[0].id, 10);
        assert_eq!(session.questions[1].id, 20);
    }

    #[test]
    fn test_empty_question_list_rejected() {
        let err = descriptor(vec![]).validated().unwrap_err();
        assert!(matches!(
            err,
            SessionError::SessionConflict {
                code: ConflictCode::DataPreparationError,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_order_rejected() {
        assert!(descriptor(vec![question(1, 1), question(2, 1)])
            .validated()
            .is_err());
    }

    #[test]
    fn test_used_session_not_startable() {
        let mut session = descriptor(vec![question(1, 1)]);
        assert!(session.ensure_startable().is_ok());

        session.is_used = true;
        assert!(session.ensure_startable().is_err());

        session.is_used = false;
        session.status = SessionStatus::InProgress;
        assert!(session.ensure_startable().is_err());
    }
}
