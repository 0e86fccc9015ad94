use crate::orchestrator::InterviewHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Control handle of the interview this server fronts
    pub interview: InterviewHandle,
}

impl AppState {
    pub fn new(interview: InterviewHandle) -> Self {
        Self { interview }
    }
}
