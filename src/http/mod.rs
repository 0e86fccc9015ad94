//! HTTP control surface for the presentation layer
//!
//! This module exposes one running interview over a small REST API:
//! - GET /interview/status - Current stage, question, countdown and warnings
//! - POST /interview/start - Begin the interview from the instructions stage
//! - POST /interview/stop - Stop the current recording early
//! - POST /interview/retry - Restart from loading after an error
//! - POST /interview/leave - Leave the flow and release every device
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
