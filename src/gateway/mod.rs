//! Session access gateway boundary
//!
//! The interview flow only talks to the server through `SessionGateway`:
//! - resolve: load the session (idempotent, safe to retry)
//! - start: mark the session in progress (single use)
//! - submit: upload one answer (exactly once per question)

pub mod http;
pub mod messages;

use std::time::Duration;
use tracing::warn;

use crate::error::SessionError;
use crate::recording::RecordingArtifact;
use crate::session::{SessionDescriptor, StartReceipt};

pub use http::HttpSessionGateway;
pub use messages::{ErrorBody, ResolveResponse, StartRequest, StartResponse};

#[async_trait::async_trait]
pub trait SessionGateway: Send + Sync {
    /// Load the session behind an access token without changing it
    async fn resolve(&self, access_token: &str) -> Result<SessionDescriptor, SessionError>;

    /// Start the session; a second successful start is impossible
    async fn start(&self, access_token: &str) -> Result<StartReceipt, SessionError>;

    /// Upload one answer
    async fn submit(
        &self,
        session_id: &str,
        artifact: &RecordingArtifact,
    ) -> Result<(), SessionError>;
}

/// Resolve with a bounded number of attempts
///
/// Only network failures are retried; conflicts surface immediately.
pub async fn resolve_with_retry(
    gateway: &dyn SessionGateway,
    access_token: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<SessionDescriptor, SessionError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match gateway.resolve(access_token).await {
            Ok(descriptor) => return Ok(descriptor),
            Err(e) if e.is_retryable_resolve() && attempt < attempts => {
                warn!(
                    "Resolve attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, attempts, e, backoff
                );
                attempt += 1;
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
