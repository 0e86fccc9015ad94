use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::messages::{ErrorBody, ResolveResponse, StartRequest, StartResponse};
use super::SessionGateway;
use crate::config::GatewayConfig;
use crate::error::{ConflictCode, SessionError};
use crate::recording::RecordingArtifact;
use crate::session::{SessionDescriptor, StartReceipt};

/// REST client for the session access API
pub struct HttpSessionGateway {
    client: Client,
    base_url: String,
    submit_timeout: Duration,
    /// session id -> access token, learned at resolve/start
    tokens: RwLock<HashMap<String, String>>,
}

impl HttpSessionGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        info!("Session gateway at {}", base_url);

        Ok(Self {
            client,
            base_url,
            submit_timeout: Duration::from_secs(config.submit_timeout_secs),
            tokens: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self, access_token: &str) -> String {
        format!("{}session-access/{}/", self.base_url, access_token)
    }

    async fn remember(&self, session_id: &str, access_token: &str) {
        let mut tokens = self.tokens.write().await;
        tokens.insert(session_id.to_string(), access_token.to_string());
    }
}

#[async_trait::async_trait]
impl SessionGateway for HttpSessionGateway {
    async fn resolve(&self, access_token: &str) -> Result<SessionDescriptor, SessionError> {
        let response = self
            .client
            .get(self.endpoint(access_token))
            .send()
            .await
            .map_err(transport_error)?;

        let body: ResolveResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                SessionError::conflict(
                    ConflictCode::DataPreparationError,
                    format!("malformed session payload: {}", e),
                )
            })?;

        let descriptor = body.into_descriptor()?;
        self.remember(&descriptor.id, access_token).await;

        info!(
            "Resolved session {} ({} questions)",
            descriptor.id,
            descriptor.question_count()
        );

        Ok(descriptor)
    }

    async fn start(&self, access_token: &str) -> Result<StartReceipt, SessionError> {
        let response = self
            .client
            .post(self.endpoint(access_token))
            .json(&StartRequest::start_session())
            .send()
            .await
            .map_err(transport_error)?;

        let body: StartResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SessionError::NetworkFailure(format!("malformed start response: {}", e)))?;

        let fallback_id = {
            let tokens = self.tokens.read().await;
            tokens
                .iter()
                .find(|(_, token)| token.as_str() == access_token)
                .map(|(id, _)| id.clone())
        };

        let receipt = body.into_receipt(fallback_id)?;
        self.remember(&receipt.session_id, access_token).await;

        info!("Session {} started at {}", receipt.session_id, receipt.started_at);

        Ok(receipt)
    }

    async fn submit(
        &self,
        session_id: &str,
        artifact: &RecordingArtifact,
    ) -> Result<(), SessionError> {
        let access_token = {
            let tokens = self.tokens.read().await;
            tokens.get(session_id).cloned()
        }
        .ok_or_else(|| {
            SessionError::conflict(
                ConflictCode::SessionNotFound,
                format!("no access token known for session {}", session_id),
            )
        })?;

        let video = Part::bytes(artifact.media.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.mime_type)
            .map_err(|e| SessionError::RecorderFailure(format!("invalid media type: {}", e)))?;

        let form = Form::new()
            .text("question", artifact.question_id.to_string())
            .part("video_file", video)
            .text("duration", artifact.recording_secs().to_string())
            .text("preparation_time_used", artifact.preparation_secs().to_string())
            .text("response_time_used", artifact.recording_secs().to_string());

        info!(
            "Submitting answer for question {} ({} bytes)",
            artifact.question_id,
            artifact.size_bytes()
        );

        let response = self
            .client
            .post(self.endpoint(&access_token))
            .multipart(form)
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;

        info!("Answer for question {} accepted", artifact.question_id);

        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> SessionError {
    warn!("Gateway request failed: {}", e);
    SessionError::NetworkFailure(e.to_string())
}

async fn check_status(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    let err = map_status(status, body);
    warn!("Gateway returned {}: {}", status, err);
    Err(err)
}

/// Map a non-success status and its error body onto the session taxonomy
pub fn map_status(status: StatusCode, body: ErrorBody) -> SessionError {
    let detail = body
        .error
        .clone()
        .unwrap_or_else(|| status.to_string());

    if status.is_server_error() {
        return SessionError::NetworkFailure(format!("server error {}: {}", status, detail));
    }

    if let Some(code) = body.code.as_deref() {
        return SessionError::conflict(ConflictCode::from_code(code), detail);
    }

    match status {
        StatusCode::NOT_FOUND => SessionError::conflict(ConflictCode::SessionNotFound, detail),
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::CONFLICT
        | StatusCode::GONE => SessionError::conflict(ConflictCode::Unknown, detail),
        _ => SessionError::NetworkFailure(format!("unexpected status {}: {}", status, detail)),
    }
}
