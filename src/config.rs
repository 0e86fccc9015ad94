use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::device::MediaConstraints;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    pub capture: CaptureConfig,
    pub presence: PresenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-runner".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Session access gateway settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the API, e.g. "https://example.com/api/"
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Uploads carry a whole answer video, so they get a longer budget
    pub submit_timeout_secs: u64,
    /// Total attempts for the non-mutating resolve call
    pub resolve_attempts: u32,
    pub resolve_backoff_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            request_timeout_secs: 10,
            submit_timeout_secs: 300,
            resolve_attempts: 3,
            resolve_backoff_ms: 500,
        }
    }
}

impl GatewayConfig {
    pub fn resolve_backoff(&self) -> Duration {
        Duration::from_millis(self.resolve_backoff_ms)
    }
}

/// Capture and recorder settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Recorder emits one chunk per timeslice
    pub timeslice_ms: u64,
    /// Upper bound on waiting for the recorder to flush after stop
    pub finalize_timeout_ms: u64,
    pub mime_type: String,
    pub preview: MediaConstraints,
    pub recording: MediaConstraints,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: 100,
            finalize_timeout_ms: 5_000,
            mime_type: "video/webm".to_string(),
            preview: MediaConstraints::preview(),
            recording: MediaConstraints::recording(),
        }
    }
}

impl CaptureConfig {
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }
}

/// Multiple-faces heuristic settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub sample_interval_ms: u64,
    /// Consecutive multi-face samples needed to raise the warning
    pub raise_after: u32,
    /// Consecutive single/no-face samples needed to clear it
    pub clear_after: u32,
    /// Detections smaller than this fraction of the frame area are ignored
    pub min_face_area_ratio: f32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 300,
            raise_after: 3,
            clear_after: 5,
            min_face_area_ratio: 0.01,
        }
    }
}

impl PresenceConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.raise_after == 0 {
            bail!("presence.raise_after must be at least 1");
        }
        if self.clear_after <= self.raise_after {
            bail!(
                "presence.clear_after ({}) must be greater than presence.raise_after ({})",
                self.clear_after,
                self.raise_after
            );
        }
        if self.sample_interval_ms == 0 {
            bail!("presence.sample_interval_ms must be positive");
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.presence.validate()?;

        Ok(cfg)
    }
}
