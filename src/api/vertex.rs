use crate::auth::CredentialProvider;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::MovieDir;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// What one status fetch of a long-running operation reported.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// No result yet, no error. Absence of data is not an error signal.
    Pending,
    /// Generation finished; decoded video bytes.
    Done(Vec<u8>),
    /// The service explicitly reported a failed generation.
    Failed(String),
}

/// How a finished poll loop ended, when it ended without an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(Vec<u8>),
    /// Retry budget exhausted with only pending responses. Distinct from
    /// failure so callers can tell "still pending" from "broken."
    NotReady,
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until the operation settles.
    pub max_retries: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_retries: None,
        }
    }
}

/// Seam between the pipeline and the video-generation service: submit a
/// prompt for an operation handle, then fetch that operation's status.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn submit(&self, prompt: &str) -> PipelineResult<String>;
    async fn fetch(&self, operation: &str) -> PipelineResult<PollStatus>;
}

/// Vertex AI implementation over the `predictLongRunning` /
/// `fetchPredictOperation` endpoint pair.
pub struct VertexBackend {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
}

impl VertexBackend {
    pub fn new(
        client: reqwest::Client,
        cfg: &Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let base_url = format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{proj}/locations/{loc}/publishers/google/models/{model}",
            loc = cfg.location_id,
            proj = cfg.project_id,
            model = cfg.model_id,
        );
        Self {
            client,
            credentials,
            base_url,
        }
    }
}

#[async_trait]
impl VideoBackend for VertexBackend {
    async fn submit(&self, prompt: &str) -> PipelineResult<String> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "aspectRatio": "16:9",
                "sampleCount": 1,
                "durationSeconds": "8",
                "personGeneration": "allow_all",
                "addWatermark": true,
                "includeRaiReason": true,
                "generateAudio": true,
                "resolution": "720p",
            },
        });

        let token = self.credentials.bearer_token().await?;
        let resp = self
            .client
            .post(format!("{}:predictLongRunning", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet = raw.chars().take(800).collect::<String>();
            return Err(PipelineError::submission(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let root: serde_json::Value = serde_json::from_str(&raw)?;
        root.get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::validation("submission response carried no operation name")
            })
    }

    async fn fetch(&self, operation: &str) -> PipelineResult<PollStatus> {
        let token = self.credentials.bearer_token().await?;
        let resp = self
            .client
            .post(format!("{}:fetchPredictOperation", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "operationName": operation }))
            .send()
            .await?
            .error_for_status()?;

        let root: serde_json::Value = resp.json().await?;
        parse_poll_status(&root)
    }
}

/// Maps the operation-status envelope onto [`PollStatus`]. A response
/// with neither a video payload nor an error message means the job is
/// still running.
pub fn parse_poll_status(root: &serde_json::Value) -> PipelineResult<PollStatus> {
    let encoded = root
        .pointer("/response/videos/0/bytesBase64Encoded")
        .and_then(|v| v.as_str());
    if let Some(encoded) = encoded {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| PipelineError::validation(format!("bad base64 video payload: {}", e)))?;
        return Ok(PollStatus::Done(bytes));
    }

    if let Some(msg) = root.pointer("/error/message").and_then(|v| v.as_str()) {
        return Ok(PollStatus::Failed(msg.to_string()));
    }

    Ok(PollStatus::Pending)
}

/// Polls `operation` at a fixed interval until it yields a video, the
/// service reports a failure, or the retry budget runs out.
pub async fn poll_operation(
    backend: &dyn VideoBackend,
    operation: &str,
    poll: PollConfig,
) -> PipelineResult<PollOutcome> {
    let mut attempts: u32 = 0;
    loop {
        if let Some(max) = poll.max_retries {
            if attempts >= max {
                warn!(operation, max, "retry budget exhausted; operation still pending");
                return Ok(PollOutcome::NotReady);
            }
        }
        attempts += 1;

        match backend.fetch(operation).await? {
            PollStatus::Done(bytes) => return Ok(PollOutcome::Completed(bytes)),
            PollStatus::Failed(msg) => return Err(PipelineError::RemoteOperation(msg)),
            PollStatus::Pending => {}
        }

        tokio::time::sleep(poll.interval).await;
    }
}

/// Outcome of one scene's generation job.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneResult {
    pub operation: String,
    /// `None` when the poll budget ran out before a video appeared.
    pub artifact: Option<PathBuf>,
}

/// Submits one scene and drives it to completion: submit, poll, persist.
/// A submission rejection is terminal for the scene; it is never retried
/// and never polled.
pub async fn generate_scene_video(
    backend: &dyn VideoBackend,
    dir: &MovieDir,
    prompt: &str,
    index: usize,
    poll: PollConfig,
) -> PipelineResult<SceneResult> {
    let operation = backend.submit(prompt).await?;
    info!(scene = index, operation = %operation, "video generation submitted");

    match poll_operation(backend, &operation, poll).await? {
        PollOutcome::Completed(bytes) => {
            let path = dir.write_scene_video(index, &bytes).await?;
            info!(scene = index, path = %path.display(), "scene video written");
            Ok(SceneResult {
                operation,
                artifact: Some(path),
            })
        }
        PollOutcome::NotReady => Ok(SceneResult {
            operation,
            artifact: None,
        }),
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted backend: serves the given statuses in order, then keeps
    /// repeating the last one.
    pub struct StubBackend {
        pub statuses: Vec<PollStatus>,
        pub fetches: AtomicU32,
        pub submit_error: Option<String>,
    }

    impl StubBackend {
        pub fn pending_forever() -> Self {
            Self::with_statuses(vec![PollStatus::Pending])
        }

        pub fn with_statuses(statuses: Vec<PollStatus>) -> Self {
            Self {
                statuses,
                fetches: AtomicU32::new(0),
                submit_error: None,
            }
        }

        pub fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VideoBackend for StubBackend {
        async fn submit(&self, _prompt: &str) -> PipelineResult<String> {
            match &self.submit_error {
                Some(msg) => Err(PipelineError::submission(msg.clone())),
                None => Ok("operations/test-op".to_string()),
            }
        }

        async fn fetch(&self, _operation: &str) -> PipelineResult<PollStatus> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) as usize;
            let status = self
                .statuses
                .get(n)
                .or_else(|| self.statuses.last())
                .cloned()
                .unwrap_or(PollStatus::Pending);
            Ok(status)
        }
    }
}
