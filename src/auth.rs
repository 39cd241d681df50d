use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens printed by gcloud are good for an hour; refresh well before
/// that so an in-flight poll never carries an expired token.
const TOKEN_VALIDITY: Duration = Duration::from_secs(45 * 60);

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> PipelineResult<String>;
}

/// Fetches short-lived access tokens from the gcloud CLI and caches them
/// with an expiry window, so concurrent scene jobs share one token
/// instead of each shelling out per request.
pub struct GcloudCredentials {
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

impl GcloudCredentials {
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    async fn fetch_fresh() -> PipelineResult<String> {
        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| PipelineError::Credential(format!("failed to run gcloud: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PipelineError::Credential(format!(
                "gcloud auth print-access-token failed: {}",
                stderr
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(PipelineError::Credential(
                "gcloud returned an empty access token".into(),
            ));
        }
        Ok(token)
    }
}

impl Default for GcloudCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for GcloudCredentials {
    async fn bearer_token(&self) -> PipelineResult<String> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < TOKEN_VALIDITY {
                return Ok(cached.token.clone());
            }
            debug!("cached gcloud token expired; refreshing");
        }

        let token = Self::fetch_fresh().await?;
        *guard = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Fixed-token provider for tests.
    pub struct StaticCredentials(pub String);

    #[async_trait]
    impl CredentialProvider for StaticCredentials {
        async fn bearer_token(&self) -> PipelineResult<String> {
            Ok(self.0.clone())
        }
    }
}
