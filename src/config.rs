use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "open_api_key")]
    pub openai_key: String,
    #[serde(rename = "elevenlabs_api_key")]
    pub elevenlabs_key: String,
    pub project_id: String,
    pub location_id: String,
    pub model_id: String,
    #[serde(default = "default_max_concurrent_scenes")]
    pub max_concurrent_scenes: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// -1 means poll until the operation settles.
    #[serde(default = "default_max_poll_retries")]
    pub max_poll_retries: i64,
}

fn default_max_concurrent_scenes() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_max_poll_retries() -> i64 {
    -1
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let content = fs::read_to_string(&path).await.map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("config.json: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PipelineResult<()> {
        let required = [
            (&self.openai_key, "open_api_key"),
            (&self.elevenlabs_key, "elevenlabs_api_key"),
            (&self.project_id, "project_id"),
            (&self.location_id, "location_id"),
            (&self.model_id, "model_id"),
        ];
        for (value, key) in required {
            if value.is_empty() {
                return Err(PipelineError::Config(format!("config.json: {} missing", key)));
            }
        }
        if self.max_concurrent_scenes == 0 {
            return Err(PipelineError::Config(
                "config.json: max_concurrent_scenes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Poll retry budget as the poller understands it: `None` is unbounded.
    pub fn poll_budget(&self) -> Option<u32> {
        if self.max_poll_retries < 0 {
            None
        } else {
            Some(self.max_poll_retries as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_json() -> serde_json::Value {
        serde_json::json!({
            "open_api_key": "sk-test",
            "elevenlabs_api_key": "el-test",
            "project_id": "my-project",
            "location_id": "us-central1",
            "model_id": "veo-3.0-generate-preview",
        })
    }

    #[test]
    fn defaults_apply_when_optional_keys_absent() {
        let cfg: Config = serde_json::from_value(full_json()).unwrap();
        assert_eq!(cfg.max_concurrent_scenes, 4);
        assert_eq!(cfg.poll_interval_ms, 5000);
        assert_eq!(cfg.max_poll_retries, -1);
        assert_eq!(cfg.poll_budget(), None);
    }

    #[test]
    fn bounded_retry_budget_is_exposed() {
        let mut json = full_json();
        json["max_poll_retries"] = serde_json::json!(3);
        let cfg: Config = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.poll_budget(), Some(3));
    }

    #[tokio::test]
    async fn missing_required_key_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut json = full_json();
        json["project_id"] = serde_json::json!("");
        tokio::fs::write(&path, json.to_string()).await.unwrap();

        let err = Config::load(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(msg) if msg.contains("project_id")));
    }
}
