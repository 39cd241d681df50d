use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

const MUSIC_URL: &str = "https://api.elevenlabs.io/v1/music?output_format=mp3_44100_128";

/// Generates a background-music track of the requested length and writes
/// the MP3 bytes to `out_mp3_path`. Single call, no polling.
pub async fn generate_music(
    client: &Client,
    cfg: &Config,
    theme: &str,
    music_length_ms: u64,
    out_mp3_path: &Path,
) -> PipelineResult<()> {
    let body = serde_json::json!({
        "music_length_ms": music_length_ms,
        "prompt": format!("{}, instrumental only", theme),
    });

    let resp = client
        .post(MUSIC_URL)
        .header("Content-Type", "application/json")
        .header("xi-api-key", &cfg.elevenlabs_key)
        .json(&body)
        .timeout(Duration::from_secs(300))
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(PipelineError::submission(format!(
            "ElevenLabs music request failed HTTP {}",
            resp.status().as_u16()
        )));
    }

    let bytes = resp.bytes().await?;
    if let Some(parent) = out_mp3_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(out_mp3_path, &bytes).await?;
    info!(
        path = %out_mp3_path.display(),
        bytes = bytes.len(),
        "background music written"
    );

    Ok(())
}
