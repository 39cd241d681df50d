use crate::error::PipelineResult;
use crate::pipeline::OUTPUT_ROOT;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub async fn ensure_directories() -> PipelineResult<()> {
    if !Path::new(OUTPUT_ROOT).exists() {
        fs::create_dir_all(OUTPUT_ROOT).await?;
        info!("created directory: {}", OUTPUT_ROOT);
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
