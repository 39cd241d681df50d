use crate::error::{PipelineError, PipelineResult};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

async fn run_ffmpeg(args: &[String]) -> PipelineResult<()> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .await
        .map_err(|e| PipelineError::media(format!("failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PipelineError::media(format!("ffmpeg failed: {}", stderr)));
    }

    Ok(())
}

pub async fn probe_duration_seconds(path: &Path) -> PipelineResult<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| PipelineError::media(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PipelineError::media(format!("ffprobe failed: {}", stderr)));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.0 {
        return Err(PipelineError::validation(format!(
            "could not determine duration of {}",
            path.display()
        )));
    }
    Ok(duration)
}

/// Joins the listed videos with a lossless stream copy. The list file
/// uses ffmpeg concat-demuxer syntax and already encodes the scene order.
pub async fn concat_videos(list_txt: &Path, out_mp4: &Path) -> PipelineResult<()> {
    let args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        out_mp4.display().to_string(),
    ];
    run_ffmpeg(&args).await?;
    info!(path = %out_mp4.display(), "videos concatenated");
    Ok(())
}

/// Mixes the attenuated music track into the video's existing audio.
/// The video stream is copied untouched; only audio is re-encoded.
pub async fn mix_background_music(
    video_in: &Path,
    music_in: &Path,
    video_out: &Path,
) -> PipelineResult<()> {
    let args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video_in.display().to_string(),
        "-i".to_string(),
        music_in.display().to_string(),
        "-filter_complex".to_string(),
        "[1:a]volume=0.5[bgm];[0:a][bgm]amix=inputs=2:dropout_transition=0[mixed]".to_string(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "[mixed]".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        video_out.display().to_string(),
    ];
    run_ffmpeg(&args).await?;
    info!(path = %video_out.display(), "background music mixed in");
    Ok(())
}
