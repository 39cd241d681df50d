use crate::api;
use crate::api::vertex::{
    PollConfig, SceneResult, VertexBackend, VideoBackend, generate_scene_video,
};
use crate::auth::{CredentialProvider, GcloudCredentials};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::ffmpeg;
use crate::script::Scene;
use crate::storage::MovieDir;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub const OUTPUT_ROOT: &str = "outputs";
const MOVIE_DURATION_MINUTES: u32 = 1;

/// Issues one generation job per scene through a bounded worker pool and
/// waits for every job to settle. Never short-circuits: a failing scene
/// does not abort its siblings, and artifacts already written stay on
/// disk for inspection or manual retry.
///
/// A scene whose retry budget ran out counts as failed here; joining an
/// incomplete artifact set would silently drop scenes.
pub async fn generate_all_scenes(
    backend: Arc<dyn VideoBackend>,
    dir: &MovieDir,
    scenes: &[Scene],
    poll: PollConfig,
    max_concurrent: usize,
) -> PipelineResult<Vec<SceneResult>> {
    dir.ensure().await?;
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(scenes.len());

    for (index, scene) in scenes.iter().enumerate() {
        let backend = Arc::clone(&backend);
        let semaphore = Arc::clone(&semaphore);
        let dir = dir.clone();
        let prompt = scene.prompt.clone();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err(PipelineError::validation("scene scheduler closed")),
            };
            generate_scene_video(backend.as_ref(), &dir, &prompt, index, poll).await
        }));
    }

    // Fan-in: every job settles before we look at any outcome.
    let mut settled = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::validation(format!("scene task aborted: {}", e))),
        };
        settled.push((index, result));
    }

    let mut completed = Vec::new();
    let mut failed = Vec::new();
    for (index, result) in settled {
        match result {
            Ok(res) if res.artifact.is_some() => completed.push(res),
            Ok(res) => {
                warn!(
                    scene = index,
                    operation = %res.operation,
                    "scene still pending after retry budget"
                );
                failed.push(index);
            }
            Err(err) => {
                error!(scene = index, "scene generation failed: {}", err.diagnostic());
                failed.push(index);
            }
        }
    }

    if !failed.is_empty() {
        return Err(PipelineError::ScenesIncomplete(failed));
    }
    Ok(completed)
}

/// Builds the ffmpeg concat list from the artifacts on disk, ordered by
/// scene index regardless of completion order. Entries are bare file
/// names, resolved relative to the list's own directory.
pub async fn write_concat_list(dir: &MovieDir) -> PipelineResult<PathBuf> {
    let videos = dir.scene_videos_in_order().await?;
    if videos.is_empty() {
        return Err(PipelineError::validation("no scene videos found to join"));
    }

    let mut content = String::new();
    for (_, path) in &videos {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::validation("unrepresentable video file name"))?;
        content.push_str(&format!("file '{}'\n", name));
    }

    let list = dir.concat_list();
    fs::write(&list, content).await?;
    Ok(list)
}

/// Runs the whole pipeline for one prompt: script generation, script
/// persistence, concurrent scene video generation, concatenation, music
/// generation, and the final mix. Any stage failure aborts the rest.
pub async fn run_pipeline(
    client: &reqwest::Client,
    cfg: &Config,
    prompt: &str,
) -> PipelineResult<PathBuf> {
    let movie =
        api::openai::generate_script(client, cfg, prompt, MOVIE_DURATION_MINUTES).await?;

    let dir = MovieDir::new(OUTPUT_ROOT, &movie.title);
    dir.save_movie(&movie).await?;
    info!(path = %dir.movie_json().display(), "script persisted");

    let credentials: Arc<dyn CredentialProvider> = Arc::new(GcloudCredentials::new());
    let backend: Arc<dyn VideoBackend> =
        Arc::new(VertexBackend::new(client.clone(), cfg, credentials));
    let poll = PollConfig {
        interval: Duration::from_millis(cfg.poll_interval_ms),
        max_retries: cfg.poll_budget(),
    };

    let results = generate_all_scenes(
        backend,
        &dir,
        &movie.transcript,
        poll,
        cfg.max_concurrent_scenes,
    )
    .await?;
    info!(scenes = results.len(), "all scene videos generated");

    let list = write_concat_list(&dir).await?;
    ffmpeg::concat_videos(&list, &dir.joined_video()).await?;
    let _ = fs::remove_file(&list).await;

    let duration = ffmpeg::probe_duration_seconds(&dir.joined_video()).await?;
    let music_length_ms = (duration * 1000.0).round() as u64;
    api::elevenlabs::generate_music(
        client,
        cfg,
        &movie.background_music,
        music_length_ms,
        &dir.background_music(),
    )
    .await?;

    ffmpeg::mix_background_music(
        &dir.joined_video(),
        &dir.background_music(),
        &dir.final_video(),
    )
    .await?;

    Ok(dir.final_video())
}
