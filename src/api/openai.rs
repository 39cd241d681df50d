use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::script::Movie;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a screenplay assistant. Follow these rules precisely:\n\
1. Generate a short movie broken into standalone 8-second scenes. Each scene must be self-contained and describe the visuals, actions, and any dialogue.\n\
2. Avoid any provocative, offensive, or explicit content.\n\
3. Always return strictly valid JSON matching the provided schema.\n\
4. Ensure all strings are concise but vivid, especially for visual and character descriptions.\n\
5. Maintain coherence across scenes but keep each scene independently understandable.";

fn script_schema() -> serde_json::Value {
    json!({
        "name": "script_response",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "backgroundMusic": { "type": "string" },
                "artStyle": { "type": "string" },
                "characters": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["name", "description"],
                        "additionalProperties": false
                    }
                },
                "transcript": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "prompt": { "type": "string" },
                            "duration": { "type": "number" }
                        },
                        "required": ["prompt", "duration"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["title", "transcript", "backgroundMusic", "artStyle", "characters"],
            "additionalProperties": false
        }
    })
}

fn extract_message_content(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            warn!("OpenAI error message: {}", msg);
        }
        if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
            warn!("OpenAI error type: {}", typ);
        }
        return None;
    }

    root.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Asks the script-generation service for a complete movie script and
/// post-processes it into standalone scenes.
pub async fn generate_script(
    client: &Client,
    cfg: &Config,
    prompt: &str,
    duration_minutes: u32,
) -> PipelineResult<Movie> {
    let user_prompt = format!(
        "Create a sequence of movie scenes for the idea: \"{}\". The movie should be {} minutes long.",
        prompt, duration_minutes
    );

    let body = json!({
        "model": "gpt-4o-mini",
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": user_prompt },
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": script_schema(),
        },
    });

    let resp = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(&cfg.openai_key)
        .json(&body)
        .timeout(Duration::from_secs(300))
        .send()
        .await?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        warn!("OpenAI HTTP {}", status.as_u16());
        if !raw.is_empty() {
            let snippet = raw.chars().take(800).collect::<String>();
            warn!("OpenAI raw body: {}", snippet);
        }
        return Err(PipelineError::validation("failed to generate a valid transcript"));
    }

    let content = extract_message_content(&raw)
        .ok_or_else(|| PipelineError::validation("failed to generate a valid transcript"))?;

    let movie = Movie::from_json(&content)?.into_standalone_scenes();
    info!(
        title = %movie.title,
        scenes = movie.transcript.len(),
        "script generated"
    );
    Ok(movie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_pulled_from_first_choice() {
        let raw = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"ok\":true}" } }]
        })
        .to_string();
        assert_eq!(extract_message_content(&raw).unwrap(), "{\"ok\":true}");
    }

    #[test]
    fn error_envelope_yields_none() {
        let raw = serde_json::json!({
            "error": { "message": "rate limited", "type": "rate_limit_error" }
        })
        .to_string();
        assert_eq!(extract_message_content(&raw), None);
    }
}
