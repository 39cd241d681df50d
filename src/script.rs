use crate::error::{PipelineError, PipelineResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single 8-second scene. Its index is its position in the transcript
/// and is the correlation key for the generated video artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub prompt: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub title: String,
    pub background_music: String,
    pub art_style: String,
    pub characters: Vec<Character>,
    pub transcript: Vec<Scene>,
}

impl Movie {
    pub fn from_json(text: &str) -> PipelineResult<Self> {
        let movie: Movie = serde_json::from_str(text)
            .map_err(|e| PipelineError::validation(format!("failed to parse script: {}", e)))?;
        movie.validate()?;
        Ok(movie)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.transcript.is_empty() {
            return Err(PipelineError::validation("script has no scenes"));
        }
        if self.transcript.iter().any(|s| s.duration <= 0.0) {
            return Err(PipelineError::validation(
                "script has a non-positive scene duration",
            ));
        }
        Ok(())
    }

    /// Rewrites each scene prompt so it stands alone: character names are
    /// expanded to `Name (description)` and the movie's art style is
    /// appended, since each scene is rendered by an independent job with
    /// no shared context.
    pub fn into_standalone_scenes(mut self) -> Self {
        let character_map: BTreeMap<&str, &str> = self
            .characters
            .iter()
            .map(|c| (c.name.as_str(), c.description.as_str()))
            .collect();

        for scene in &mut self.transcript {
            let mut prompt = scene.prompt.clone();
            for (name, description) in &character_map {
                let pattern = format!(r"\b{}(?:'s)?\b", regex::escape(name));
                if let Ok(re) = Regex::new(&pattern) {
                    if re.is_match(&prompt) {
                        let replacement = format!("{} ({})", name, description);
                        prompt = re.replace_all(&prompt, replacement.as_str()).into_owned();
                    }
                }
            }
            scene.prompt = format!("{} Art style: {}.", prompt, self.art_style);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_movie() -> Movie {
        Movie {
            title: "Dino Day".into(),
            background_music: "playful orchestral, building to triumphant".into(),
            art_style: "claymation".into(),
            characters: vec![Character {
                name: "Rex".into(),
                description: "a tiny green dinosaur with oversized glasses".into(),
            }],
            transcript: vec![
                Scene {
                    prompt: "Rex wakes up in a sunlit nest.".into(),
                    duration: 8.0,
                },
                Scene {
                    prompt: "Rex's glasses slide off during breakfast.".into(),
                    duration: 8.0,
                },
            ],
        }
    }

    #[test]
    fn parses_schema_json() {
        let json = r#"{
            "title": "Dino Day",
            "backgroundMusic": "playful",
            "artStyle": "claymation",
            "characters": [{"name": "Rex", "description": "a tiny dinosaur"}],
            "transcript": [{"prompt": "Rex wakes up.", "duration": 8}]
        }"#;
        let movie = Movie::from_json(json).unwrap();
        assert_eq!(movie.title, "Dino Day");
        assert_eq!(movie.transcript.len(), 1);
        assert_eq!(movie.transcript[0].duration, 8.0);
    }

    #[test]
    fn rejects_empty_transcript() {
        let json = r#"{
            "title": "Empty",
            "backgroundMusic": "none",
            "artStyle": "noir",
            "characters": [],
            "transcript": []
        }"#;
        let err = Movie::from_json(json).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn standalone_scenes_expand_character_names() {
        let movie = sample_movie().into_standalone_scenes();
        assert!(
            movie.transcript[0]
                .prompt
                .contains("Rex (a tiny green dinosaur with oversized glasses)")
        );
        assert!(movie.transcript[0].prompt.ends_with("Art style: claymation."));
    }

    #[test]
    fn standalone_scenes_cover_possessives() {
        let movie = sample_movie().into_standalone_scenes();
        // "Rex's" is matched as a whole and expanded too.
        assert!(
            movie.transcript[1]
                .prompt
                .contains("Rex (a tiny green dinosaur with oversized glasses) glasses slide off")
        );
    }

    #[test]
    fn movie_json_round_trips() {
        let movie = sample_movie();
        let json = serde_json::to_string_pretty(&movie).unwrap();
        let back: Movie = serde_json::from_str(&json).unwrap();
        assert_eq!(movie, back);
    }
}
