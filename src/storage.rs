use crate::error::PipelineResult;
use crate::script::Movie;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Durable output layout for one movie: everything lives under
/// `<root>/<title>/` with deterministic file names, so concurrent scene
/// jobs never collide and a partially completed run can be inspected.
#[derive(Debug, Clone)]
pub struct MovieDir {
    dir: PathBuf,
}

impl MovieDir {
    pub fn new<P: AsRef<Path>>(root: P, title: &str) -> Self {
        Self {
            dir: root.as_ref().join(title),
        }
    }

    pub async fn ensure(&self) -> PipelineResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn movie_json(&self) -> PathBuf {
        self.dir.join("movie.json")
    }

    pub fn scene_video(&self, index: usize) -> PathBuf {
        self.dir.join(format!("video_{}.mp4", index))
    }

    pub fn concat_list(&self) -> PathBuf {
        self.dir.join("videos.txt")
    }

    pub fn joined_video(&self) -> PathBuf {
        self.dir.join("joined_video.mp4")
    }

    pub fn background_music(&self) -> PathBuf {
        self.dir.join("background_music.mp3")
    }

    pub fn final_video(&self) -> PathBuf {
        self.dir.join("joined_video_with_music.mp4")
    }

    /// Persists the script before fan-out begins, pretty-printed so a
    /// partially completed run can be diagnosed by hand.
    pub async fn save_movie(&self, movie: &Movie) -> PipelineResult<()> {
        self.ensure().await?;
        let json = serde_json::to_string_pretty(movie)?;
        fs::write(self.movie_json(), json).await?;
        Ok(())
    }

    pub async fn load_movie(&self) -> PipelineResult<Movie> {
        let text = fs::read_to_string(self.movie_json()).await?;
        Movie::from_json(&text)
    }

    /// Writes one scene's decoded video bytes. Write-once by convention;
    /// the index-derived name keeps sibling jobs from clobbering each other.
    pub async fn write_scene_video(&self, index: usize, bytes: &[u8]) -> PipelineResult<PathBuf> {
        self.ensure().await?;
        let path = self.scene_video(index);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Lists scene videos ordered by their embedded index. Completion
    /// order and directory iteration order are irrelevant; only the
    /// index in the file name decides the join order.
    pub async fn scene_videos_in_order(&self) -> PipelineResult<Vec<(usize, PathBuf)>> {
        let pattern = Regex::new(r"^video_(\d+)\.mp4$").unwrap();
        let mut found = Vec::new();

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(cap) = pattern.captures(name) {
                if let Ok(index) = cap[1].parse::<usize>() {
                    found.push((index, entry.path()));
                }
            }
        }

        found.sort_by_key(|(index, _)| *index);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Character, Movie, Scene};

    fn sample_movie() -> Movie {
        Movie {
            title: "Test Movie".into(),
            background_music: "ambient".into(),
            art_style: "watercolor".into(),
            characters: vec![Character {
                name: "Mia".into(),
                description: "a red fox".into(),
            }],
            transcript: vec![Scene {
                prompt: "Mia runs.".into(),
                duration: 8.0,
            }],
        }
    }

    #[test]
    fn paths_are_derived_from_title_and_index() {
        let dir = MovieDir::new("outputs", "Dino Day");
        assert_eq!(dir.movie_json(), PathBuf::from("outputs/Dino Day/movie.json"));
        assert_eq!(
            dir.scene_video(3),
            PathBuf::from("outputs/Dino Day/video_3.mp4")
        );
        assert_eq!(
            dir.final_video(),
            PathBuf::from("outputs/Dino Day/joined_video_with_music.mp4")
        );
    }

    #[tokio::test]
    async fn movie_round_trips_through_disk() {
        let root = tempfile::tempdir().unwrap();
        let movie = sample_movie();
        let dir = MovieDir::new(root.path(), &movie.title);

        dir.save_movie(&movie).await.unwrap();
        let loaded = dir.load_movie().await.unwrap();
        assert_eq!(movie, loaded);
    }

    #[tokio::test]
    async fn scene_videos_sort_by_index_not_write_order() {
        let root = tempfile::tempdir().unwrap();
        let dir = MovieDir::new(root.path(), "shuffled");
        dir.ensure().await.unwrap();

        // Completion order deliberately scrambled, including a
        // two-digit index to rule out lexicographic sorting.
        for index in [7usize, 0, 10, 2, 1] {
            dir.write_scene_video(index, b"mp4").await.unwrap();
        }
        // Unrelated files are ignored.
        tokio::fs::write(dir.path().join("joined_video.mp4"), b"x")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"x").await.unwrap();

        let ordered = dir.scene_videos_in_order().await.unwrap();
        let indexes: Vec<usize> = ordered.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![0, 1, 2, 7, 10]);
        assert_eq!(ordered[4].1, dir.scene_video(10));
    }
}
