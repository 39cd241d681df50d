use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generation request rejected: {0}")]
    Submission(String),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote operation failed: {0}")]
    RemoteOperation(String),

    #[error("scenes incomplete: {0:?} did not produce a video")]
    ScenesIncomplete(Vec<usize>),

    #[error("invalid response: {0}")]
    Validation(String),

    #[error("media processing failed: {0}")]
    MediaProcessing(String),

    #[error("credential fetch failed: {0}")]
    Credential(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::MediaProcessing(msg.into())
    }

    /// Process exit code for this error kind, so scripts and CI can
    /// distinguish failure modes without parsing log output.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Submission(_) => 10,
            Self::Transport(_) => 11,
            Self::RemoteOperation(_) => 12,
            Self::ScenesIncomplete(_) => 13,
            Self::Validation(_) => 14,
            Self::MediaProcessing(_) => 15,
            Self::Credential(_) => 16,
            Self::Config(_) => 17,
            Self::Io(_) | Self::Json(_) => 18,
        }
    }

    /// The most specific diagnostic text available: a remote-service
    /// message beats a generic transport description.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::RemoteOperation(msg) | Self::Submission(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
