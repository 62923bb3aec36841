use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to fetch ESPN data: {0}")]
    Fetch(String),

    #[error("Failed to extract event {event_id}: {reason}")]
    Extraction { event_id: String, reason: String },

    #[error("Completion request failed: {0}")]
    Completion(String),

    #[error("Failed to save game {game_id}: {reason}")]
    Persistence { game_id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn extraction(event_id: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Extraction {
            event_id: event_id.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(game_id: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::Persistence {
            game_id: game_id.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
