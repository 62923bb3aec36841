pub mod espn_api;
pub mod fixtures;
pub mod openai_api;

pub use espn_api::EspnApiClient;
pub use fixtures::{CannedCompletion, FixtureScoreboard};
pub use openai_api::OpenAiClient;

use crate::error::Result;
use async_trait::async_trait;

/// Source of raw ESPN scoreboard documents
#[async_trait]
pub trait ScoreboardSource: Send + Sync {
    /// Scoreboard for a regular-season week, or the current one when `week` is `None`
    async fn fetch_scoreboard(&self, week: Option<u32>) -> Result<serde_json::Value>;
    fn source_name(&self) -> &'static str;
}

/// A text completion endpoint
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}
