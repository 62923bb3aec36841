pub mod json_file;
pub mod memory;
pub mod postgres;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::error::Result;
use crate::models::{AnalysisRecord, GameRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where games and analyses end up. Both writes are upserts keyed by
/// `game_id`: writing the same game again replaces the earlier row.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn upsert_game(&self, game: &GameRecord, fetched_at: DateTime<Utc>) -> Result<()>;

    async fn upsert_analysis(
        &self,
        analysis: &AnalysisRecord,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete every stored game and analysis, returning how many rows went
    async fn clear(&self) -> Result<u64>;

    fn store_name(&self) -> &'static str;
}

/// Row of the raw games table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredGame {
    pub game_id: String,
    pub raw_json: GameRecord,
    pub week: u32,
    pub season_year: i32,
    pub game_time: String,
    pub fetched_at: DateTime<Utc>,
}

impl StoredGame {
    pub fn new(game: &GameRecord, fetched_at: DateTime<Utc>) -> Self {
        Self {
            game_id: game.game_id.clone(),
            raw_json: game.clone(),
            week: game.week,
            season_year: game.season_year,
            game_time: game.game_time.clone(),
            fetched_at,
        }
    }
}

/// Row of the analysis table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    #[serde(flatten)]
    pub analysis: AnalysisRecord,
    pub analyzed_at: DateTime<Utc>,
}
