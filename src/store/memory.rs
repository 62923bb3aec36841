use crate::error::Result;
use crate::models::{AnalysisRecord, GameRecord};
use crate::store::{GameStore, StoredAnalysis, StoredGame};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps everything in process memory; nothing survives the run
#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<String, StoredGame>>,
    analyses: RwLock<HashMap<String, StoredAnalysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn game(&self, game_id: &str) -> Option<StoredGame> {
        self.games.read().await.get(game_id).cloned()
    }

    pub async fn analysis(&self, game_id: &str) -> Option<StoredAnalysis> {
        self.analyses.read().await.get(game_id).cloned()
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn analysis_count(&self) -> usize {
        self.analyses.read().await.len()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn upsert_game(&self, game: &GameRecord, fetched_at: DateTime<Utc>) -> Result<()> {
        self.games
            .write()
            .await
            .insert(game.game_id.clone(), StoredGame::new(game, fetched_at));
        Ok(())
    }

    async fn upsert_analysis(
        &self,
        analysis: &AnalysisRecord,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.analyses.write().await.insert(
            analysis.game_id.clone(),
            StoredAnalysis {
                analysis: analysis.clone(),
                analyzed_at,
            },
        );
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let mut games = self.games.write().await;
        let mut analyses = self.analyses.write().await;
        let removed = games.len() + analyses.len();
        games.clear();
        analyses.clear();
        Ok(removed as u64)
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
