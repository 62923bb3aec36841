use crate::error::{PipelineError, Result};
use crate::models::{AnalysisRecord, GameRecord};
use crate::store::{GameStore, StoredAnalysis, StoredGame};
use crate::utils::data::{load_from_cache, save_to_cache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

const GAMES_DIR: &str = "games_raw";
const ANALYSES_DIR: &str = "ai_outputs";

/// One JSON file per game id under `<root>/games_raw` and `<root>/ai_outputs`
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, table: &str, game_id: &str) -> PathBuf {
        self.root
            .join(table)
            .join(format!("{}.json", file_stem(game_id)))
    }

    pub fn load_game(&self, game_id: &str) -> anyhow::Result<StoredGame> {
        load_from_cache(self.path_for(GAMES_DIR, game_id))
    }

    pub fn load_analysis(&self, game_id: &str) -> anyhow::Result<StoredAnalysis> {
        load_from_cache(self.path_for(ANALYSES_DIR, game_id))
    }

    fn clear_table(&self, table: &str) -> Result<u64> {
        let dir = self.root.join(table);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Letters, digits and '-' pass through; every other byte becomes `_XX`.
/// Distinct ids always get distinct file names.
fn file_stem(game_id: &str) -> String {
    let mut stem = String::with_capacity(game_id.len());
    for byte in game_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

#[async_trait]
impl GameStore for JsonFileStore {
    async fn upsert_game(&self, game: &GameRecord, fetched_at: DateTime<Utc>) -> Result<()> {
        let path = self.path_for(GAMES_DIR, &game.game_id);
        save_to_cache(&StoredGame::new(game, fetched_at), &path)
            .map_err(|e| PipelineError::persistence(&game.game_id, format!("{:#}", e)))?;
        debug!("Saved {}", path.display());
        Ok(())
    }

    async fn upsert_analysis(
        &self,
        analysis: &AnalysisRecord,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()> {
        let path = self.path_for(ANALYSES_DIR, &analysis.game_id);
        let row = StoredAnalysis {
            analysis: analysis.clone(),
            analyzed_at,
        };
        save_to_cache(&row, &path)
            .map_err(|e| PipelineError::persistence(&analysis.game_id, format!("{:#}", e)))?;
        debug!("Saved {}", path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        Ok(self.clear_table(ANALYSES_DIR)? + self.clear_table(GAMES_DIR)?)
    }

    fn store_name(&self) -> &'static str {
        "json"
    }
}
