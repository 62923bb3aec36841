use crate::error::{PipelineError, Result};
use crate::models::{AnalysisRecord, GameRecord};
use crate::store::GameStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{debug, info};

const MAX_CONNECTIONS: u32 = 5;

/// Postgres-backed store with a `games_raw` and an `ai_outputs` table
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        info!("Connected to Postgres");
        Ok(Self::new(pool))
    }

    /// Create both tables if they are missing
    pub async fn ensure_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS games_raw (
                game_id TEXT PRIMARY KEY,
                raw_json JSONB NOT NULL,
                week INTEGER NOT NULL,
                season_year INTEGER NOT NULL,
                game_time TEXT NOT NULL,
                fetched_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ai_outputs (
                game_id TEXT PRIMARY KEY,
                top_insight TEXT NOT NULL,
                summary TEXT NOT NULL,
                spread_analysis TEXT NOT NULL,
                ai_lean TEXT NOT NULL,
                angles JSONB NOT NULL,
                predicted_line TEXT NOT NULL,
                predicted_total TEXT NOT NULL,
                team_strength JSONB NOT NULL,
                injury_impact TEXT NOT NULL,
                confidence_score TEXT NOT NULL,
                model_used TEXT NOT NULL,
                analyzed_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// `games_raw.week` is an INTEGER column
fn week_column(game: &GameRecord) -> Result<i32> {
    i32::try_from(game.week).map_err(|_| {
        PipelineError::persistence(&game.game_id, format!("week {} out of range", game.week))
    })
}

#[async_trait]
impl GameStore for PostgresStore {
    async fn upsert_game(&self, game: &GameRecord, fetched_at: DateTime<Utc>) -> Result<()> {
        let week = week_column(game)?;

        sqlx::query(
            r#"
            INSERT INTO games_raw (game_id, raw_json, week, season_year, game_time, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (game_id) DO UPDATE SET
                raw_json = EXCLUDED.raw_json,
                week = EXCLUDED.week,
                season_year = EXCLUDED.season_year,
                game_time = EXCLUDED.game_time,
                fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(&game.game_id)
        .bind(Json(game))
        .bind(week)
        .bind(game.season_year)
        .bind(&game.game_time)
        .bind(fetched_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::persistence(&game.game_id, e))?;

        debug!(game_id = %game.game_id, "Upserted raw game");
        Ok(())
    }

    async fn upsert_analysis(
        &self,
        analysis: &AnalysisRecord,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_outputs (
                game_id, top_insight, summary, spread_analysis, ai_lean, angles,
                predicted_line, predicted_total, team_strength, injury_impact,
                confidence_score, model_used, analyzed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (game_id) DO UPDATE SET
                top_insight = EXCLUDED.top_insight,
                summary = EXCLUDED.summary,
                spread_analysis = EXCLUDED.spread_analysis,
                ai_lean = EXCLUDED.ai_lean,
                angles = EXCLUDED.angles,
                predicted_line = EXCLUDED.predicted_line,
                predicted_total = EXCLUDED.predicted_total,
                team_strength = EXCLUDED.team_strength,
                injury_impact = EXCLUDED.injury_impact,
                confidence_score = EXCLUDED.confidence_score,
                model_used = EXCLUDED.model_used,
                analyzed_at = EXCLUDED.analyzed_at
            "#,
        )
        .bind(&analysis.game_id)
        .bind(&analysis.top_insight)
        .bind(&analysis.summary)
        .bind(&analysis.spread_analysis)
        .bind(&analysis.ai_lean)
        .bind(Json(&analysis.angles))
        .bind(&analysis.predicted_line)
        .bind(&analysis.predicted_total)
        .bind(Json(&analysis.team_strength))
        .bind(&analysis.injury_impact)
        .bind(&analysis.confidence_score)
        .bind(&analysis.model_used)
        .bind(analyzed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::persistence(&analysis.game_id, e))?;

        debug!(game_id = %analysis.game_id, "Upserted analysis");
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let analyses = sqlx::query("DELETE FROM ai_outputs")
            .execute(&self.pool)
            .await?
            .rows_affected();
        let games = sqlx::query("DELETE FROM games_raw")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(analyses + games)
    }

    fn store_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback_analysis;
    use crate::api::{FixtureScoreboard, ScoreboardSource};
    use crate::utils::extractor::{extract_games, ExtractContext};
    use sqlx::Row;

    fn game_in_week(week: u32) -> GameRecord {
        let scoreboard: serde_json::Value =
            serde_json::from_str(include_str!("../../fixtures/mock_scoreboard.json")).unwrap();
        let ctx = ExtractContext {
            season_year: 2025,
            week: None,
        };
        let mut game = extract_games(&scoreboard, ctx).unwrap().games.remove(0);
        game.week = week;
        game
    }

    #[test]
    fn test_week_column_rejects_out_of_range_weeks() {
        assert_eq!(week_column(&game_in_week(13)).unwrap(), 13);

        let err = week_column(&game_in_week(u32::MAX)).unwrap_err();
        assert!(matches!(
            &err,
            PipelineError::Persistence { game_id, .. } if game_id == "401772943"
        ));
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    #[ignore] // Requires a running Postgres reachable through DATABASE_URL
    async fn test_upsert_keeps_one_row_per_game() {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let store = PostgresStore::connect(&url).await.unwrap();
        store.ensure_tables().await.unwrap();

        let scoreboard = FixtureScoreboard::embedded()
            .unwrap()
            .fetch_scoreboard(None)
            .await
            .unwrap();
        let ctx = ExtractContext {
            season_year: 2025,
            week: None,
        };
        let game = extract_games(&scoreboard, ctx).unwrap().games.remove(0);

        let mut analysis = fallback_analysis(&game, "first");
        store.upsert_game(&game, Utc::now()).await.unwrap();
        store.upsert_analysis(&analysis, Utc::now()).await.unwrap();
        analysis.model_used = "second".to_string();
        store.upsert_game(&game, Utc::now()).await.unwrap();
        store.upsert_analysis(&analysis, Utc::now()).await.unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS n, MAX(model_used) AS model FROM ai_outputs WHERE game_id = $1")
            .bind(&game.game_id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let count: i64 = row.get("n");
        let model: String = row.get("model");
        assert_eq!(count, 1);
        assert_eq!(model, "second");
    }
}
