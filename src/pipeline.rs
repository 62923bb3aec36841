use crate::analysis::{build_analysis_prompt, AnalysisService, HeaderRule, TemplateVersion};
use crate::api::{
    CannedCompletion, CompletionClient, EspnApiClient, FixtureScoreboard, OpenAiClient,
    ScoreboardSource,
};
use crate::config::{PipelineConfig, StoreKind, MAX_WEEK};
use crate::error::{PipelineError, Result};
use crate::models::{AnalysisRecord, GameRecord};
use crate::store::{GameStore, JsonFileStore, MemoryStore, PostgresStore};
use crate::utils::data::save_to_cache;
use crate::utils::extractor::{extract_games, has_upcoming_game, scoreboard_week, ExtractContext};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What happened to one game during a run
#[derive(Debug, Clone, Serialize)]
pub struct GameOutcome {
    pub game_id: String,
    pub matchup: String,
    pub analysis: AnalysisRecord,
    pub persisted: bool,
}

/// Counts and errors for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub week: Option<u32>,
    pub games_fetched: usize,
    pub games_analyzed: usize,
    pub games_persisted: usize,
    pub fallbacks: usize,
    pub errors: Vec<String>,
    pub games: Vec<GameOutcome>,
}

impl BatchResult {
    pub fn analyses(&self) -> Vec<AnalysisRecord> {
        self.games.iter().map(|g| g.analysis.clone()).collect()
    }

    /// Write the whole result to `<dir>/batch_<timestamp>.json`
    pub fn save_summary(&self, dir: &Path, at: DateTime<Utc>) -> anyhow::Result<PathBuf> {
        let path = dir.join(format!("batch_{}.json", at.format("%Y%m%d_%H%M%S")));
        save_to_cache(self, &path).context("Failed to save batch summary")?;
        Ok(path)
    }
}

/// Scoreboard access shared by full runs and previews
pub struct WeekFeed {
    source: Box<dyn ScoreboardSource>,
    season_year: i32,
}

impl WeekFeed {
    pub fn new(source: Box<dyn ScoreboardSource>, season_year: i32) -> Self {
        Self {
            source,
            season_year,
        }
    }

    /// Builds only the scoreboard source: no completion client, no store
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate_week()?;
        Ok(Self::new(scoreboard_source(config)?, config.season_year))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Prompts that a run would send for a week
    pub async fn preview(
        &self,
        week: Option<u32>,
        template: TemplateVersion,
    ) -> Result<Vec<(GameRecord, String)>> {
        let (scoreboard, resolved_week) = self.fetch(week).await?;
        let extracted = extract_games(&scoreboard, self.extract_context(resolved_week))?;
        for e in &extracted.errors {
            warn!("{}", e);
        }

        Ok(extracted
            .games
            .into_iter()
            .map(|game| {
                let prompt = build_analysis_prompt(&game, template);
                (game, prompt)
            })
            .collect())
    }

    fn extract_context(&self, week: Option<u32>) -> ExtractContext {
        ExtractContext {
            season_year: self.season_year,
            week,
        }
    }

    /// The requested week, or the first week from the current one on that
    /// still has a game to be played. Once the current scoreboard is in hand,
    /// a failed look-ahead falls back to it.
    async fn fetch(&self, week: Option<u32>) -> Result<(serde_json::Value, Option<u32>)> {
        if let Some(week) = week {
            let scoreboard = self.source.fetch_scoreboard(Some(week)).await?;
            return Ok((scoreboard, Some(week)));
        }

        let current = self.source.fetch_scoreboard(None).await?;
        let current_week = scoreboard_week(&current);
        if has_upcoming_game(&current) {
            return Ok((current, current_week));
        }

        if let Some(current_week) = current_week {
            for next in (current_week + 1)..=MAX_WEEK {
                info!("No upcoming games in week {}, checking week {}", current_week, next);
                match self.source.fetch_scoreboard(Some(next)).await {
                    Ok(scoreboard) if has_upcoming_game(&scoreboard) => {
                        return Ok((scoreboard, Some(next)));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Could not check week {}: {}", next, e);
                        break;
                    }
                }
            }
        }

        warn!("No week with upcoming games found, using the current scoreboard");
        Ok((current, current_week))
    }
}

/// Fetch -> extract -> analyze -> persist, one game at a time
pub struct Pipeline {
    feed: WeekFeed,
    analyzer: AnalysisService,
    store: Box<dyn GameStore>,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn ScoreboardSource>,
        analyzer: AnalysisService,
        store: Box<dyn GameStore>,
        season_year: i32,
    ) -> Self {
        Self {
            feed: WeekFeed::new(source, season_year),
            analyzer,
            store,
        }
    }

    /// Wire up the live or mock collaborators the config asks for
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let feed = WeekFeed::from_config(config)?;
        let mut analyzer = AnalysisService::new(completion_client(config)?, config.template);
        if config.strict_headers {
            analyzer = analyzer.with_header_rule(HeaderRule::strict(config.template));
        }
        let store = open_store(config).await?;

        info!(
            source = feed.source_name(),
            model = analyzer.model_name(),
            store = store.store_name(),
            template = %analyzer.template(),
            "Pipeline ready"
        );

        Ok(Self {
            feed,
            analyzer,
            store,
        })
    }

    pub fn store(&self) -> &dyn GameStore {
        self.store.as_ref()
    }

    /// Process every game of a week. Only a failed fetch ends the run early;
    /// per-game failures are recorded and the next game is processed.
    pub async fn run(&self, week: Option<u32>) -> BatchResult {
        let mut result = BatchResult::default();

        let (scoreboard, resolved_week) = match self.feed.fetch(week).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("Pipeline failed: {}", e);
                result.errors.push(e.to_string());
                return result;
            }
        };
        result.week = resolved_week;
        result.games_fetched = scoreboard
            .get("events")
            .and_then(|e| e.as_array())
            .map(Vec::len)
            .unwrap_or(0);

        let games = match extract_games(&scoreboard, self.feed.extract_context(resolved_week)) {
            Ok(extracted) => {
                result
                    .errors
                    .extend(extracted.errors.iter().map(ToString::to_string));
                extracted.games
            }
            Err(e) => {
                error!("Failed to read scoreboard: {}", e);
                result.errors.push(format!("Failed to read scoreboard: {}", e));
                return result;
            }
        };

        info!("Processing {} games", games.len());
        let total = games.len();

        for (i, game) in games.iter().enumerate() {
            info!("Game {}/{}: {}", i + 1, total, game.matchup());
            let outcome = self.process_game(game, &mut result).await;
            result.games.push(outcome);
        }

        info!(
            fetched = result.games_fetched,
            analyzed = result.games_analyzed,
            persisted = result.games_persisted,
            errors = result.errors.len(),
            "Pipeline complete"
        );
        result
    }

    async fn process_game(&self, game: &GameRecord, result: &mut BatchResult) -> GameOutcome {
        let analyzed = self.analyzer.analyze_detailed(game).await;
        match &analyzed.failure {
            None => result.games_analyzed += 1,
            Some(reason) => {
                result.fallbacks += 1;
                result
                    .errors
                    .push(format!("Failed to analyze game {}: {}", game.game_id, reason));
            }
        }

        let persisted = self.persist(game, &analyzed.record, result).await;
        if persisted {
            result.games_persisted += 1;
        }

        GameOutcome {
            game_id: game.game_id.clone(),
            matchup: game.matchup(),
            analysis: analyzed.record,
            persisted,
        }
    }

    /// Both upserts are attempted even when the first one fails
    async fn persist(
        &self,
        game: &GameRecord,
        analysis: &AnalysisRecord,
        result: &mut BatchResult,
    ) -> bool {
        let now = Utc::now();
        let writes = [
            self.store.upsert_game(game, now).await,
            self.store.upsert_analysis(analysis, now).await,
        ];

        let mut ok = true;
        for write in writes {
            if let Err(e) = write {
                warn!(game_id = %game.game_id, "{}", e);
                result.errors.push(e.to_string());
                ok = false;
            }
        }
        ok
    }

    /// Prompts that a run would send, without calling the model or the store
    pub async fn preview(&self, week: Option<u32>) -> Result<Vec<(GameRecord, String)>> {
        self.feed.preview(week, self.analyzer.template()).await
    }
}

fn scoreboard_source(config: &PipelineConfig) -> Result<Box<dyn ScoreboardSource>> {
    if !config.use_mock_data {
        return Ok(Box::new(EspnApiClient::new(config.season_year)?));
    }

    info!("Using mock data");
    match &config.mock_file {
        Some(path) => {
            let fixture = FixtureScoreboard::from_file(path).map_err(|e| {
                PipelineError::Config(format!("Failed to load {}: {:#}", path.display(), e))
            })?;
            Ok(Box::new(fixture))
        }
        None => Ok(Box::new(FixtureScoreboard::embedded()?)),
    }
}

fn completion_client(config: &PipelineConfig) -> Result<Box<dyn CompletionClient>> {
    match &config.openai_api_key {
        Some(key) => Ok(Box::new(
            OpenAiClient::new(key.clone())?.with_model(&config.model),
        )),
        None if config.use_mock_data => {
            warn!("No OPENAI_API_KEY found - using canned analysis");
            Ok(Box::new(CannedCompletion::new(config.template)))
        }
        None => Err(PipelineError::Config("OPENAI_API_KEY not set".to_string())),
    }
}

/// Open the configured store, creating Postgres tables when needed
pub async fn open_store(config: &PipelineConfig) -> Result<Box<dyn GameStore>> {
    match config.store_kind() {
        StoreKind::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                PipelineError::Config("DATABASE_URL not set".to_string())
            })?;
            let store = PostgresStore::connect(url).await?;
            store.ensure_tables().await?;
            Ok(Box::new(store))
        }
        StoreKind::Json => Ok(Box::new(JsonFileStore::new(&config.output_dir))),
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
    }
}
