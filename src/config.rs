use crate::analysis::format::TemplateVersion;
use crate::api::openai_api::DEFAULT_MODEL;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_SEASON_YEAR: i32 = 2025;
/// Last week of the NFL regular season
pub const MAX_WEEK: u32 = 18;

/// Persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Json,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "json" => Ok(StoreKind::Json),
            "memory" | "none" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store: {}", other)),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Postgres => write!(f, "postgres"),
            StoreKind::Json => write!(f, "json"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

/// Everything a run needs to know
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub season_year: i32,
    /// `None` means pick the next week with an unstarted game
    pub week: Option<u32>,
    pub use_mock_data: bool,
    pub mock_file: Option<PathBuf>,
    pub template: TemplateVersion,
    pub strict_headers: bool,
    pub model: String,
    pub openai_api_key: Option<String>,
    pub database_url: Option<String>,
    pub store: Option<StoreKind>,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            season_year: DEFAULT_SEASON_YEAR,
            week: None,
            use_mock_data: false,
            mock_file: None,
            template: TemplateVersion::default(),
            strict_headers: false,
            model: DEFAULT_MODEL.to_string(),
            openai_api_key: None,
            database_url: None,
            store: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl PipelineConfig {
    /// Explicit choice, else Postgres when a database URL is configured, else JSON files
    pub fn store_kind(&self) -> StoreKind {
        self.store.unwrap_or(if self.database_url.is_some() {
            StoreKind::Postgres
        } else {
            StoreKind::Json
        })
    }

    /// Checks needed by anything that reads a scoreboard
    pub fn validate_week(&self) -> Result<()> {
        match self.week {
            Some(week) if !(1..=MAX_WEEK).contains(&week) => Err(PipelineError::Config(format!(
                "week must be between 1 and {}, got {}",
                MAX_WEEK, week
            ))),
            _ => Ok(()),
        }
    }

    /// Checks for a full run, which also needs a model and a store
    pub fn validate(&self) -> Result<()> {
        self.validate_week()?;

        if self.store_kind() == StoreKind::Postgres && self.database_url.is_none() {
            return Err(PipelineError::Config(
                "DATABASE_URL is required for the postgres store".to_string(),
            ));
        }

        if !self.use_mock_data && self.openai_api_key.is_none() {
            return Err(PipelineError::Config(
                "OPENAI_API_KEY is required unless mock data is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
