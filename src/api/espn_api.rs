use crate::api::ScoreboardSource;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

const ESPN_SCOREBOARD_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";
const REGULAR_SEASON: &str = "2";
const TIMEOUT_SECS: u64 = 10;

pub struct EspnApiClient {
    season_year: i32,
    client: reqwest::Client,
}

impl EspnApiClient {
    pub fn new(season_year: i32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            season_year,
            client,
        })
    }

    fn scoreboard_query(&self, week: Option<u32>) -> Vec<(&'static str, String)> {
        match week {
            Some(week) => vec![
                ("dates", self.season_year.to_string()),
                ("seasontype", REGULAR_SEASON.to_string()),
                ("week", week.to_string()),
            ],
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl ScoreboardSource for EspnApiClient {
    async fn fetch_scoreboard(&self, week: Option<u32>) -> Result<serde_json::Value> {
        let query = self.scoreboard_query(week);
        info!(url = ESPN_SCOREBOARD_URL, ?week, "Fetching from ESPN");

        let response = self
            .client
            .get(ESPN_SCOREBOARD_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::Fetch(format!(
                "ESPN returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Fetch(format!("Failed to parse ESPN response: {}", e)))
    }

    fn source_name(&self) -> &'static str {
        "espn"
    }
}
