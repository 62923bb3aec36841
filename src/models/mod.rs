use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One NFL game as extracted from a scoreboard fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub week: u32,
    pub season_year: i32,
    pub game_time: String, // ISO kickoff as ESPN sends it, e.g. "2025-11-27T17:30Z"
    pub game_time_display: String,
    pub status: String, // "pre", "in" or "post"
    pub home_team: TeamSnapshot,
    pub away_team: TeamSnapshot,
    pub venue: Venue,
    pub broadcast: String,
    pub odds: Option<OddsSnapshot>,
}

impl GameRecord {
    /// "Away @ Home"
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team.name, self.home_team.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub record: String,
    pub home_record: String,
    pub away_record: String,
    pub leaders: TeamLeaders,
}

/// Statistical leaders; a category ESPN did not send stays `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamLeaders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passing: Option<LeaderLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rushing: Option<LeaderLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiving: Option<LeaderLine>,
}

impl TeamLeaders {
    pub fn is_empty(&self) -> bool {
        self.passing.is_none() && self.rushing.is_none() && self.receiving.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderLine {
    pub player: String,
    pub stats: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub city: String,
    pub state: String,
    pub indoor: bool,
}

/// Betting lines for a game. Absent until the books post them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub provider: String,
    pub spread_details: String, // e.g. "DET -10.5"
    pub over_under: String,
    pub home_moneyline: Option<i32>, // American odds format (e.g., -110, +150)
    pub away_moneyline: Option<i32>,
}

/// Structured betting analysis for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub game_id: String,
    pub top_insight: String,
    pub summary: String,
    pub spread_analysis: String,
    pub ai_lean: String,
    pub angles: Vec<String>,
    pub predicted_line: String,
    pub predicted_total: String,
    pub team_strength: BTreeMap<String, String>,
    pub injury_impact: String,
    pub confidence_score: String,
    pub model_used: String,
}
