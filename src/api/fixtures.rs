//! Offline stand-ins for ESPN and the completion endpoint, used by mock runs.

use crate::analysis::format::{SectionLabel, TemplateVersion};
use crate::api::{CompletionClient, ScoreboardSource};
use crate::error::Result;
use crate::utils::data::load_from_cache;
use async_trait::async_trait;
use std::path::Path;

const MOCK_SCOREBOARD: &str = include_str!("../../fixtures/mock_scoreboard.json");

/// Serves one static scoreboard regardless of the week asked for
pub struct FixtureScoreboard {
    scoreboard: serde_json::Value,
}

impl FixtureScoreboard {
    /// The scoreboard bundled with the crate
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            scoreboard: serde_json::from_str(MOCK_SCOREBOARD)?,
        })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            scoreboard: load_from_cache(path)?,
        })
    }
}

#[async_trait]
impl ScoreboardSource for FixtureScoreboard {
    async fn fetch_scoreboard(&self, _week: Option<u32>) -> Result<serde_json::Value> {
        Ok(self.scoreboard.clone())
    }

    fn source_name(&self) -> &'static str {
        "fixture"
    }
}

/// Answers every prompt with the same well-formed response
pub struct CannedCompletion {
    response: String,
}

impl CannedCompletion {
    pub fn new(template: TemplateVersion) -> Self {
        let mut response = String::new();
        for section in template.sections() {
            response.push_str(section.label.header());
            response.push_str(":\n");
            response.push_str(canned_body(section.label));
            response.push_str("\n\n");
        }
        Self { response }
    }
}

fn canned_body(label: SectionLabel) -> &'static str {
    match label {
        SectionLabel::TopInsight => "Mock analysis - no model was called for this matchup.",
        SectionLabel::Summary => {
            "This record was produced offline so the pipeline can be exercised without an API key."
        }
        SectionLabel::SpreadAnalysis => "No spread reasoning is available in mock mode.",
        SectionLabel::AiLean => "Lean: none (mock data)",
        SectionLabel::Angles => "- Mock angle: home/away splits\n- Mock angle: schedule spot",
        SectionLabel::TeamStrength => {
            "Home Offense: 50\nHome Defense: 50\nAway Offense: 50\nAway Defense: 50"
        }
        SectionLabel::PredictedLine | SectionLabel::YourPredictedSpread => "PK",
        SectionLabel::PredictedTotal => "44.5",
        SectionLabel::InjuryImpact => "Unknown - mock data",
        SectionLabel::Confidence => "Low",
    }
}

#[async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
