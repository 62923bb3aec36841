use crate::analysis::format::{
    field_default, TemplateVersion, FALLBACK_CONFIDENCE, SYSTEM_INSTRUCTION,
};
use crate::analysis::parser::{CompletionParser, HeaderRule};
use crate::analysis::prompt::build_analysis_prompt;
use crate::api::CompletionClient;
use crate::error::Result;
use crate::models::{AnalysisRecord, GameRecord};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Result of analyzing one game. `failure` is set when the record is the fallback.
#[derive(Debug, Clone)]
pub struct Analyzed {
    pub record: AnalysisRecord,
    pub failure: Option<String>,
}

/// Prompt -> completion -> parse, with a fixed fallback when the call fails
pub struct AnalysisService {
    client: Box<dyn CompletionClient>,
    parser: CompletionParser,
}

impl AnalysisService {
    pub fn new(client: Box<dyn CompletionClient>, template: TemplateVersion) -> Self {
        let parser = CompletionParser::new(template).with_model(client.model_name());
        Self { client, parser }
    }

    pub fn with_header_rule(mut self, rule: HeaderRule) -> Self {
        self.parser = self.parser.with_rule(rule);
        self
    }

    pub fn template(&self) -> TemplateVersion {
        self.parser.template()
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Analyze a game. Never fails; a failed call yields `fallback_analysis`.
    pub async fn analyze(&self, game: &GameRecord) -> AnalysisRecord {
        self.analyze_detailed(game).await.record
    }

    /// Like `analyze`, but reports why the fallback was used
    pub async fn analyze_detailed(&self, game: &GameRecord) -> Analyzed {
        match self.try_analyze(game).await {
            Ok(record) => Analyzed {
                record,
                failure: None,
            },
            Err(e) => {
                error!(game_id = %game.game_id, "Error generating analysis: {}", e);
                Analyzed {
                    record: fallback_analysis(game, self.client.model_name()),
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_analyze(&self, game: &GameRecord) -> Result<AnalysisRecord> {
        let prompt = build_analysis_prompt(game, self.parser.template());
        debug!(game_id = %game.game_id, prompt_len = prompt.len(), "Requesting completion");

        let text = self.client.complete(SYSTEM_INSTRUCTION, &prompt).await?;
        Ok(self.parser.parse(&text, game))
    }
}

/// Placeholder analysis for a game the model could not be reached for
pub fn fallback_analysis(game: &GameRecord, model_used: &str) -> AnalysisRecord {
    AnalysisRecord {
        game_id: game.game_id.clone(),
        top_insight: format!("{} - Analysis unavailable", game.matchup()),
        summary: format!(
            "We are working on generating analysis for {}.",
            game.matchup()
        ),
        spread_analysis: field_default("spread_analysis").to_string(),
        ai_lean: "No analysis available".to_string(),
        angles: Vec::new(),
        predicted_line: field_default("predicted_line").to_string(),
        predicted_total: field_default("predicted_total").to_string(),
        team_strength: BTreeMap::new(),
        injury_impact: field_default("injury_impact").to_string(),
        confidence_score: FALLBACK_CONFIDENCE.to_string(),
        model_used: model_used.to_string(),
    }
}
