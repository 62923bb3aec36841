use crate::analysis::format::{field_default, section_key, SectionLabel, TemplateVersion};
use crate::models::{AnalysisRecord, GameRecord};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How the parser decides that a line opens a new section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// Any colon-terminated line whose text is entirely upper-case
    Uppercase,
    /// Only colon-terminated lines spelling one of these labels exactly
    KnownLabels(HashSet<String>),
}

impl HeaderRule {
    /// Exact matching against the labels a template requests
    pub fn strict(template: TemplateVersion) -> Self {
        HeaderRule::KnownLabels(
            template
                .sections()
                .iter()
                .map(|section| section.label.header().to_string())
                .collect(),
        )
    }

    /// Returns the section key if `line` is a header under this rule
    pub fn header_key(&self, line: &str) -> Option<String> {
        let line = line.trim();
        let header = line.strip_suffix(':')?;

        match self {
            HeaderRule::Uppercase => {
                if is_all_caps(header) {
                    Some(section_key(header))
                } else {
                    None
                }
            }
            HeaderRule::KnownLabels(labels) => {
                labels.contains(header.trim()).then(|| section_key(header))
            }
        }
    }
}

impl Default for HeaderRule {
    fn default() -> Self {
        HeaderRule::Uppercase
    }
}

/// At least one cased character and no lower-case ones, ignoring colons and underscores
fn is_all_caps(text: &str) -> bool {
    let mut has_upper = false;
    for c in text.chars().filter(|c| *c != ':' && *c != '_') {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_upper = true;
        }
    }
    has_upper
}

/// Split a completion into sections keyed by lower-case label.
///
/// Single pass, top to bottom. Blank lines are dropped without closing a
/// section, text before the first header is discarded, and a repeated
/// header replaces the earlier body.
pub fn split_sections(text: &str, rule: &HeaderRule) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for raw_line in text.lines() {
        if let Some(key) = rule.header_key(raw_line) {
            if let Some(previous) = current.take() {
                sections.insert(previous, buffer.join("\n").trim().to_string());
            }
            current = Some(key);
            buffer.clear();
        } else if !raw_line.trim().is_empty() {
            buffer.push(raw_line.trim());
        }
    }

    if let Some(last) = current {
        sections.insert(last, buffer.join("\n").trim().to_string());
    }

    sections
}

/// Dash-prefixed lines of the ANGLES section, markers stripped, in order
pub fn parse_angles(section: &str) -> Vec<String> {
    section
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(|line| line.trim_start_matches('-').trim().to_string())
        .filter(|angle| !angle.is_empty())
        .collect()
}

/// "Home Offense: 92 (elite)" -> ("home_offense", "92")
pub fn parse_team_strength(section: &str) -> BTreeMap<String, String> {
    let mut ratings = BTreeMap::new();

    for line in section.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key
            .trim()
            .trim_start_matches('-')
            .trim()
            .to_lowercase()
            .replace(' ', "_");
        if key.is_empty() {
            continue;
        }

        let value = value.split_whitespace().next().unwrap_or_default();
        ratings.insert(key, value.to_string());
    }

    ratings
}

/// Turns free-text model output back into an `AnalysisRecord`.
///
/// Never fails: whatever the model leaves out resolves to the field's
/// default.
#[derive(Debug, Clone)]
pub struct CompletionParser {
    template: TemplateVersion,
    rule: HeaderRule,
    model_used: String,
}

impl CompletionParser {
    pub fn new(template: TemplateVersion) -> Self {
        Self {
            template,
            rule: HeaderRule::default(),
            model_used: String::new(),
        }
    }

    pub fn with_rule(mut self, rule: HeaderRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model_used = model.to_string();
        self
    }

    pub fn template(&self) -> TemplateVersion {
        self.template
    }

    /// `game` only supplies the identifier; parsed content is never overridden by it
    pub fn parse(&self, text: &str, game: &GameRecord) -> AnalysisRecord {
        let sections = split_sections(text, &self.rule);

        let scalar = |key: &str, field: &str| -> String {
            sections
                .get(key)
                .cloned()
                .unwrap_or_else(|| field_default(field).to_string())
        };

        let angles = sections
            .get(SectionLabel::Angles.key())
            .map(|s| parse_angles(s))
            .unwrap_or_default();

        let team_strength = sections
            .get(SectionLabel::TeamStrength.key())
            .map(|s| parse_team_strength(s))
            .unwrap_or_default();

        AnalysisRecord {
            game_id: game.game_id.clone(),
            top_insight: scalar(SectionLabel::TopInsight.key(), "top_insight"),
            summary: scalar(SectionLabel::Summary.key(), "summary"),
            spread_analysis: scalar(SectionLabel::SpreadAnalysis.key(), "spread_analysis"),
            ai_lean: scalar(SectionLabel::AiLean.key(), "ai_lean"),
            angles,
            predicted_line: self.predicted_line(&sections),
            predicted_total: scalar(SectionLabel::PredictedTotal.key(), "predicted_total"),
            team_strength,
            injury_impact: scalar(SectionLabel::InjuryImpact.key(), "injury_impact"),
            confidence_score: scalar(SectionLabel::Confidence.key(), "confidence_score"),
            model_used: self.model_used.clone(),
        }
    }

    /// First key of the template's chain that is present; only its first line is kept
    fn predicted_line(&self, sections: &HashMap<String, String>) -> String {
        self.template
            .predicted_line_chain()
            .iter()
            .find_map(|label| sections.get(label.key()))
            .and_then(|value| value.lines().next())
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| field_default("predicted_line").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TeamLeaders, TeamSnapshot, Venue};

    fn sample_game() -> GameRecord {
        let team = |id: &str, name: &str, abbr: &str| TeamSnapshot {
            id: id.to_string(),
            name: name.to_string(),
            abbreviation: abbr.to_string(),
            record: "8-3".to_string(),
            home_record: "5-1".to_string(),
            away_record: "3-2".to_string(),
            leaders: TeamLeaders::default(),
        };

        GameRecord {
            game_id: "401772943".to_string(),
            week: 13,
            season_year: 2025,
            game_time: "2025-11-27T18:00Z".to_string(),
            game_time_display: "Thu, November 27th at 1:00 PM EST".to_string(),
            status: "pre".to_string(),
            home_team: team("8", "Detroit Lions", "DET"),
            away_team: team("9", "Green Bay Packers", "GB"),
            venue: Venue {
                name: "Ford Field".to_string(),
                city: "Detroit".to_string(),
                state: "MI".to_string(),
                indoor: true,
            },
            broadcast: "FOX".to_string(),
            odds: None,
        }
    }

    const FULL_RESPONSE: &str = "TOP_INSIGHT:
Detroit has covered in five straight home games against division rivals.

SUMMARY:
The Lions come in rested.

Green Bay has won three of four on the road.

SPREAD_ANALYSIS:
A 2.5-point spread means Detroit needs a field goal margin.

AI_LEAN:
Lean: Packers +2.5

ANGLES:
- Packers are 4-1 ATS as road underdogs
-Lions are 2-5 ATS on short rest
- Under is 6-1 in the last seven meetings

TEAM_STRENGTH:
Home Offense: 91
Home Defense: 74 - slightly above average
Away Offense: 84 (improving)
Away Defense: 80

YOUR_PREDICTED_SPREAD:
DET -1.5
The posted line is a point too high.

PREDICTED_TOTAL:
48.5

INJURY_IMPACT:
Moderate - Lions secondary is thin

CONFIDENCE:
Low
";

    #[test]
    fn test_header_recognition() {
        let rule = HeaderRule::Uppercase;
        assert_eq!(rule.header_key("TOP_INSIGHT:"), Some("top_insight".to_string()));
        assert_eq!(rule.header_key("  TEAM_STRENGTH:  "), Some("team_strength".to_string()));
        assert_eq!(rule.header_key("TEAM STRENGTH:"), Some("team_strength".to_string()));
        assert_eq!(rule.header_key("Lean: Lions -6.5"), None);
        assert_eq!(rule.header_key("Top Insight:"), None);
        assert_eq!(rule.header_key("summary:"), None);
        assert_eq!(rule.header_key("TOP_INSIGHT"), None);
        assert_eq!(rule.header_key("2025:"), None);
        assert_eq!(rule.header_key(":"), None);
        assert_eq!(rule.header_key("___:"), None);
    }

    #[test]
    fn test_strict_header_rule() {
        let rule = HeaderRule::strict(TemplateVersion::Classic);
        assert_eq!(rule.header_key("PREDICTED_LINE:"), Some("predicted_line".to_string()));
        assert_eq!(rule.header_key("SPREAD_ANALYSIS:"), None);
        assert_eq!(rule.header_key("KEY FACTS:"), None);
        assert_eq!(rule.header_key("Summary:"), None);
        assert_eq!(rule.header_key("confidence:"), None);
        assert_eq!(rule.header_key("  CONFIDENCE:  "), Some("confidence".to_string()));
    }

    #[test]
    fn test_strict_rule_keeps_prose_label_in_body() {
        let parser = CompletionParser::new(TemplateVersion::Classic)
            .with_rule(HeaderRule::strict(TemplateVersion::Classic));
        let analysis = parser.parse(
            "SUMMARY:\nDetroit is rested.\nConfidence:\nthe market trusts the Lions\nCONFIDENCE:\nHigh",
            &sample_game(),
        );
        assert_eq!(
            analysis.summary,
            "Detroit is rested.\nConfidence:\nthe market trusts the Lions"
        );
        assert_eq!(analysis.confidence_score, "High");
    }

    #[test]
    fn test_mixed_case_line_stays_in_section() {
        let sections = split_sections("AI_LEAN:\nLean: Lions -6.5\n", &HeaderRule::Uppercase);
        assert_eq!(sections.get("ai_lean").map(String::as_str), Some("Lean: Lions -6.5"));
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_blank_lines_do_not_close_sections() {
        let sections = split_sections(
            "SUMMARY:\n\n  First paragraph.  \n\n\nSecond paragraph.\n",
            &HeaderRule::Uppercase,
        );
        assert_eq!(
            sections.get("summary").map(String::as_str),
            Some("First paragraph.\nSecond paragraph.")
        );
    }

    #[test]
    fn test_text_before_first_header_is_ignored() {
        let sections = split_sections(
            "Here is my analysis.\nTOP_INSIGHT:\nInsight.",
            &HeaderRule::Uppercase,
        );
        assert_eq!(sections.len(), 1);
        assert_eq!(sections.get("top_insight").map(String::as_str), Some("Insight."));
    }

    #[test]
    fn test_empty_section_is_present_but_empty() {
        let sections = split_sections("SUMMARY:\nCONFIDENCE:\nHigh", &HeaderRule::Uppercase);
        assert_eq!(sections.get("summary").map(String::as_str), Some(""));
        assert_eq!(sections.get("confidence").map(String::as_str), Some("High"));
    }

    #[test]
    fn test_parse_full_response() {
        let parser = CompletionParser::new(TemplateVersion::Cover).with_model("gpt-4o-mini");
        let analysis = parser.parse(FULL_RESPONSE, &sample_game());

        assert_eq!(analysis.game_id, "401772943");
        assert_eq!(
            analysis.top_insight,
            "Detroit has covered in five straight home games against division rivals."
        );
        assert_eq!(
            analysis.summary,
            "The Lions come in rested.\nGreen Bay has won three of four on the road."
        );
        assert_eq!(
            analysis.spread_analysis,
            "A 2.5-point spread means Detroit needs a field goal margin."
        );
        assert_eq!(analysis.ai_lean, "Lean: Packers +2.5");
        assert_eq!(
            analysis.angles,
            vec![
                "Packers are 4-1 ATS as road underdogs",
                "Lions are 2-5 ATS on short rest",
                "Under is 6-1 in the last seven meetings",
            ]
        );
        assert_eq!(analysis.predicted_line, "DET -1.5");
        assert_eq!(analysis.predicted_total, "48.5");
        assert_eq!(analysis.team_strength.get("home_offense").map(String::as_str), Some("91"));
        assert_eq!(analysis.team_strength.get("home_defense").map(String::as_str), Some("74"));
        assert_eq!(analysis.team_strength.get("away_offense").map(String::as_str), Some("84"));
        assert_eq!(analysis.team_strength.get("away_defense").map(String::as_str), Some("80"));
        assert_eq!(analysis.injury_impact, "Moderate - Lions secondary is thin");
        assert_eq!(analysis.confidence_score, "Low");
        assert_eq!(analysis.model_used, "gpt-4o-mini");
    }

    #[test]
    fn test_unparseable_input_falls_back_to_defaults() {
        let parser = CompletionParser::new(TemplateVersion::Cover);
        let game = sample_game();

        for text in [
            "",
            "no headers here at all",
            "lower: case: only:",
            "\u{0}\u{1}\u{fffd}\u{7f}::::",
            "\n\n\n",
        ] {
            let analysis = parser.parse(text, &game);
            assert_eq!(analysis.game_id, game.game_id);
            assert_eq!(analysis.top_insight, "Analysis pending");
            assert_eq!(analysis.summary, "");
            assert_eq!(analysis.ai_lean, "No lean at this time");
            assert!(analysis.angles.is_empty());
            assert_eq!(analysis.predicted_line, "TBD");
            assert_eq!(analysis.predicted_total, "TBD");
            assert!(analysis.team_strength.is_empty());
            assert_eq!(analysis.injury_impact, "Unknown");
            assert_eq!(analysis.confidence_score, "Medium");
        }
    }

    #[test]
    fn test_parse_angles() {
        assert_eq!(parse_angles("foo\n- bar\n-baz\n"), vec!["bar", "baz"]);
        assert_eq!(parse_angles("  -   spaced out  "), vec!["spaced out"]);
        assert!(parse_angles("1. numbered\n* starred").is_empty());
    }

    #[test]
    fn test_angles_from_section() {
        let parser = CompletionParser::new(TemplateVersion::Classic);
        let analysis = parser.parse("ANGLES:\nfoo\n- bar\n-baz\n", &sample_game());
        assert_eq!(analysis.angles, vec!["bar", "baz"]);
    }

    #[test]
    fn test_parse_team_strength() {
        let ratings = parse_team_strength(
            "Home Offense: 92 (elite)\nno colon here\nAway Defense:   61\n- Away Offense: 70",
        );
        assert_eq!(ratings.get("home_offense").map(String::as_str), Some("92"));
        assert_eq!(ratings.get("away_defense").map(String::as_str), Some("61"));
        assert_eq!(ratings.get("away_offense").map(String::as_str), Some("70"));
        assert_eq!(ratings.len(), 3);
    }

    #[test]
    fn test_team_strength_splits_on_first_colon() {
        let ratings = parse_team_strength("Home Offense: 88: rising");
        assert_eq!(ratings.get("home_offense").map(String::as_str), Some("88:"));
    }

    #[test]
    fn test_predicted_line_precedence() {
        let parser = CompletionParser::new(TemplateVersion::Cover);
        let game = sample_game();

        let both = "PREDICTED_LINE:\nDET -3\nYOUR_PREDICTED_SPREAD:\nGB +1.5\n";
        assert_eq!(parser.parse(both, &game).predicted_line, "GB +1.5");

        let only_old = "PREDICTED_LINE:\nDET -3\n";
        assert_eq!(parser.parse(only_old, &game).predicted_line, "DET -3");

        let only_new = "YOUR_PREDICTED_SPREAD:\nGB +1.5\n";
        assert_eq!(parser.parse(only_new, &game).predicted_line, "GB +1.5");

        assert_eq!(parser.parse("SUMMARY:\nText", &game).predicted_line, "TBD");
    }

    #[test]
    fn test_predicted_line_keeps_first_line_only() {
        let parser = CompletionParser::new(TemplateVersion::Cover);
        let analysis = parser.parse(
            "YOUR_PREDICTED_SPREAD:\nDET -1.5\nThe market is shading toward Detroit.",
            &sample_game(),
        );
        assert_eq!(analysis.predicted_line, "DET -1.5");
    }

    #[test]
    fn test_classic_template_ignores_cover_only_sections() {
        let parser = CompletionParser::new(TemplateVersion::Classic);
        let analysis = parser.parse("TOP_INSIGHT:\nShort week for Dallas.", &sample_game());
        assert_eq!(analysis.top_insight, "Short week for Dallas.");
        assert_eq!(analysis.spread_analysis, "");
    }

    #[test]
    fn test_strict_rule_keeps_unknown_caps_lines_as_body() {
        let parser = CompletionParser::new(TemplateVersion::Cover)
            .with_rule(HeaderRule::strict(TemplateVersion::Cover));
        let analysis = parser.parse(
            "SUMMARY:\nKEY MATCHUP:\nLions run game vs Packers front",
            &sample_game(),
        );
        assert_eq!(
            analysis.summary,
            "KEY MATCHUP:\nLions run game vs Packers front"
        );
    }
}
