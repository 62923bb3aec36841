//! The response format shared by the prompt builder and the completion parser.
//!
//! Every label the prompt asks the model to emit comes from the section
//! tables below, and the parser derives its lookup keys from the same
//! tables, so a label can't be added to one side without the other.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A labeled section of the model's response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionLabel {
    TopInsight,
    Summary,
    SpreadAnalysis,
    AiLean,
    Angles,
    TeamStrength,
    PredictedLine,
    YourPredictedSpread,
    PredictedTotal,
    InjuryImpact,
    Confidence,
}

impl SectionLabel {
    /// Header text as it appears in the prompt, without the trailing colon
    pub fn header(&self) -> &'static str {
        match self {
            SectionLabel::TopInsight => "TOP_INSIGHT",
            SectionLabel::Summary => "SUMMARY",
            SectionLabel::SpreadAnalysis => "SPREAD_ANALYSIS",
            SectionLabel::AiLean => "AI_LEAN",
            SectionLabel::Angles => "ANGLES",
            SectionLabel::TeamStrength => "TEAM_STRENGTH",
            SectionLabel::PredictedLine => "PREDICTED_LINE",
            SectionLabel::YourPredictedSpread => "YOUR_PREDICTED_SPREAD",
            SectionLabel::PredictedTotal => "PREDICTED_TOTAL",
            SectionLabel::InjuryImpact => "INJURY_IMPACT",
            SectionLabel::Confidence => "CONFIDENCE",
        }
    }

    /// Key the parser files this section under
    pub fn key(&self) -> &'static str {
        match self {
            SectionLabel::TopInsight => "top_insight",
            SectionLabel::Summary => "summary",
            SectionLabel::SpreadAnalysis => "spread_analysis",
            SectionLabel::AiLean => "ai_lean",
            SectionLabel::Angles => "angles",
            SectionLabel::TeamStrength => "team_strength",
            SectionLabel::PredictedLine => "predicted_line",
            SectionLabel::YourPredictedSpread => "your_predicted_spread",
            SectionLabel::PredictedTotal => "predicted_total",
            SectionLabel::InjuryImpact => "injury_impact",
            SectionLabel::Confidence => "confidence",
        }
    }
}

/// Turn header text into a section key: "TOP_INSIGHT" and "TOP INSIGHT" both map to "top_insight"
pub fn section_key(header: &str) -> String {
    header
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// One section of the response contract and the guidance shown under it
#[derive(Debug, Clone, Copy)]
pub struct SectionFormat {
    pub label: SectionLabel,
    pub guidance: &'static str,
}

const TOP_INSIGHT: SectionFormat = SectionFormat {
    label: SectionLabel::TopInsight,
    guidance: "[One compelling sentence - the most important thing to know about this game]",
};

const SUMMARY: SectionFormat = SectionFormat {
    label: SectionLabel::Summary,
    guidance: "[2-3 paragraphs providing context on both teams, recent form, key matchup factors, and why this game matters]",
};

const SPREAD_ANALYSIS: SectionFormat = SectionFormat {
    label: SectionLabel::SpreadAnalysis,
    guidance: "[Does the favorite win by MORE than the posted spread, or does the underdog stay within it (or win outright)? Reason about the margin, not just the winner]",
};

const AI_LEAN: SectionFormat = SectionFormat {
    label: SectionLabel::AiLean,
    guidance: "[Brief statement like \"Lean: [Team] [Spread/Total]\" - be measured, never guarantee]",
};

const ANGLES: SectionFormat = SectionFormat {
    label: SectionLabel::Angles,
    guidance: "[3-5 bullet points of interesting betting angles, trends, or situational spots. Include specific stats when possible]\n- Angle 1\n- Angle 2\n- Angle 3\n- Angle 4\n- Angle 5",
};

const TEAM_STRENGTH: SectionFormat = SectionFormat {
    label: SectionLabel::TeamStrength,
    guidance: "Home Offense: [0-100 rating]\nHome Defense: [0-100 rating]\nAway Offense: [0-100 rating]\nAway Defense: [0-100 rating]",
};

const PREDICTED_LINE: SectionFormat = SectionFormat {
    label: SectionLabel::PredictedLine,
    guidance: "[Your predicted spread, e.g., \"DET -9.5\"]",
};

const YOUR_PREDICTED_SPREAD: SectionFormat = SectionFormat {
    label: SectionLabel::YourPredictedSpread,
    guidance: "[Your own line on the first line, e.g., \"DET -9.5\", then one sentence on how it compares to the posted spread]",
};

const PREDICTED_TOTAL: SectionFormat = SectionFormat {
    label: SectionLabel::PredictedTotal,
    guidance: "[Your predicted total, e.g., \"47.5\"]",
};

const INJURY_IMPACT: SectionFormat = SectionFormat {
    label: SectionLabel::InjuryImpact,
    guidance: "[Minor/Moderate/Significant and brief explanation]",
};

const CONFIDENCE: SectionFormat = SectionFormat {
    label: SectionLabel::Confidence,
    guidance: "[Low/Medium/High - be honest about uncertainty]",
};

const CLASSIC_SECTIONS: &[SectionFormat] = &[
    TOP_INSIGHT,
    SUMMARY,
    AI_LEAN,
    ANGLES,
    TEAM_STRENGTH,
    PREDICTED_LINE,
    PREDICTED_TOTAL,
    INJURY_IMPACT,
    CONFIDENCE,
];

const COVER_SECTIONS: &[SectionFormat] = &[
    TOP_INSIGHT,
    SUMMARY,
    SPREAD_ANALYSIS,
    AI_LEAN,
    ANGLES,
    TEAM_STRENGTH,
    YOUR_PREDICTED_SPREAD,
    PREDICTED_TOTAL,
    INJURY_IMPACT,
    CONFIDENCE,
];

/// Keys tried in order when resolving the predicted line
const PREDICTED_LINE_CHAIN: &[SectionLabel] =
    &[SectionLabel::YourPredictedSpread, SectionLabel::PredictedLine];

/// Prompt template generations. Each one fixes the labels it requests
/// and the order fields are resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVersion {
    Classic,
    #[default]
    Cover,
}

impl TemplateVersion {
    pub fn sections(&self) -> &'static [SectionFormat] {
        match self {
            TemplateVersion::Classic => CLASSIC_SECTIONS,
            TemplateVersion::Cover => COVER_SECTIONS,
        }
    }

    pub fn predicted_line_chain(&self) -> &'static [SectionLabel] {
        PREDICTED_LINE_CHAIN
    }

    /// Section keys this template asks the model for
    pub fn keys(&self) -> HashSet<String> {
        self.sections()
            .iter()
            .map(|section| section.label.key().to_string())
            .collect()
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateVersion::Classic => write!(f, "classic"),
            TemplateVersion::Cover => write!(f, "cover"),
        }
    }
}

impl FromStr for TemplateVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" | "v1" => Ok(TemplateVersion::Classic),
            "cover" | "v2" => Ok(TemplateVersion::Cover),
            other => Err(format!("unknown template version: {}", other)),
        }
    }
}

/// Value used for a field when the response has nothing for it
const FIELD_DEFAULTS: &[(&str, &str)] = &[
    ("top_insight", "Analysis pending"),
    ("summary", ""),
    ("spread_analysis", ""),
    ("ai_lean", "No lean at this time"),
    ("predicted_line", "TBD"),
    ("predicted_total", "TBD"),
    ("injury_impact", "Unknown"),
    ("confidence_score", "Medium"),
];

pub fn field_default(field: &str) -> &'static str {
    FIELD_DEFAULTS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, value)| *value)
        .unwrap_or("")
}

/// Confidence reported when the model could not be reached at all
pub const FALLBACK_CONFIDENCE: &str = "N/A";

/// Stance given to the model on every call
pub const SYSTEM_INSTRUCTION: &str = r#"You are an expert NFL analyst focused on providing factual, data-driven betting insights.

Your analysis should be:
- Clear and concise
- Based on factual information
- Free from hype or guarantees
- Honest about uncertainty
- Focused on useful angles and context

NEVER use words like: "lock", "guaranteed", "sure thing", "can't lose", "best bet ever"
ALWAYS be measured: "lean", "favor", "suggest", "indicates", "trend shows"

Think about the spread, not just the winner. A favorite only covers if it wins by MORE than the posted spread. An underdog covers if it loses by LESS than the spread or wins outright. Picking the team most likely to win is not the same as picking the side most likely to cover, and you should be willing to lean toward the underdog when the number is too big.

You analyze matchups considering:
- Team records and recent performance
- Home/away splits
- Division matchups
- Coaching tendencies
- Weather (for outdoor games)
- Rest days and schedule spots
- Historical trends (ATS, totals)
- Key injuries when provided

Always organize your answer under the exact section labels requested in the prompt, each on its own line and followed by a colon."#;
